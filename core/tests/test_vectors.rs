//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Request vectors name the operation by its endpoint name and carry the
//! inputs plus the expected request. Response vectors carry a simulated
//! response and either the expected parse result or the expected error text.
//! Bodies are compared as parsed JSON so field order does not matter.

use feature_toggle_core::{
    ApiError, Endpoint, FeatureToggleClient, FeatureToggleItem, FeaturesStatistics, HttpMethod,
    HttpRequest, HttpResponse,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:5000/";

fn client() -> FeatureToggleClient {
    FeatureToggleClient::new(BASE_URL).unwrap()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(
        sim["status"].as_u64().unwrap() as u16,
        sim["body"].as_str().unwrap(),
    )
}

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Check a parse failure against `expected_error` or `expected_error_prefix`.
fn assert_error(name: &str, case: &Value, err: &ApiError) {
    let rendered = err.to_string();
    if let Some(exact) = case.get("expected_error") {
        assert_eq!(rendered, exact.as_str().unwrap(), "{name}: error text");
    } else if let Some(prefix) = case.get("expected_error_prefix") {
        assert!(
            rendered.starts_with(prefix.as_str().unwrap()),
            "{name}: error text {rendered:?}"
        );
    } else {
        panic!("{name}: unexpected error {rendered:?}");
    }
}

/// Build the request a vector describes, dispatching on its operation name.
fn build(c: &FeatureToggleClient, endpoint: Endpoint, input: &Value) -> HttpRequest {
    let s = |key: &str| input[key].as_str().unwrap();
    let item = || -> FeatureToggleItem { serde_json::from_value(input["item"].clone()).unwrap() };
    match endpoint {
        Endpoint::CreateFeatureToggle => c.build_create_feature_toggle(&item()).unwrap(),
        Endpoint::GetAllFeatureToggles => c.build_get_all_feature_toggles(s("package_name")),
        Endpoint::GetActiveFeatureToggles => c.build_get_active_feature_toggles(s("package_name")),
        Endpoint::DeleteFeatureToggle => {
            c.build_delete_feature_toggle(s("package_name"), s("feature_id"))
        }
        Endpoint::UpdateFeatureDates => c
            .build_update_feature_dates(s("package_name"), s("feature_id"), &item())
            .unwrap(),
        Endpoint::UpdateFeatureInfo => c
            .build_update_feature_info(s("package_name"), s("feature_id"), &item())
            .unwrap(),
        Endpoint::GetRecentFeatureToggles => c.build_get_recent_feature_toggles(s("package_name")),
        Endpoint::GetActiveFeaturesInRange => c.build_get_active_features_in_range(
            s("package_name"),
            s("start_date"),
            s("end_date"),
        ),
        Endpoint::GetFeatureToggleStatistics => {
            c.build_get_feature_toggle_statistics(s("package_name"))
        }
        Endpoint::GetFeatureTogglesByDate => {
            c.build_get_feature_toggles_by_date(s("package_name"), s("date"))
        }
        Endpoint::DeleteAllFeatureToggles => c.build_delete_all_feature_toggles(s("package_name")),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let c = client();
    let mut covered = Vec::new();
    for case in cases(include_str!("../../test-vectors/requests.json")) {
        let name = case["name"].as_str().unwrap();
        let operation = case["operation"].as_str().unwrap();
        let endpoint = Endpoint::ALL
            .into_iter()
            .find(|e| e.name() == operation)
            .unwrap_or_else(|| panic!("{name}: unknown operation {operation}"));
        covered.push(endpoint);

        let req = build(&c, endpoint, &case["input"]);
        let expected = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            req.path,
            format!("{}{}", BASE_URL.trim_end_matches('/'), expected["path"].as_str().unwrap()),
            "{name}: path"
        );

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let arr = h.as_array().unwrap();
                (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        match req.body.as_deref() {
            Some(body) => {
                let body: Value = serde_json::from_str(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be None"),
        }
    }

    for endpoint in Endpoint::ALL {
        assert!(covered.contains(&endpoint), "no request vector for {}", endpoint.name());
    }
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/lists.json")) {
        let name = case["name"].as_str().unwrap();
        match c.parse_toggle_list(simulated(&case)) {
            Ok(items) => {
                let expected: Vec<FeatureToggleItem> =
                    serde_json::from_value(case["expected_result"].clone())
                        .unwrap_or_else(|e| panic!("{name}: expected success, vector has {e}"));
                assert_eq!(items, expected, "{name}: parsed result");
            }
            Err(err) => assert_error(name, &case, &err),
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[test]
fn message_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/messages.json")) {
        let name = case["name"].as_str().unwrap();
        let message = c.parse_message(simulated(&case)).unwrap();
        assert_eq!(
            message.as_deref(),
            case["expected_result"].as_str(),
            "{name}: parsed result"
        );
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn statistics_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/statistics.json")) {
        let name = case["name"].as_str().unwrap();
        match c.parse_statistics(simulated(&case)) {
            Ok(stats) => {
                let expected: FeaturesStatistics =
                    serde_json::from_value(case["expected_result"].clone())
                        .unwrap_or_else(|e| panic!("{name}: expected success, vector has {e}"));
                assert_eq!(stats, expected, "{name}: parsed result");
            }
            Err(err) => assert_error(name, &case, &err),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let expected_status = case["expected_status"].as_u64().map(|s| s as u16);

        // Every parser maps non-2xx responses the same way.
        let errors = [
            c.parse_toggle_list(simulated(&case)).unwrap_err(),
            c.parse_message(simulated(&case)).unwrap_err(),
            c.parse_statistics(simulated(&case)).unwrap_err(),
        ];
        for err in &errors {
            assert_error(name, &case, err);
            assert_eq!(err.status(), expected_status, "{name}: status");
        }
    }
}
