//! Stateless HTTP request builder and response parser for the feature toggle
//! API.
//!
//! # Design
//! `FeatureToggleClient` holds only the parsed base URL and carries no
//! mutable state between calls. Each of the eleven operations has a
//! `build_*` method that produces an `HttpRequest`; responses are parsed per
//! payload kind (`parse_toggle_list`, `parse_message`, `parse_statistics`)
//! because several endpoints share a response shape. The caller executes the
//! round-trip in between, keeping this module deterministic and free of I/O.
//!
//! Decoding is lenient: only the first JSON value of a body is read and
//! anything after it is ignored.

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ErrorBody, FeatureToggleItem, FeaturesStatistics};

/// The remote operations exposed by the feature toggle service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateFeatureToggle,
    GetAllFeatureToggles,
    GetActiveFeatureToggles,
    DeleteFeatureToggle,
    UpdateFeatureDates,
    UpdateFeatureInfo,
    GetRecentFeatureToggles,
    GetActiveFeaturesInRange,
    GetFeatureToggleStatistics,
    GetFeatureTogglesByDate,
    DeleteAllFeatureToggles,
}

impl Endpoint {
    pub const ALL: [Endpoint; 11] = [
        Endpoint::CreateFeatureToggle,
        Endpoint::GetAllFeatureToggles,
        Endpoint::GetActiveFeatureToggles,
        Endpoint::DeleteFeatureToggle,
        Endpoint::UpdateFeatureDates,
        Endpoint::UpdateFeatureInfo,
        Endpoint::GetRecentFeatureToggles,
        Endpoint::GetActiveFeaturesInRange,
        Endpoint::GetFeatureToggleStatistics,
        Endpoint::GetFeatureTogglesByDate,
        Endpoint::DeleteAllFeatureToggles,
    ];

    /// Operation name as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::CreateFeatureToggle => "createFeatureToggle",
            Endpoint::GetAllFeatureToggles => "getAllFeatureToggles",
            Endpoint::GetActiveFeatureToggles => "getActiveFeatureToggles",
            Endpoint::DeleteFeatureToggle => "deleteFeatureToggle",
            Endpoint::UpdateFeatureDates => "updateFeatureDates",
            Endpoint::UpdateFeatureInfo => "updateFeatureInfo",
            Endpoint::GetRecentFeatureToggles => "getRecentFeatureToggles",
            Endpoint::GetActiveFeaturesInRange => "getActiveFeaturesInRange",
            Endpoint::GetFeatureToggleStatistics => "getFeatureToggleStatistics",
            Endpoint::GetFeatureTogglesByDate => "getFeatureTogglesByDate",
            Endpoint::DeleteAllFeatureToggles => "deleteAllFeatureToggles",
        }
    }
}

/// Synchronous, stateless client for the feature toggle API.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct FeatureToggleClient {
    base_url: Url,
}

impl FeatureToggleClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(format!(
                "{base_url}: cannot carry path segments"
            )));
        }
        Ok(Self { base_url: url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn build_create_feature_toggle(
        &self,
        item: &FeatureToggleItem,
    ) -> Result<HttpRequest, ApiError> {
        json_request(HttpMethod::Post, self.url(&["feature-toggle"], &[]), item)
    }

    pub fn build_get_all_feature_toggles(&self, package_name: &str) -> HttpRequest {
        bare_request(HttpMethod::Get, self.url(&["feature-toggles", package_name], &[]))
    }

    pub fn build_get_active_feature_toggles(&self, package_name: &str) -> HttpRequest {
        bare_request(
            HttpMethod::Get,
            self.url(&["feature-toggles", package_name, "active"], &[]),
        )
    }

    pub fn build_delete_feature_toggle(&self, package_name: &str, feature_id: &str) -> HttpRequest {
        bare_request(
            HttpMethod::Delete,
            self.url(&["feature-toggles", package_name, feature_id], &[]),
        )
    }

    pub fn build_update_feature_dates(
        &self,
        package_name: &str,
        feature_id: &str,
        dates: &FeatureToggleItem,
    ) -> Result<HttpRequest, ApiError> {
        json_request(
            HttpMethod::Put,
            self.url(&["feature-toggles", package_name, feature_id, "update-dates"], &[]),
            dates,
        )
    }

    pub fn build_update_feature_info(
        &self,
        package_name: &str,
        feature_id: &str,
        info: &FeatureToggleItem,
    ) -> Result<HttpRequest, ApiError> {
        json_request(
            HttpMethod::Put,
            self.url(&["feature-toggles", package_name, feature_id, "update-info"], &[]),
            info,
        )
    }

    pub fn build_get_recent_feature_toggles(&self, package_name: &str) -> HttpRequest {
        bare_request(
            HttpMethod::Get,
            self.url(&["feature-toggles", package_name, "recent"], &[]),
        )
    }

    pub fn build_get_active_features_in_range(
        &self,
        package_name: &str,
        start_date: &str,
        end_date: &str,
    ) -> HttpRequest {
        bare_request(
            HttpMethod::Get,
            self.url(
                &["feature-toggles", package_name, "active-in-range"],
                &[("start_date", start_date), ("end_date", end_date)],
            ),
        )
    }

    pub fn build_get_feature_toggle_statistics(&self, package_name: &str) -> HttpRequest {
        bare_request(
            HttpMethod::Get,
            self.url(&["feature-toggles", package_name, "statistics"], &[]),
        )
    }

    pub fn build_get_feature_toggles_by_date(&self, package_name: &str, date: &str) -> HttpRequest {
        bare_request(
            HttpMethod::Get,
            self.url(&["feature-toggles", package_name, "by-date"], &[("date", date)]),
        )
    }

    pub fn build_delete_all_feature_toggles(&self, package_name: &str) -> HttpRequest {
        bare_request(HttpMethod::Delete, self.url(&["feature-toggles", package_name], &[]))
    }

    /// Parse the response of any list-returning operation.
    ///
    /// A 2xx response without a list (empty body or JSON `null`) is
    /// `ApiError::EmptyBody`.
    pub fn parse_toggle_list(&self, response: HttpResponse) -> Result<Vec<FeatureToggleItem>, ApiError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Err(ApiError::EmptyBody);
        }
        let items: Option<Vec<FeatureToggleItem>> =
            decode_lenient(&response.body).map_err(|e| ApiError::Deserialization {
                what: "feature toggles",
                reason: e.to_string(),
            })?;
        items.ok_or(ApiError::EmptyBody)
    }

    /// Parse the response of an operation whose body is an opaque message.
    ///
    /// Returns the server's message when there is one: the `message` field of
    /// a JSON object, or else the trimmed body text. `None` means the server
    /// confirmed without saying anything.
    pub fn parse_message(&self, response: HttpResponse) -> Result<Option<String>, ApiError> {
        check_status(&response)?;
        let text = response.body.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if let Ok(Value::Object(map)) = decode_lenient::<Value>(text) {
            if let Some(Value::String(message)) = map.get("message") {
                return Ok(Some(message.clone()));
            }
        }
        Ok(Some(text.to_string()))
    }

    pub fn parse_statistics(&self, response: HttpResponse) -> Result<FeaturesStatistics, ApiError> {
        check_status(&response)?;
        decode_lenient(&response.body).map_err(|e| ApiError::Deserialization {
            what: "statistics",
            reason: e.to_string(),
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so the path is always writable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.into()
    }
}

fn bare_request(method: HttpMethod, path: String) -> HttpRequest {
    HttpRequest {
        method,
        path,
        headers: Vec::new(),
        body: None,
    }
}

fn json_request(
    method: HttpMethod,
    path: String,
    payload: &FeatureToggleItem,
) -> Result<HttpRequest, ApiError> {
    let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
    Ok(HttpRequest {
        method,
        path,
        headers: vec![("content-type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

/// Map non-2xx responses to the most specific `ApiError` the body allows.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(error_from_body(response.status, &response.body))
}

fn error_from_body(status: u16, body: &str) -> ApiError {
    if let Ok(ErrorBody { error }) = decode_lenient::<ErrorBody>(body) {
        return ApiError::Server {
            status,
            message: error,
        };
    }
    match decode_lenient::<Value>(body) {
        // Scalars render as text; null and nested values have no message.
        Ok(Value::Object(map)) => match map.get("error") {
            None => ApiError::UnknownServerError { status },
            Some(scalar @ (Value::Number(_) | Value::Bool(_))) => ApiError::Server {
                status,
                message: scalar.to_string(),
            },
            Some(_) => ApiError::MalformedErrorBody { status },
        },
        _ => ApiError::MalformedErrorBody { status },
    }
}

/// Decode the first JSON value in `body`, ignoring trailing data.
fn decode_lenient<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let mut values = serde_json::Deserializer::from_str(body).into_iter::<T>();
    match values.next() {
        Some(value) => value,
        None => Err(serde::de::Error::custom("empty body")),
    }
}
