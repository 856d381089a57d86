use axum::http::{self, Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use http_body_util::BodyExt;
use mock_server::{app, app_with_clock, FeatureToggle, Statistics, TIMESTAMP_FORMAT};
use serde_json::Value;
use tower::{Service, ServiceExt};

const PKG: &str = "com.example.app";

fn fixed_now() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-06-15 12:00:00", TIMESTAMP_FORMAT).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn create_body(name: &str, beginning: &str, expiration: &str) -> String {
    format!(
        r#"{{"name":"{name}","description":"{name} toggle","beginning_date":"{beginning}","expiration_date":"{expiration}","package_name":"{PKG}"}}"#
    )
}

/// Send one request through a shared router so state persists across calls.
async fn send(app: &mut Router, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

async fn create(app: &mut Router, name: &str, beginning: &str, expiration: &str) -> String {
    let resp = send(
        app,
        json_request("POST", "/feature-toggle", &create_body(name, beginning, expiration)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    body["_id"].as_str().unwrap().to_string()
}

async fn list(app: &mut Router, uri: &str) -> Vec<FeatureToggle> {
    let resp = send(app, empty_request("GET", uri)).await;
    assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    body_json(resp).await
}

// --- list ---

#[tokio::test]
async fn list_unknown_package_is_empty() {
    let resp = app()
        .oneshot(empty_request("GET", "/feature-toggles/com.nobody"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let toggles: Vec<FeatureToggle> = body_json(resp).await;
    assert!(toggles.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_returns_201_with_message() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/feature-toggle",
            &create_body("dark_mode", "2025-01-15 00:00:00", "2025-12-31 23:59:59"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Feature toggle created successfully");
    assert!(body["_id"].as_str().is_some());
}

#[tokio::test]
async fn create_missing_name_returns_error_envelope() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/feature-toggle",
            r#"{"beginning_date":"2025-01-01 00:00:00","expiration_date":"2025-02-01 00:00:00","package_name":"p"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Missing required field: name");
}

#[tokio::test]
async fn create_malformed_json_returns_error_envelope() {
    let resp = app()
        .oneshot(json_request("POST", "/feature-toggle", "{not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn create_inverted_dates_is_rejected() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/feature-toggle",
            &create_body("late", "2025-12-31 00:00:00", "2025-01-01 00:00:00"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_duplicate_name_conflicts() {
    let mut app = app();
    create(&mut app, "dark_mode", "2025-01-01 00:00:00", "2025-12-31 23:59:59").await;
    let resp = send(
        &mut app,
        json_request(
            "POST",
            "/feature-toggle",
            &create_body("dark_mode", "2025-01-01 00:00:00", "2025-12-31 23:59:59"),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// --- delete ---

#[tokio::test]
async fn delete_unknown_toggle_returns_404_envelope() {
    let resp = app()
        .oneshot(empty_request("DELETE", &format!("/feature-toggles/{PKG}/missing")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "Feature toggle not found");
}

#[tokio::test]
async fn delete_all_is_idempotent() {
    let mut app = app();
    create(&mut app, "a", "2025-01-01 00:00:00", "2025-12-31 23:59:59").await;
    create(&mut app, "b", "2025-01-01 00:00:00", "2025-12-31 23:59:59").await;

    let resp = send(&mut app, empty_request("DELETE", &format!("/feature-toggles/{PKG}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["deleted_count"], 2);

    let resp = send(&mut app, empty_request("DELETE", &format!("/feature-toggles/{PKG}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["deleted_count"], 0);
}

// --- date windows ---

#[tokio::test]
async fn active_recent_and_statistics_follow_the_clock() {
    let mut app = app_with_clock(fixed_now);
    create(&mut app, "summer", "2025-06-01 00:00:00", "2025-08-31 23:59:59").await;
    create(&mut app, "xmas", "2025-12-20 00:00:00", "2025-12-26 23:59:59").await;

    let active = list(&mut app, &format!("/feature-toggles/{PKG}/active")).await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "summer");

    let recent = list(&mut app, &format!("/feature-toggles/{PKG}/recent")).await;
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].created_at, fixed_now());

    let resp = send(
        &mut app,
        empty_request("GET", &format!("/feature-toggles/{PKG}/statistics")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Statistics = body_json(resp).await;
    assert_eq!(
        stats,
        Statistics {
            total_features: 2,
            active_features: 1
        }
    );
}

#[tokio::test]
async fn range_and_by_date_queries() {
    let mut app = app();
    create(&mut app, "new_year", "2025-01-01 00:00:00", "2025-01-02 23:59:59").await;
    create(&mut app, "valentines", "2025-02-14 00:00:00", "2025-02-14 23:59:59").await;
    create(&mut app, "january_sale", "2025-01-20 09:00:00", "2025-02-05 18:00:00").await;

    let in_january = list(
        &mut app,
        &format!("/feature-toggles/{PKG}/active-in-range?start_date=2025-01-01&end_date=2025-01-31"),
    )
    .await;
    let names: Vec<&str> = in_january.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["new_year", "january_sale"]);

    let on_valentines = list(
        &mut app,
        &format!("/feature-toggles/{PKG}/by-date?date=2025-02-14+12%3A00%3A00"),
    )
    .await;
    assert_eq!(on_valentines.len(), 1);
    assert_eq!(on_valentines[0].name, "valentines");

    let resp = send(
        &mut app,
        empty_request("GET", &format!("/feature-toggles/{PKG}/active-in-range?start_date=2025-01-01")),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "start_date and end_date are required");
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let mut app = app();

    let id = create(&mut app, "dark_mode", "2025-01-15 00:00:00", "2025-12-31 23:59:59").await;

    let toggles = list(&mut app, &format!("/feature-toggles/{PKG}")).await;
    assert_eq!(toggles.len(), 1);
    assert_eq!(toggles[0].id, id);
    assert_eq!(toggles[0].package_name, PKG);

    // update dates: only expiration
    let resp = send(
        &mut app,
        json_request(
            "PUT",
            &format!("/feature-toggles/{PKG}/{id}/update-dates"),
            r#"{"expiration_date":"2026-01-31 23:59:59"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    // update info: only description
    let resp = send(
        &mut app,
        json_request(
            "PUT",
            &format!("/feature-toggles/{PKG}/{id}/update-info"),
            r#"{"description":"Dark theme for everyone"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let toggles = list(&mut app, &format!("/feature-toggles/{PKG}")).await;
    let toggle = &toggles[0];
    assert_eq!(toggle.name, "dark_mode"); // unchanged
    assert_eq!(toggle.description, "Dark theme for everyone");
    assert_eq!(toggle.beginning_date.format(TIMESTAMP_FORMAT).to_string(), "2025-01-15 00:00:00");
    assert_eq!(toggle.expiration_date.format(TIMESTAMP_FORMAT).to_string(), "2026-01-31 23:59:59");

    // empty update is rejected
    let resp = send(
        &mut app,
        json_request("PUT", &format!("/feature-toggles/{PKG}/{id}/update-info"), "{}"),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&mut app, empty_request("DELETE", &format!("/feature-toggles/{PKG}/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send(&mut app, empty_request("DELETE", &format!("/feature-toggles/{PKG}/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let toggles = list(&mut app, &format!("/feature-toggles/{PKG}")).await;
    assert!(toggles.is_empty());
}
