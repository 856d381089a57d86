//! In-memory feature toggle service.
//!
//! Implements the eleven endpoints the client SDK talks to, storing toggles
//! per package in insertion order. Errors use the `{"error": "..."}` envelope.
//! The clock is injectable so date-window queries can be tested
//! deterministically.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RECENT_WINDOW_DAYS: i64 = 30;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureToggle {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub beginning_date: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub expiration_date: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub updated_at: NaiveDateTime,
    pub package_name: String,
}

impl FeatureToggle {
    fn is_active_at(&self, at: NaiveDateTime) -> bool {
        self.overlaps(at, at)
    }

    fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.beginning_date <= end && self.expiration_date >= start
    }
}

#[derive(Deserialize)]
pub struct CreateFeatureToggle {
    pub name: Option<String>,
    pub description: Option<String>,
    pub beginning_date: Option<String>,
    pub expiration_date: Option<String>,
    pub package_name: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateDates {
    pub beginning_date: Option<String>,
    pub expiration_date: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateInfo {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Statistics {
    pub total_features: usize,
    pub active_features: usize,
}

pub type Db = Arc<RwLock<HashMap<String, Vec<FeatureToggle>>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    now: fn() -> NaiveDateTime,
}

impl AppState {
    /// Current time truncated to whole seconds, matching the wire layout.
    fn now(&self) -> NaiveDateTime {
        let now = (self.now)();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Error response carrying the `{"error": ...}` envelope.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    message: String,
}

impl ServiceError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Feature toggle not found")
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

type ServiceResult<T> = Result<T, ServiceError>;

pub fn app() -> Router {
    app_with_clock(|| Utc::now().naive_utc())
}

/// Router whose notion of "now" comes from `now`.
pub fn app_with_clock(now: fn() -> NaiveDateTime) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        now,
    };
    Router::new()
        .route("/feature-toggle", post(create_feature_toggle))
        .route(
            "/feature-toggles/{package_name}",
            get(get_all_feature_toggles).delete(delete_all_feature_toggles),
        )
        .route("/feature-toggles/{package_name}/active", get(get_active_feature_toggles))
        .route("/feature-toggles/{package_name}/recent", get(get_recent_feature_toggles))
        .route(
            "/feature-toggles/{package_name}/active-in-range",
            get(get_active_features_in_range),
        )
        .route("/feature-toggles/{package_name}/statistics", get(get_statistics))
        .route("/feature-toggles/{package_name}/by-date", get(get_feature_toggles_by_date))
        .route(
            "/feature-toggles/{package_name}/{feature_id}",
            delete(delete_feature_toggle),
        )
        .route(
            "/feature-toggles/{package_name}/{feature_id}/update-dates",
            put(update_feature_dates),
        )
        .route(
            "/feature-toggles/{package_name}/{feature_id}/update-info",
            put(update_feature_info),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn create_feature_toggle(
    State(state): State<AppState>,
    payload: Result<Json<CreateFeatureToggle>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<Value>)> {
    let Json(input) = payload?;
    let name = required(input.name, "name")?;
    let package_name = required(input.package_name, "package_name")?;
    let beginning_date = parse_bound(&required(input.beginning_date, "beginning_date")?, false)?;
    let expiration_date = parse_bound(&required(input.expiration_date, "expiration_date")?, true)?;
    check_window(beginning_date, expiration_date)?;

    let now = state.now();
    let toggle = FeatureToggle {
        id: Uuid::new_v4().to_string(),
        name,
        description: input.description.unwrap_or_default(),
        beginning_date,
        expiration_date,
        created_at: now,
        updated_at: now,
        package_name,
    };

    let mut db = state.db.write().await;
    let toggles = db.entry(toggle.package_name.clone()).or_default();
    if toggles.iter().any(|t| t.name == toggle.name) {
        return Err(ServiceError::new(
            StatusCode::CONFLICT,
            "Feature toggle with this name already exists",
        ));
    }
    info!(package = %toggle.package_name, id = %toggle.id, name = %toggle.name, "feature toggle created");
    let id = toggle.id.clone();
    toggles.push(toggle);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Feature toggle created successfully", "_id": id })),
    ))
}

async fn get_all_feature_toggles(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
) -> Json<Vec<FeatureToggle>> {
    Json(select(&state, &package_name, |_| true).await)
}

async fn get_active_feature_toggles(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
) -> Json<Vec<FeatureToggle>> {
    let now = state.now();
    Json(select(&state, &package_name, |t| t.is_active_at(now)).await)
}

async fn get_recent_feature_toggles(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
) -> Json<Vec<FeatureToggle>> {
    let cutoff = state.now() - Duration::days(RECENT_WINDOW_DAYS);
    Json(select(&state, &package_name, |t| t.created_at >= cutoff).await)
}

async fn get_active_features_in_range(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ServiceResult<Json<Vec<FeatureToggle>>> {
    let (Some(start), Some(end)) = (query.start_date, query.end_date) else {
        return Err(ServiceError::bad_request("start_date and end_date are required"));
    };
    let start = parse_bound(&start, false)?;
    let end = parse_bound(&end, true)?;
    check_window(start, end)?;
    Ok(Json(select(&state, &package_name, |t| t.overlaps(start, end)).await))
}

async fn get_statistics(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
) -> Json<Statistics> {
    let now = state.now();
    let db = state.db.read().await;
    let toggles = db.get(&package_name).map(Vec::as_slice).unwrap_or_default();
    Json(Statistics {
        total_features: toggles.len(),
        active_features: toggles.iter().filter(|t| t.is_active_at(now)).count(),
    })
}

async fn get_feature_toggles_by_date(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
    Query(query): Query<DateQuery>,
) -> ServiceResult<Json<Vec<FeatureToggle>>> {
    let date = query
        .date
        .ok_or_else(|| ServiceError::bad_request("date is required"))?;
    let start = parse_bound(&date, false)?;
    let end = parse_bound(&date, true)?;
    Ok(Json(select(&state, &package_name, |t| t.overlaps(start, end)).await))
}

async fn delete_feature_toggle(
    State(state): State<AppState>,
    Path((package_name, feature_id)): Path<(String, String)>,
) -> ServiceResult<Json<Value>> {
    let mut db = state.db.write().await;
    let toggles = db.get_mut(&package_name).ok_or_else(ServiceError::not_found)?;
    let index = toggles
        .iter()
        .position(|t| t.id == feature_id)
        .ok_or_else(ServiceError::not_found)?;
    toggles.remove(index);
    info!(package = %package_name, id = %feature_id, "feature toggle deleted");
    Ok(Json(json!({ "message": "Feature toggle deleted successfully" })))
}

async fn update_feature_dates(
    State(state): State<AppState>,
    Path((package_name, feature_id)): Path<(String, String)>,
    payload: Result<Json<UpdateDates>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let Json(input) = payload?;
    if input.beginning_date.is_none() && input.expiration_date.is_none() {
        return Err(ServiceError::bad_request(
            "beginning_date or expiration_date is required",
        ));
    }
    let beginning = input
        .beginning_date
        .map(|raw| parse_bound(&raw, false))
        .transpose()?;
    let expiration = input
        .expiration_date
        .map(|raw| parse_bound(&raw, true))
        .transpose()?;

    let now = state.now();
    let mut db = state.db.write().await;
    let toggle = find_mut(&mut db, &package_name, &feature_id)?;
    let beginning = beginning.unwrap_or(toggle.beginning_date);
    let expiration = expiration.unwrap_or(toggle.expiration_date);
    check_window(beginning, expiration)?;
    toggle.beginning_date = beginning;
    toggle.expiration_date = expiration;
    toggle.updated_at = now;
    info!(package = %package_name, id = %feature_id, "feature toggle dates updated");
    Ok(Json(json!({ "message": "Feature toggle dates updated successfully" })))
}

async fn update_feature_info(
    State(state): State<AppState>,
    Path((package_name, feature_id)): Path<(String, String)>,
    payload: Result<Json<UpdateInfo>, JsonRejection>,
) -> ServiceResult<Json<Value>> {
    let Json(input) = payload?;
    if input.name.is_none() && input.description.is_none() {
        return Err(ServiceError::bad_request("name or description is required"));
    }

    let now = state.now();
    let mut db = state.db.write().await;
    let toggle = find_mut(&mut db, &package_name, &feature_id)?;
    if let Some(name) = input.name {
        toggle.name = name;
    }
    if let Some(description) = input.description {
        toggle.description = description;
    }
    toggle.updated_at = now;
    info!(package = %package_name, id = %feature_id, "feature toggle info updated");
    Ok(Json(json!({ "message": "Feature toggle info updated successfully" })))
}

async fn delete_all_feature_toggles(
    State(state): State<AppState>,
    Path(package_name): Path<String>,
) -> Json<Value> {
    let removed = state
        .db
        .write()
        .await
        .remove(&package_name)
        .map_or(0, |toggles| toggles.len());
    info!(package = %package_name, removed, "feature toggles deleted");
    Json(json!({
        "message": format!("Deleted {removed} feature toggles"),
        "deleted_count": removed,
    }))
}

async fn select(
    state: &AppState,
    package_name: &str,
    keep: impl Fn(&FeatureToggle) -> bool,
) -> Vec<FeatureToggle> {
    let db = state.db.read().await;
    db.get(package_name)
        .map(|toggles| toggles.iter().filter(|t| keep(t)).cloned().collect())
        .unwrap_or_default()
}

fn find_mut<'a>(
    db: &'a mut HashMap<String, Vec<FeatureToggle>>,
    package_name: &str,
    feature_id: &str,
) -> ServiceResult<&'a mut FeatureToggle> {
    db.get_mut(package_name)
        .and_then(|toggles| toggles.iter_mut().find(|t| t.id == feature_id))
        .ok_or_else(ServiceError::not_found)
}

fn required(value: Option<String>, field: &str) -> ServiceResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::bad_request(format!(
            "Missing required field: {field}"
        ))),
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS`, or a bare `YYYY-MM-DD` expanded to the start
/// or end of that day.
fn parse_bound(raw: &str, end_of_day: bool) -> ServiceResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ServiceError::bad_request(format!(
            "Invalid date format: {raw}. Use YYYY-MM-DD HH:MM:SS"
        ))
    })?;
    let ts = if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    ts.ok_or_else(|| ServiceError::bad_request(format!("Invalid date: {raw}")))
}

fn check_window(start: NaiveDateTime, end: NaiveDateTime) -> ServiceResult<()> {
    if start > end {
        return Err(ServiceError::bad_request(
            "beginning_date must be before expiration_date",
        ));
    }
    Ok(())
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}
