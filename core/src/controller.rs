//! One blocking call per remote operation, with every failure flattened into
//! a labelled message.
//!
//! # Design
//! `FeatureController` pairs the stateless `FeatureToggleClient` with a
//! `Transport`. Each public method builds the request, executes it and
//! parses the response; any `ApiError` along the way is rendered and
//! prefixed with an operation label ("Failed to delete feature toggle: ..."),
//! so callers only ever see `Result<T, String>`. Create, delete and the two
//! updates answer with a fixed confirmation; delete-all passes on the
//! server's count message.

use tracing::debug;

use crate::client::{Endpoint, FeatureToggleClient};
use crate::config::Config;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{FeatureToggleItem, FeaturesStatistics};

pub struct FeatureController<T = UreqTransport> {
    client: FeatureToggleClient,
    transport: T,
}

impl FeatureController<UreqTransport> {
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let client = FeatureToggleClient::new(&config.base_url)?;
        Ok(Self::new(client, UreqTransport::new()))
    }
}

impl<T: Transport> FeatureController<T> {
    pub fn new(client: FeatureToggleClient, transport: T) -> Self {
        Self { client, transport }
    }

    pub fn client(&self) -> &FeatureToggleClient {
        &self.client
    }

    /// Create `item` as is; the caller decides its `package_name`.
    pub fn create_new_feature_toggle(&self, item: &FeatureToggleItem) -> Result<String, String> {
        self.message(
            Endpoint::CreateFeatureToggle,
            self.client.build_create_feature_toggle(item),
        )
    }

    pub fn fetch_all_feature_toggles(&self, package_name: &str) -> Result<Vec<FeatureToggleItem>, String> {
        self.list(
            Endpoint::GetAllFeatureToggles,
            self.client.build_get_all_feature_toggles(package_name),
        )
    }

    pub fn fetch_all_active_features(&self, package_name: &str) -> Result<Vec<FeatureToggleItem>, String> {
        self.list(
            Endpoint::GetActiveFeatureToggles,
            self.client.build_get_active_feature_toggles(package_name),
        )
    }

    pub fn delete_feature_toggle(&self, package_name: &str, feature_id: &str) -> Result<String, String> {
        self.message(
            Endpoint::DeleteFeatureToggle,
            Ok(self.client.build_delete_feature_toggle(package_name, feature_id)),
        )
    }

    pub fn update_feature_dates(
        &self,
        package_name: &str,
        feature_id: &str,
        dates: &FeatureToggleItem,
    ) -> Result<String, String> {
        self.message(
            Endpoint::UpdateFeatureDates,
            self.client.build_update_feature_dates(package_name, feature_id, dates),
        )
    }

    pub fn update_feature_info(
        &self,
        package_name: &str,
        feature_id: &str,
        info: &FeatureToggleItem,
    ) -> Result<String, String> {
        self.message(
            Endpoint::UpdateFeatureInfo,
            self.client.build_update_feature_info(package_name, feature_id, info),
        )
    }

    /// Toggles created in the last 30 days.
    pub fn get_recent_feature_toggles(&self, package_name: &str) -> Result<Vec<FeatureToggleItem>, String> {
        self.list(
            Endpoint::GetRecentFeatureToggles,
            self.client.build_get_recent_feature_toggles(package_name),
        )
    }

    pub fn get_active_features_in_range(
        &self,
        package_name: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<FeatureToggleItem>, String> {
        self.list(
            Endpoint::GetActiveFeaturesInRange,
            self.client
                .build_get_active_features_in_range(package_name, start_date, end_date),
        )
    }

    pub fn get_feature_toggle_statistics(&self, package_name: &str) -> Result<FeaturesStatistics, String> {
        self.run(
            Endpoint::GetFeatureToggleStatistics,
            Ok(self.client.build_get_feature_toggle_statistics(package_name)),
            |client, response| client.parse_statistics(response),
        )
    }

    pub fn get_feature_toggles_by_date(
        &self,
        package_name: &str,
        date: &str,
    ) -> Result<Vec<FeatureToggleItem>, String> {
        self.list(
            Endpoint::GetFeatureTogglesByDate,
            self.client.build_get_feature_toggles_by_date(package_name, date),
        )
    }

    pub fn delete_all_feature_toggles(&self, package_name: &str) -> Result<String, String> {
        self.message(
            Endpoint::DeleteAllFeatureToggles,
            Ok(self.client.build_delete_all_feature_toggles(package_name)),
        )
    }

    fn list(&self, endpoint: Endpoint, request: HttpRequest) -> Result<Vec<FeatureToggleItem>, String> {
        self.run(endpoint, Ok(request), |client, response| {
            client.parse_toggle_list(response)
        })
    }

    fn message(
        &self,
        endpoint: Endpoint,
        request: Result<HttpRequest, ApiError>,
    ) -> Result<String, String> {
        let message = self.run(endpoint, request, |client, response| client.parse_message(response))?;
        Ok(match (fixed_confirmation(endpoint), message) {
            (Some(fixed), _) => fixed.to_string(),
            (None, Some(message)) => message,
            (None, None) => "All feature toggles deleted successfully.".to_string(),
        })
    }

    fn run<R>(
        &self,
        endpoint: Endpoint,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&FeatureToggleClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, String> {
        let outcome = request.and_then(|request| {
            debug!(
                endpoint = endpoint.name(),
                method = %request.method,
                url = %request.path,
                "sending feature toggle request"
            );
            let response = self.transport.execute(&request)?;
            debug!(
                endpoint = endpoint.name(),
                status = response.status,
                "feature toggle response received"
            );
            parse(&self.client, response)
        });
        outcome.map_err(|e| format!("{}: {e}", failure_label(endpoint)))
    }
}

fn failure_label(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::CreateFeatureToggle => "Failed to create feature toggle",
        Endpoint::GetAllFeatureToggles => "Failed to fetch feature toggles",
        Endpoint::GetActiveFeatureToggles => "Failed to fetch active feature toggles",
        Endpoint::DeleteFeatureToggle => "Failed to delete feature toggle",
        Endpoint::UpdateFeatureDates => "Failed to update feature toggle dates",
        Endpoint::UpdateFeatureInfo => "Failed to update feature information",
        Endpoint::GetRecentFeatureToggles => "Failed to fetch recent feature toggles",
        Endpoint::GetActiveFeaturesInRange => "Failed to retrieve active features in range",
        Endpoint::GetFeatureToggleStatistics => "Failed to fetch feature toggle statistics",
        Endpoint::GetFeatureTogglesByDate => "Failed to fetch feature toggles by date",
        Endpoint::DeleteAllFeatureToggles => "Failed to delete all feature toggles",
    }
}

/// Confirmation reported for a successful write, whatever the server sent.
/// Delete-all has none: it reports the server's count instead.
fn fixed_confirmation(endpoint: Endpoint) -> Option<&'static str> {
    match endpoint {
        Endpoint::CreateFeatureToggle => Some("Feature created successfully!"),
        Endpoint::DeleteFeatureToggle => Some("Feature toggle deleted successfully."),
        Endpoint::UpdateFeatureDates => Some("Feature toggle dates updated successfully."),
        Endpoint::UpdateFeatureInfo => Some("Feature information updated successfully."),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::testing::MockTransport;

    const PKG: &str = "com.example.app";

    fn controller() -> (FeatureController<Arc<MockTransport>>, Arc<MockTransport>) {
        let transport = MockTransport::new();
        let client = FeatureToggleClient::new("http://127.0.0.1:5000/").unwrap();
        (FeatureController::new(client, Arc::clone(&transport)), transport)
    }

    #[test]
    fn list_success_returns_items_in_order() {
        let (c, t) = controller();
        t.respond(
            200,
            r#"[{"_id":"b","name":"second"},{"_id":"a","name":"first"},{"_id":"c","name":"third"}]"#,
        );
        let items = c.fetch_all_feature_toggles(PKG).unwrap();
        let ids: Vec<&str> = items.iter().filter_map(|i| i.id.as_deref()).collect();
        assert_eq!(ids, ["b", "a", "c"]);

        let sent = t.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].path, "http://127.0.0.1:5000/feature-toggles/com.example.app");
    }

    #[test]
    fn server_error_is_labelled() {
        let (c, t) = controller();
        t.respond(404, r#"{"error":"Feature toggle not found"}"#);
        let err = c.delete_feature_toggle(PKG, "missing").unwrap_err();
        assert_eq!(err, "Failed to delete feature toggle: Feature toggle not found");
    }

    #[test]
    fn malformed_error_body_uses_fallback() {
        let (c, t) = controller();
        t.respond(500, "Internal Server Error");
        let err = c.fetch_all_active_features(PKG).unwrap_err();
        assert_eq!(
            err,
            "Failed to fetch active feature toggles: Failed to parse error response."
        );
    }

    #[test]
    fn error_object_without_field_is_unknown_error() {
        let (c, t) = controller();
        t.respond(400, r#"{"status":"bad"}"#);
        let err = c.get_recent_feature_toggles(PKG).unwrap_err();
        assert_eq!(err, "Failed to fetch recent feature toggles: Unknown error");
    }

    #[test]
    fn transport_failure_is_prefixed_with_error() {
        let (c, t) = controller();
        t.fail("connection refused");
        let err = c.get_feature_toggles_by_date(PKG, "2025-06-01 00:00:00").unwrap_err();
        assert_eq!(
            err,
            "Failed to fetch feature toggles by date: Error: connection refused"
        );
    }

    #[test]
    fn list_without_body_is_no_data() {
        let (c, t) = controller();
        t.respond(200, "");
        let err = c
            .get_active_features_in_range(PKG, "2025-01-01", "2025-01-31")
            .unwrap_err();
        assert_eq!(
            err,
            "Failed to retrieve active features in range: No data received"
        );
    }

    #[test]
    fn message_operations_fall_back_to_confirmation() {
        let (c, t) = controller();
        t.respond(201, "");
        t.respond(204, "");
        t.respond(200, "");
        t.respond(200, "");
        t.respond(200, "");
        let item = FeatureToggleItem::new("dark_mode", "Dark UI", "2025-01-15 00:00:00", "2025-12-31 23:59:59");
        assert_eq!(c.create_new_feature_toggle(&item).unwrap(), "Feature created successfully!");
        assert_eq!(c.delete_feature_toggle(PKG, "f").unwrap(), "Feature toggle deleted successfully.");
        assert_eq!(
            c.update_feature_dates(PKG, "f", &FeatureToggleItem::dates("a", "b")).unwrap(),
            "Feature toggle dates updated successfully."
        );
        assert_eq!(
            c.update_feature_info(PKG, "f", &FeatureToggleItem::info("n", "d")).unwrap(),
            "Feature information updated successfully."
        );
        assert_eq!(
            c.delete_all_feature_toggles(PKG).unwrap(),
            "All feature toggles deleted successfully."
        );
        assert_eq!(t.calls(), 5);
    }

    #[test]
    fn confirmations_ignore_server_message() {
        let (c, t) = controller();
        t.respond(201, r#"{"message":"Feature toggle created successfully"}"#);
        t.respond(200, r#"{"message":"Feature toggle deleted successfully"}"#);
        t.respond(200, "ok");
        let item = FeatureToggleItem::new("dark_mode", "Dark UI", "2025-01-15 00:00:00", "2025-12-31 23:59:59");
        assert_eq!(c.create_new_feature_toggle(&item).unwrap(), "Feature created successfully!");
        assert_eq!(c.delete_feature_toggle(PKG, "f").unwrap(), "Feature toggle deleted successfully.");
        assert_eq!(
            c.update_feature_info(PKG, "f", &FeatureToggleItem::info("n", "d")).unwrap(),
            "Feature information updated successfully."
        );
    }

    #[test]
    fn delete_all_reports_server_count() {
        let (c, t) = controller();
        t.respond(200, r#"{"message":"Deleted 3 feature toggles","deleted_count":3}"#);
        assert_eq!(c.delete_all_feature_toggles(PKG).unwrap(), "Deleted 3 feature toggles");
    }

    #[test]
    fn statistics_decode_and_parse_failure() {
        let (c, t) = controller();
        t.respond(200, r#"{"total_features":3,"active_features":1}"#);
        t.respond(200, "three");
        let stats = c.get_feature_toggle_statistics(PKG).unwrap();
        assert_eq!(stats.total_features, 3);
        assert_eq!(stats.active_features, 1);

        let err = c.get_feature_toggle_statistics(PKG).unwrap_err();
        assert!(
            err.starts_with("Failed to fetch feature toggle statistics: Failed to parse statistics response"),
            "{err}"
        );
    }

    #[test]
    fn from_config_rejects_bad_url() {
        assert!(matches!(
            FeatureController::from_config(&Config::new("::nope::")),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }
}
