//! Domain DTOs for the feature toggle API.
//!
//! # Design
//! Every field of `FeatureToggleItem` is optional on the wire. The same type
//! is used for full records (list responses, create) and for the partial
//! bodies of the two update endpoints: absent fields are skipped on encode,
//! so `FeatureToggleItem::dates(..)` serializes to exactly the update-dates
//! body. The mock-server crate defines its own copies; integration tests
//! catch schema drift between the two.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A feature toggle record, scoped to the package that owns it.
///
/// Date fields use the `YYYY-MM-DD HH:MM:SS` layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureToggleItem {
    /// Server-assigned identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beginning_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Owning application. Overwritten by the client on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
}

impl FeatureToggleItem {
    /// A toggle ready to be created. `package_name` is filled in at dispatch.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        beginning_date: impl Into<String>,
        expiration_date: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            beginning_date: Some(beginning_date.into()),
            expiration_date: Some(expiration_date.into()),
            ..Self::default()
        }
    }

    /// Partial body for the update-dates endpoint.
    pub fn dates(beginning_date: impl Into<String>, expiration_date: impl Into<String>) -> Self {
        Self {
            beginning_date: Some(beginning_date.into()),
            expiration_date: Some(expiration_date.into()),
            ..Self::default()
        }
    }

    /// Partial body for the update-info endpoint.
    pub fn info(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for FeatureToggleItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field(value: &Option<String>) -> &str {
            value.as_deref().unwrap_or("-")
        }
        writeln!(f, "FeatureToggleItem:")?;
        writeln!(f, "name: {}", field(&self.name))?;
        writeln!(f, "description: {}", field(&self.description))?;
        writeln!(f, "beginning date: {}", field(&self.beginning_date))?;
        writeln!(f, "expiration date: {}", field(&self.expiration_date))?;
        writeln!(f, "created at: {}", field(&self.created_at))?;
        writeln!(f, "updated at: {}", field(&self.updated_at))
    }
}

/// Aggregate counts for one package, as returned by the statistics endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeaturesStatistics {
    pub total_features: u64,
    pub active_features: u64,
}

/// Error envelope the service returns with non-2xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}
