//! Client SDK for the feature toggle service.
//!
//! # Overview
//! Fetches, creates, updates and deletes feature toggle records scoped to an
//! application's package name. Each operation maps to exactly one REST call.
//!
//! # Design
//! - `FeatureToggleClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. It never touches the network, so
//!   foreign hosts (see the `ffi` crate) can drive it with their own I/O.
//! - `Transport` executes requests; `UreqTransport` is the default.
//! - `FeatureController` runs one blocking call per operation and flattens
//!   every failure into a labelled message.
//! - `FeatureToggle` is the caller-facing surface: it binds the package name,
//!   dispatches onto a tokio blocking worker and reports through an optional
//!   completion handler.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod facade;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{Endpoint, FeatureToggleClient};
pub use config::Config;
pub use controller::FeatureController;
pub use error::ApiError;
pub use facade::{Completion, FeatureToggle};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{ErrorBody, FeatureToggleItem, FeaturesStatistics};
