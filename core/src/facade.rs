//! Caller-facing asynchronous API.
//!
//! # Design
//! `FeatureToggle` binds the caller's application identifier (its package
//! name) into every call and runs the matching controller method on a tokio
//! blocking worker, so the caller's thread never waits on the network. The
//! outcome is handed to a completion handler on that worker thread.
//!
//! Handlers are optional. Passing `None` turns the call into a no-op: nothing
//! is sent and nothing is reported. Every call is independent; there is no
//! ordering between concurrent calls and no way to cancel one once sent.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::config::Config;
use crate::controller::FeatureController;
use crate::error::ApiError;
use crate::transport::{Transport, UreqTransport};
use crate::types::{FeatureToggleItem, FeaturesStatistics};

/// Completion handler: receives the payload or a human-readable error.
pub type Completion<T> = Box<dyn FnOnce(Result<T, String>) + Send + 'static>;

enum Executor {
    Owned(OwnedRuntime),
    Shared(Handle),
}

impl Executor {
    fn spawn_blocking<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Executor::Owned(owned) => owned.spawn_blocking(task),
            Executor::Shared(handle) => {
                handle.spawn_blocking(task);
            }
        }
    }
}

/// A runtime private to one `FeatureToggle`.
///
/// Dropping it never cancels dispatched calls: the runtime is handed to a
/// drain thread that waits for every tracked task before shutting down.
struct OwnedRuntime {
    runtime: Option<Runtime>,
    tracker: TaskTracker,
}

impl OwnedRuntime {
    fn spawn_blocking<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(runtime) = &self.runtime {
            self.tracker.spawn_blocking_on(task, runtime.handle());
        }
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        self.tracker.close();
        if self.tracker.is_empty() {
            runtime.shutdown_background();
            return;
        }
        let tracker = self.tracker.clone();
        let pending = tracker.len();
        let drain = std::thread::Builder::new()
            .name("feature-toggle-drain".to_string())
            .spawn(move || {
                runtime.block_on(tracker.wait());
                debug!(pending, "feature toggle runtime drained");
            });
        if let Err(error) = drain {
            warn!(%error, pending, "could not start drain thread");
        }
    }
}

pub struct FeatureToggle<T = UreqTransport> {
    controller: Arc<FeatureController<T>>,
    executor: Executor,
}

impl FeatureToggle<UreqTransport> {
    /// Build a ureq-backed client with its own worker runtime.
    ///
    /// Calls still in flight when the value is dropped run to completion and
    /// report to their handlers. Use `FeatureToggle::new` to share an
    /// existing runtime instead.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let controller = FeatureController::from_config(config)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("feature-toggle")
            .build()
            .map_err(|e| ApiError::Runtime(e.to_string()))?;
        Ok(Self {
            controller: Arc::new(controller),
            executor: Executor::Owned(OwnedRuntime {
                runtime: Some(runtime),
                tracker: TaskTracker::new(),
            }),
        })
    }
}

impl<T: Transport + 'static> FeatureToggle<T> {
    /// Dispatch onto an existing runtime.
    pub fn new(controller: FeatureController<T>, handle: Handle) -> Self {
        Self {
            controller: Arc::new(controller),
            executor: Executor::Shared(handle),
        }
    }

    pub fn controller(&self) -> &FeatureController<T> {
        &self.controller
    }

    pub fn get_active_features(
        &self,
        package_name: &str,
        handler: Option<Completion<Vec<FeatureToggleItem>>>,
    ) {
        let package_name = package_name.to_string();
        self.dispatch("Failed to fetch active features", handler, move |c| {
            c.fetch_all_active_features(&package_name)
        });
    }

    pub fn get_all_features(
        &self,
        package_name: &str,
        handler: Option<Completion<Vec<FeatureToggleItem>>>,
    ) {
        let package_name = package_name.to_string();
        self.dispatch("Failed to fetch all features", handler, move |c| {
            c.fetch_all_feature_toggles(&package_name)
        });
    }

    /// Create `item` under `package_name`. Any `package_name` already set on
    /// the item is replaced.
    pub fn create_feature_toggle(
        &self,
        package_name: &str,
        mut item: FeatureToggleItem,
        handler: Option<Completion<String>>,
    ) {
        item.package_name = Some(package_name.to_string());
        self.dispatch("Failed to create feature toggle", handler, move |c| {
            c.create_new_feature_toggle(&item)
        });
    }

    pub fn delete_feature_toggle(
        &self,
        package_name: &str,
        feature_id: &str,
        handler: Option<Completion<String>>,
    ) {
        let (package_name, feature_id) = (package_name.to_string(), feature_id.to_string());
        self.dispatch("Failed to delete feature toggle", handler, move |c| {
            c.delete_feature_toggle(&package_name, &feature_id)
        });
    }

    pub fn update_feature_dates(
        &self,
        package_name: &str,
        feature_id: &str,
        dates: FeatureToggleItem,
        handler: Option<Completion<String>>,
    ) {
        let (package_name, feature_id) = (package_name.to_string(), feature_id.to_string());
        self.dispatch("Failed to update feature toggle dates", handler, move |c| {
            c.update_feature_dates(&package_name, &feature_id, &dates)
        });
    }

    pub fn update_feature_info(
        &self,
        package_name: &str,
        feature_id: &str,
        info: FeatureToggleItem,
        handler: Option<Completion<String>>,
    ) {
        let (package_name, feature_id) = (package_name.to_string(), feature_id.to_string());
        self.dispatch("Failed to update feature information", handler, move |c| {
            c.update_feature_info(&package_name, &feature_id, &info)
        });
    }

    pub fn get_recent_features(
        &self,
        package_name: &str,
        handler: Option<Completion<Vec<FeatureToggleItem>>>,
    ) {
        let package_name = package_name.to_string();
        self.dispatch("Failed to fetch recent features", handler, move |c| {
            c.get_recent_feature_toggles(&package_name)
        });
    }

    pub fn get_active_features_in_range(
        &self,
        package_name: &str,
        start_date: &str,
        end_date: &str,
        handler: Option<Completion<Vec<FeatureToggleItem>>>,
    ) {
        let package_name = package_name.to_string();
        let (start_date, end_date) = (start_date.to_string(), end_date.to_string());
        self.dispatch("Failed to fetch active features in range", handler, move |c| {
            c.get_active_features_in_range(&package_name, &start_date, &end_date)
        });
    }

    pub fn get_feature_statistics(
        &self,
        package_name: &str,
        handler: Option<Completion<FeaturesStatistics>>,
    ) {
        let package_name = package_name.to_string();
        self.dispatch("Failed to fetch feature statistics", handler, move |c| {
            c.get_feature_toggle_statistics(&package_name)
        });
    }

    pub fn get_features_by_date(
        &self,
        package_name: &str,
        date: &str,
        handler: Option<Completion<Vec<FeatureToggleItem>>>,
    ) {
        let (package_name, date) = (package_name.to_string(), date.to_string());
        self.dispatch("Failed to fetch features by date", handler, move |c| {
            c.get_feature_toggles_by_date(&package_name, &date)
        });
    }

    pub fn delete_all_features(&self, package_name: &str, handler: Option<Completion<String>>) {
        let package_name = package_name.to_string();
        self.dispatch("Failed to delete all features", handler, move |c| {
            c.delete_all_feature_toggles(&package_name)
        });
    }

    fn dispatch<R, W>(&self, label: &'static str, handler: Option<Completion<R>>, work: W)
    where
        R: Send + 'static,
        W: FnOnce(&FeatureController<T>) -> Result<R, String> + Send + 'static,
    {
        let Some(handler) = handler else {
            return;
        };
        let controller = Arc::clone(&self.controller);
        self.executor.spawn_blocking(move || {
            let outcome = work(&controller).map_err(|error| {
                debug!(operation = label, %error, "feature toggle call failed");
                format!("{label}: {error}")
            });
            handler(outcome);
        });
    }
}
