//! Update lifecycle events and the listener that reacts to them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::coordinator::PostUpdateCoordinator;
use crate::notification::{NotificationBackend, NotificationContent};

/// Version metadata of an update offered by the external updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateItem {
    /// Machine-comparable version string
    pub version: String,
    /// Version as shown to users
    pub display_version: String,
}

impl UpdateItem {
    pub fn new(version: impl Into<String>, display_version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            display_version: display_version.into(),
        }
    }
}

/// Lifecycle events emitted by the external updater.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdaterEvent {
    /// The check completed and the app is current
    NoUpdateFound,
    /// The check or install was aborted; carries the error description
    AbortedWithError(String),
    /// A newer version is available
    ValidUpdateFound(UpdateItem),
    /// The updater is about to relaunch the app into the new version
    WillRelaunch,
}

/// Subscriber for updater lifecycle events.
pub trait UpdateListener: Send + Sync {
    fn on_event(&self, event: &UpdaterEvent);
}

/// Reacts to updater events: logs, notifies the user, and hands the
/// relaunch over to the [`PostUpdateCoordinator`].
pub struct LifecycleListener {
    notifier: Box<dyn NotificationBackend>,
    coordinator: Arc<PostUpdateCoordinator>,
}

impl LifecycleListener {
    pub fn new(
        notifier: Box<dyn NotificationBackend>,
        coordinator: Arc<PostUpdateCoordinator>,
    ) -> Self {
        Self {
            notifier,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &PostUpdateCoordinator {
        &self.coordinator
    }

    pub fn on_no_update_found(&self) {
        info!("Already the latest version");
    }

    /// Retrying is left to the external updater.
    pub fn on_aborted_with_error(&self, description: &str) {
        warn!("Failed to check update: {}", description);
    }

    /// Offer the update to the user. Delivery failures are only logged.
    pub fn on_valid_update_found(&self, item: &UpdateItem) {
        info!(
            "Update available: {} (version {})",
            item.display_version, item.version
        );
        let content = NotificationContent::for_update(item);
        if let Err(e) = self.notifier.show(&content) {
            warn!("Failed to show update notification: {}", e);
        }
    }

    pub fn on_will_relaunch(&self) {
        self.coordinator.on_will_relaunch();
    }
}

impl UpdateListener for LifecycleListener {
    fn on_event(&self, event: &UpdaterEvent) {
        match event {
            UpdaterEvent::NoUpdateFound => self.on_no_update_found(),
            UpdaterEvent::AbortedWithError(description) => self.on_aborted_with_error(description),
            UpdaterEvent::ValidUpdateFound(item) => self.on_valid_update_found(item),
            UpdaterEvent::WillRelaunch => self.on_will_relaunch(),
        }
    }
}
