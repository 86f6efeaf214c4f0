//! Wrapper around the external update framework.
//!
//! The framework owns transport, signature checks, installation and the
//! relaunch itself. This side only starts it, keeps its automatic checks
//! off, triggers on-demand checks, and routes its lifecycle events to an
//! [`UpdateListener`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::UpdateError;
use crate::listener::{UpdateListener, UpdaterEvent};

/// Control surface of the external update framework.
///
/// Results of a check are not returned here; they arrive later as
/// [`UpdaterEvent`]s.
#[async_trait]
pub trait ExternalUpdater: Send + Sync {
    /// Start the framework.
    fn start(&self) -> Result<(), UpdateError>;

    /// Begin a user-initiated update check.
    async fn check_for_updates(&self) -> Result<(), UpdateError>;

    /// Whether the framework schedules its own background checks.
    fn automatically_checks_for_updates(&self) -> bool;

    fn set_automatically_checks_for_updates(&self, enabled: bool);
}

/// Owns the external updater and its event subscriber.
pub struct Updater {
    driver: Arc<dyn ExternalUpdater>,
    listener: Arc<dyn UpdateListener>,
}

impl Updater {
    /// Start the framework and force its automatic checks off, overriding
    /// whatever preference it persisted.
    pub fn new(
        driver: Arc<dyn ExternalUpdater>,
        listener: Arc<dyn UpdateListener>,
    ) -> Result<Self, UpdateError> {
        driver.start()?;
        let updater = Self { driver, listener };
        updater.set_automatically_checks_for_updates(false);
        Ok(updater)
    }

    pub fn automatically_checks_for_updates(&self) -> bool {
        self.driver.automatically_checks_for_updates()
    }

    /// Change the option only when it differs from the current value.
    pub fn set_automatically_checks_for_updates(&self, enabled: bool) {
        if self.driver.automatically_checks_for_updates() != enabled {
            self.driver.set_automatically_checks_for_updates(enabled);
        }
    }

    /// Trigger an on-demand check. A failure to start the check is reported
    /// to the listener like any other aborted check.
    pub async fn check_for_updates(&self) {
        info!("Checking for updates...");
        if let Err(e) = self.driver.check_for_updates().await {
            self.handle(&UpdaterEvent::AbortedWithError(e.to_string()));
        }
    }

    /// Deliver one event to the listener.
    pub fn handle(&self, event: &UpdaterEvent) {
        debug!("Updater event: {:?}", event);
        self.listener.on_event(event);
    }

    /// Deliver events until every sender is dropped.
    pub async fn run_events(&self, mut events: mpsc::Receiver<UpdaterEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(&event);
        }
        debug!("Updater event channel closed");
    }
}
