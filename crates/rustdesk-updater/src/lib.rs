//! # rustdesk-updater
//!
//! Self-update coordination for RustDesk.
//!
//! The update framework itself (feed polling, download, signature checks,
//! installation, relaunch) is an external collaborator. This crate handles
//! what happens around an update cycle:
//! - Reacting to updater lifecycle events (log, notify, hand over relaunch)
//! - Persisting a "reinstall the service" flag across the relaunch
//! - Reinstalling the background service on the next bare launch
//! - Running shell commands with combined output and classified failures
//!
//! ## Failure policy
//!
//! Nothing here is fatal to the running application. Flag writes are best
//! effort, update-check errors are logged, and a failed reinstall is logged
//! and not retried.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod flag;
pub mod installation;
pub mod listener;
pub mod notification;
#[cfg(test)]
mod proptests;
pub mod shell;
pub mod updater;

// Re-export main types for convenience
pub use config::{FlagConfig, ReinstallConfig, ServiceConfig, UpdaterConfig, CONFIG_ENV_VAR};
pub use coordinator::{CoordinatorState, LaunchMode, PostUpdateCoordinator, ReinstallDispatch};
pub use error::{CommandFailure, UpdateError};
pub use flag::{FlagBackend, PreferenceStore, RelaunchFlag, SentinelFile, SENTINEL_CONTENT};
pub use installation::{InstallationFacts, InstallationState, SystemInstallation};
pub use listener::{LifecycleListener, UpdateItem, UpdateListener, UpdaterEvent};
pub use notification::{
    create_platform_backend, LogNotificationBackend, NotificationBackend, NotificationContent,
};
pub use shell::{CommandRunner, ShellRunner};
pub use updater::{ExternalUpdater, Updater};
