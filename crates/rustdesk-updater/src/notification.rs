//! Update-available notifications.
//!
//! Notifications go through the platform's command-line notifier:
//! - macOS: `osascript` "display notification"
//! - Linux: `notify-send`, falling back to D-Bus via `gdbus`
//!
//! Delivery is fire-and-forget. Callers log failures and move on.

use tracing::{debug, info, warn};

use crate::error::UpdateError;
use crate::listener::UpdateItem;

/// Title shown for every update notification.
pub const UPDATE_TITLE: &str = "New Update Available";

/// Label of the action that starts the install.
pub const INSTALL_ACTION: &str = "Install";

/// Content for an update notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Label of the actionable button, if the platform shows one
    pub action: Option<String>,
}

impl NotificationContent {
    /// Notification offering to install `item`.
    pub fn for_update(item: &UpdateItem) -> Self {
        Self {
            title: UPDATE_TITLE.to_string(),
            body: format!("Click to install version {}", item.display_version),
            action: Some(INSTALL_ACTION.to_string()),
        }
    }
}

/// Platform-specific notification backend.
pub trait NotificationBackend: Send + Sync {
    /// Deliver a notification.
    fn show(&self, content: &NotificationContent) -> Result<(), UpdateError>;

    /// Whether this backend can reach a notification service.
    fn is_supported(&self) -> bool;
}

/// Create the appropriate notification backend for the current platform.
///
/// Falls back to [`LogNotificationBackend`] when the platform notifier is
/// not available.
pub fn create_platform_backend(app_name: &str) -> Box<dyn NotificationBackend> {
    #[cfg(target_os = "macos")]
    {
        let _ = app_name;
        supported_or_log(Box::new(MacOSNotificationBackend::new()))
    }

    #[cfg(target_os = "linux")]
    {
        supported_or_log(Box::new(LinuxNotificationBackend::with_app_name(
            app_name.to_string(),
        )))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        let _ = app_name;
        Box::new(LogNotificationBackend)
    }
}

#[cfg_attr(not(any(target_os = "macos", target_os = "linux")), allow(dead_code))]
fn supported_or_log(backend: Box<dyn NotificationBackend>) -> Box<dyn NotificationBackend> {
    if backend.is_supported() {
        backend
    } else {
        warn!("No notification service available, update notices go to the log");
        Box::new(LogNotificationBackend)
    }
}

/// Backend that only writes notifications to the log.
pub struct LogNotificationBackend;

impl NotificationBackend for LogNotificationBackend {
    fn show(&self, content: &NotificationContent) -> Result<(), UpdateError> {
        info!("Notification: {} - {}", content.title, content.body);
        Ok(())
    }

    fn is_supported(&self) -> bool {
        false
    }
}

// =============================================================================
// macOS notification backend
// =============================================================================

#[cfg(target_os = "macos")]
pub struct MacOSNotificationBackend;

#[cfg(target_os = "macos")]
impl MacOSNotificationBackend {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
impl Default for MacOSNotificationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "macos")]
impl NotificationBackend for MacOSNotificationBackend {
    fn show(&self, content: &NotificationContent) -> Result<(), UpdateError> {
        use std::process::Command;

        // osascript notifications have no buttons; the action is folded into the body.
        let body = match &content.action {
            Some(action) => format!("{} ({})", content.body, action),
            None => content.body.clone(),
        };
        let script = format!(
            r#"display notification "{}" with title "{}" sound name "default""#,
            escape_applescript(&body),
            escape_applescript(&content.title)
        );

        let result = Command::new("osascript")
            .args(["-e", &script])
            .output()
            .map_err(|e| {
                UpdateError::NotificationFailed(format!("cannot execute osascript: {}", e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(UpdateError::NotificationFailed(stderr.trim().to_string()));
        }
        debug!("macOS notification shown");
        Ok(())
    }

    fn is_supported(&self) -> bool {
        true
    }
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn escape_applescript(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// =============================================================================
// Linux notification backend
// =============================================================================

#[cfg(target_os = "linux")]
pub struct LinuxNotificationBackend {
    app_name: String,
}

#[cfg(target_os = "linux")]
impl LinuxNotificationBackend {
    pub fn new() -> Self {
        Self {
            app_name: "RustDesk".to_string(),
        }
    }

    pub fn with_app_name(app_name: String) -> Self {
        Self { app_name }
    }

    fn show_via_dbus(&self, content: &NotificationContent) -> Result<(), UpdateError> {
        use std::process::Command;

        let actions = match &content.action {
            Some(action) => format!("['install', '{}']", action.replace('\'', "")),
            None => "[]".to_string(),
        };
        let result = Command::new("gdbus")
            .args([
                "call",
                "--session",
                "--dest", "org.freedesktop.Notifications",
                "--object-path", "/org/freedesktop/Notifications",
                "--method", "org.freedesktop.Notifications.Notify",
                &self.app_name,
                "0",  // replaces_id
                "",   // app_icon
                &content.title,
                &content.body,
                &actions,
                "{}", // hints
                "-1", // expire_timeout
            ])
            .output()
            .map_err(|e| {
                UpdateError::NotificationFailed(format!("cannot execute gdbus: {}", e))
            })?;

        if !result.status.success() {
            return Err(UpdateError::NotificationFailed(
                "D-Bus notification rejected".to_string(),
            ));
        }
        debug!("Linux notification shown via D-Bus");
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl Default for LinuxNotificationBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "linux")]
impl NotificationBackend for LinuxNotificationBackend {
    fn show(&self, content: &NotificationContent) -> Result<(), UpdateError> {
        use std::process::Command;

        match Command::new("notify-send")
            .args(notify_send_args(&self.app_name, content))
            .output()
        {
            Ok(result) if result.status.success() => {
                debug!("Linux notification shown via notify-send");
                Ok(())
            }
            Ok(_) | Err(_) => {
                warn!("notify-send unavailable, trying D-Bus");
                self.show_via_dbus(content)
            }
        }
    }

    fn is_supported(&self) -> bool {
        use std::process::Command;

        ["notify-send", "gdbus"].iter().any(|tool| {
            Command::new("which")
                .arg(tool)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }
}

/// Arguments for `notify-send`.
///
/// Actions are never passed: with an action, newer `notify-send` stays
/// running until the notification is dismissed. The label goes into the body
/// instead.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn notify_send_args(app_name: &str, content: &NotificationContent) -> Vec<String> {
    let body = match &content.action {
        Some(action) => format!("{} ({})", content.body, action),
        None => content.body.clone(),
    };
    vec![
        "--app-name".to_string(),
        app_name.to_string(),
        content.title.clone(),
        body,
    ]
}
