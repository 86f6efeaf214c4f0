//! Installation state oracles.
//!
//! The coordinator only reinstalls the background service when the app is
//! installed, its daemon is installed, and the daemon has not been stopped
//! on purpose. Those facts come from an [`InstallationState`] implementation.

use std::path::PathBuf;

use tracing::debug;

use crate::config::UpdaterConfig;

/// Read-only facts about the current deployment.
pub trait InstallationState: Send + Sync {
    /// The application is installed at its expected location.
    fn is_installed(&self) -> bool;

    /// The background daemon is registered with the service manager.
    fn is_daemon_installed(&self) -> bool;

    /// The daemon is not running.
    fn is_service_stopped(&self) -> bool;

    /// Whether an update should be followed by a service reinstall.
    fn needs_service_reinstall(&self) -> bool {
        self.is_installed() && self.is_daemon_installed() && !self.is_service_stopped()
    }
}

/// A fixed snapshot of installation facts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallationFacts {
    pub installed: bool,
    pub daemon_installed: bool,
    pub service_stopped: bool,
}

impl InstallationFacts {
    pub fn new(installed: bool, daemon_installed: bool, service_stopped: bool) -> Self {
        Self {
            installed,
            daemon_installed,
            service_stopped,
        }
    }

    /// Capture the current answers of any oracle.
    pub fn snapshot(state: &dyn InstallationState) -> Self {
        Self::new(
            state.is_installed(),
            state.is_daemon_installed(),
            state.is_service_stopped(),
        )
    }
}

impl InstallationState for InstallationFacts {
    fn is_installed(&self) -> bool {
        self.installed
    }

    fn is_daemon_installed(&self) -> bool {
        self.daemon_installed
    }

    fn is_service_stopped(&self) -> bool {
        self.service_stopped
    }
}

/// Answers installation queries from the filesystem and the platform
/// service manager (launchd on macOS, systemd on Linux).
#[derive(Debug, Clone)]
pub struct SystemInstallation {
    app_binary: PathBuf,
    service_label: String,
    service_definition: PathBuf,
}

impl SystemInstallation {
    pub fn new(app_binary: PathBuf, service_label: String, service_definition: PathBuf) -> Self {
        Self {
            app_binary,
            service_label,
            service_definition,
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(
            config.reinstall.app_binary.clone(),
            config.service.label.clone(),
            config.service.definition_path.clone(),
        )
    }

    pub fn service_label(&self) -> &str {
        &self.service_label
    }
}

impl InstallationState for SystemInstallation {
    fn is_installed(&self) -> bool {
        self.app_binary.exists()
    }

    fn is_daemon_installed(&self) -> bool {
        self.service_definition.exists()
    }

    fn is_service_stopped(&self) -> bool {
        match is_service_running(&self.service_label) {
            Ok(running) => !running,
            Err(e) => {
                // Unknown state counts as stopped, which skips the reinstall.
                debug!("Cannot query service {}: {}", self.service_label, e);
                true
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn is_service_running(label: &str) -> Result<bool, String> {
    use std::process::Command;

    let result = Command::new("launchctl")
        .args(["list", label])
        .output()
        .map_err(|e| format!("Failed to execute launchctl: {}", e))?;

    if !result.status.success() {
        // Not loaded at all
        return Ok(false);
    }
    Ok(parse_launchctl_list(&String::from_utf8_lossy(&result.stdout)))
}

#[cfg(target_os = "linux")]
fn is_service_running(unit: &str) -> Result<bool, String> {
    use std::process::Command;

    let result = Command::new("systemctl")
        .args(["is-active", unit])
        .output()
        .map_err(|e| format!("Failed to execute systemctl: {}", e))?;

    Ok(parse_systemctl_is_active(&String::from_utf8_lossy(
        &result.stdout,
    )))
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn is_service_running(_label: &str) -> Result<bool, String> {
    Err("service state is only available on macOS and Linux".to_string())
}

/// Whether `launchctl list` output shows a live PID.
///
/// Accepts both the dictionary form printed for a single label
/// (`"PID" = 123;`) and the tabular `PID\tStatus\tLabel` form.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_launchctl_list(stdout: &str) -> bool {
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("\"PID\" =") {
            return rest.trim().trim_end_matches(';').parse::<u32>().is_ok();
        }
    }
    stdout
        .lines()
        .next()
        .and_then(|line| line.split('\t').next())
        .map(|pid| pid != "-" && pid.parse::<u32>().is_ok())
        .unwrap_or(false)
}

/// Whether `systemctl is-active` output reports the unit active.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_systemctl_is_active(stdout: &str) -> bool {
    stdout.trim() == "active"
}
