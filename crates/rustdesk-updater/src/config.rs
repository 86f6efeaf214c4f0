//! Configuration structures for the update coordinator.
//!
//! Defines where the relaunch flag is persisted, how the post-update
//! reinstall command is built, and which background service it concerns.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::UpdateError;

/// Environment variable naming a configuration file.
///
/// A bare relaunch carries no arguments, so the file location has to come
/// from the environment rather than the command line.
pub const CONFIG_ENV_VAR: &str = "RUSTDESK_UPDATER_CONFIG";

/// Main updater configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Relaunch flag persistence
    #[serde(default)]
    pub flag: FlagConfig,

    /// Post-update reinstall command
    #[serde(default)]
    pub reinstall: ReinstallConfig,

    /// Background service the reinstall concerns
    #[serde(default)]
    pub service: ServiceConfig,
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), UpdateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from an explicit path, else from `RUSTDESK_UPDATER_CONFIG`, else
    /// fall back to built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, UpdateError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load_from_file(Path::new(&path)),
            _ => {
                debug!("No updater config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Like [`load_or_default`](Self::load_or_default), but an unreadable
    /// file is logged and replaced by defaults instead of failing.
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        Self::load_or_default(path).unwrap_or_else(|e| {
            warn!("Ignoring updater config: {}; using defaults", e);
            Self::default()
        })
    }

    /// The shell command that reinstalls the background service.
    ///
    /// Rendered as `sleep <delay>; <app_binary> --reinstall-service`.
    pub fn reinstall_command(&self) -> String {
        format!(
            "sleep {}; {} --reinstall-service",
            self.reinstall.delay_secs,
            self.reinstall.app_binary.display()
        )
    }
}

/// Where and how the relaunch flag is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagConfig {
    /// Preference namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Preference key holding the flag
    #[serde(default = "default_key")]
    pub key: String,

    /// Directory holding preference namespaces
    #[serde(default = "default_prefs_dir")]
    pub prefs_dir: PathBuf,

    /// Sentinel file path
    #[serde(default = "default_sentinel_path")]
    pub sentinel_path: PathBuf,
}

impl FlagConfig {
    /// Path of the JSON document backing the preference namespace.
    pub fn preference_file(&self) -> PathBuf {
        self.prefs_dir.join(format!("{}.json", self.namespace))
    }
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            key: default_key(),
            prefs_dir: default_prefs_dir(),
            sentinel_path: default_sentinel_path(),
        }
    }
}

/// Post-update reinstall settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinstallConfig {
    /// Application binary invoked with `--reinstall-service`
    #[serde(default = "default_app_binary")]
    pub app_binary: PathBuf,

    /// Seconds to wait before reinstalling, so the relaunched app can settle
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Shell interpreter used to run commands
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
}

impl Default for ReinstallConfig {
    fn default() -> Self {
        Self {
            app_binary: default_app_binary(),
            delay_secs: default_delay_secs(),
            shell: default_shell(),
        }
    }
}

/// Background service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// launchd label or systemd unit name
    #[serde(default = "default_service_label")]
    pub label: String,

    /// launchd plist or systemd unit file path
    #[serde(default = "default_service_definition")]
    pub definition_path: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            label: default_service_label(),
            definition_path: default_service_definition(),
        }
    }
}

fn default_namespace() -> String {
    "com.carriez.rustdesk".to_string()
}

fn default_key() -> String {
    "ShouldRunPostUpdateScript".to_string()
}

/// `~/Library/Preferences` on macOS, the XDG config dir elsewhere.
fn default_prefs_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.preference_dir().to_path_buf())
        .unwrap_or_else(std::env::temp_dir)
}

fn default_sentinel_path() -> PathBuf {
    PathBuf::from("/tmp/.rustdesk_update")
}

fn default_app_binary() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Applications/RustDesk.app/Contents/MacOS/RustDesk")
    } else {
        PathBuf::from("/usr/bin/rustdesk")
    }
}

fn default_delay_secs() -> u64 {
    2
}

fn default_shell() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/bin/zsh")
    } else {
        PathBuf::from("/bin/sh")
    }
}

fn default_service_label() -> String {
    if cfg!(target_os = "macos") {
        "com.carriez.RustDesk_service".to_string()
    } else {
        "rustdesk.service".to_string()
    }
}

fn default_service_definition() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Library/LaunchDaemons/com.carriez.RustDesk_service.plist")
    } else {
        PathBuf::from("/etc/systemd/system/rustdesk.service")
    }
}
