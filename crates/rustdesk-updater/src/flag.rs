//! Relaunch flag persistence.
//!
//! The "reinstall the service after relaunch" flag is written to two
//! independent backends: a keyed preference namespace and a sentinel file.
//! A preference write is not guaranteed to reach disk before the updater
//! terminates the process, so the sentinel file backs it up.
//!
//! - Reads OR the backends together: either one reporting `true` wins.
//! - Writes and deletes are best effort per backend. A failure is logged and
//!   the remaining backends are still attempted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::FlagConfig;
use crate::error::UpdateError;

/// Literal content of the sentinel file.
pub const SENTINEL_CONTENT: &str = "1";

/// A single persistence backend for a boolean flag.
pub trait FlagBackend: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &'static str;

    /// Persist `true`.
    fn set(&self) -> Result<(), UpdateError>;

    /// Read the persisted value.
    fn is_set(&self) -> Result<bool, UpdateError>;

    /// Persist `false` / remove the marker. Clearing an unset flag succeeds.
    fn clear(&self) -> Result<(), UpdateError>;
}

// =============================================================================
// Preference store
// =============================================================================

/// Keyed boolean preferences for one namespace, stored as a JSON document.
///
/// Unknown keys and non-boolean values already in the document are kept
/// untouched on write.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    key: String,
}

impl PreferenceStore {
    /// Create a store for `key` in the document at `path`.
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Preference key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read a boolean; missing keys and non-boolean values read as `false`.
    pub fn get_bool(&self, key: &str) -> Result<bool, UpdateError> {
        let document = self.load()?;
        Ok(document.get(key).and_then(Value::as_bool).unwrap_or(false))
    }

    /// Write a boolean, keeping every other key in the namespace.
    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), UpdateError> {
        let mut document = match self.load() {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Preference document {:?} is unreadable ({}), rewriting it",
                    self.path, e
                );
                Map::new()
            }
        };
        document.insert(key.to_string(), Value::Bool(value));

        let content = serde_json::to_vec_pretty(&Value::Object(document))?;
        write_atomically(&self.path, &content).map_err(|e| {
            UpdateError::PreferenceError(format!("cannot write {:?}: {}", self.path, e))
        })
    }

    fn load(&self) -> Result<Map<String, Value>, UpdateError> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(UpdateError::PreferenceError(format!(
                    "cannot read {:?}: {}",
                    self.path, e
                )))
            }
        };
        match serde_json::from_slice::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(UpdateError::PreferenceError(format!(
                "{:?} is not a JSON object",
                self.path
            ))),
        }
    }
}

impl FlagBackend for PreferenceStore {
    fn name(&self) -> &'static str {
        "preferences"
    }

    fn set(&self) -> Result<(), UpdateError> {
        self.set_bool(&self.key, true)
    }

    fn is_set(&self) -> Result<bool, UpdateError> {
        self.get_bool(&self.key)
    }

    fn clear(&self) -> Result<(), UpdateError> {
        self.set_bool(&self.key, false)
    }
}

// =============================================================================
// Sentinel file
// =============================================================================

/// A fixed-path file whose existence marks the flag as set.
#[derive(Debug, Clone)]
pub struct SentinelFile {
    path: PathBuf,
}

impl SentinelFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagBackend for SentinelFile {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn set(&self) -> Result<(), UpdateError> {
        write_atomically(&self.path, SENTINEL_CONTENT.as_bytes())?;
        Ok(())
    }

    fn is_set(&self) -> Result<bool, UpdateError> {
        Ok(self.path.exists())
    }

    fn clear(&self) -> Result<(), UpdateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `content` to a sibling temp file and rename it over `path`.
fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        "{}.{}.tmp",
        file_name,
        std::process::id()
    ));

    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// Combined flag
// =============================================================================

/// The durable "reinstall the service after relaunch" flag.
pub struct RelaunchFlag {
    backends: Vec<Box<dyn FlagBackend>>,
}

impl RelaunchFlag {
    /// Combine arbitrary backends.
    pub fn new(backends: Vec<Box<dyn FlagBackend>>) -> Self {
        Self { backends }
    }

    /// Preference store plus sentinel file, as configured.
    pub fn from_config(config: &FlagConfig) -> Self {
        Self::new(vec![
            Box::new(PreferenceStore::new(
                config.preference_file(),
                config.key.clone(),
            )),
            Box::new(SentinelFile::new(config.sentinel_path.clone())),
        ])
    }

    /// Persist `true` in every backend, tolerating individual failures.
    pub fn set(&self) {
        for backend in &self.backends {
            match backend.set() {
                Ok(()) => debug!("Relaunch flag set in {}", backend.name()),
                Err(e) => warn!("Failed to set relaunch flag in {}: {}", backend.name(), e),
            }
        }
        info!("Post-update service reinstall scheduled for next launch");
    }

    /// True if any backend reports the flag set.
    pub fn is_set(&self) -> bool {
        self.backends.iter().any(|backend| match backend.is_set() {
            Ok(set) => set,
            Err(e) => {
                debug!("Cannot read relaunch flag from {}: {}", backend.name(), e);
                false
            }
        })
    }

    /// Clear every backend, tolerating individual failures.
    pub fn clear(&self) {
        for backend in &self.backends {
            if let Err(e) = backend.clear() {
                warn!("Failed to clear relaunch flag in {}: {}", backend.name(), e);
            }
        }
    }

    /// Per-backend view, for diagnostics. Unreadable backends show as `None`.
    pub fn status(&self) -> Vec<(&'static str, Option<bool>)> {
        self.backends
            .iter()
            .map(|backend| (backend.name(), backend.is_set().ok()))
            .collect()
    }
}
