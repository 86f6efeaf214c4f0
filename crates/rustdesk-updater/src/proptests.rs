//! Property-based tests for rustdesk-updater.
//!
//! # Properties Tested
//!
//! - Relaunch guard: the flag is written for exactly the installation states
//!   with the app and daemon installed and the service running
//! - OR semantics: the flag reads set iff at least one store holds it
//! - Clear is idempotent from any starting combination
//! - Command output is returned verbatim

#![cfg(test)]

use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use crate::coordinator::{CoordinatorState, PostUpdateCoordinator};
use crate::flag::{FlagBackend, PreferenceStore, RelaunchFlag, SentinelFile};
use crate::installation::InstallationFacts;
use crate::shell::{CommandRunner, ShellRunner};

// =============================================================================
// Generators
// =============================================================================

fn arb_facts() -> impl Strategy<Value = InstallationFacts> {
    (any::<bool>(), any::<bool>(), any::<bool>())
        .prop_map(|(installed, daemon, stopped)| InstallationFacts::new(installed, daemon, stopped))
}

/// Printable ASCII without characters the shell would interpret inside
/// single quotes.
fn arb_output_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;_=+-]{0,40}(\n[a-zA-Z0-9 ]{0,20}){0,3}\n?"
}

fn stores(dir: &TempDir) -> (PreferenceStore, SentinelFile) {
    (
        PreferenceStore::new(dir.path().join("prefs.json"), "ShouldRunPostUpdateScript"),
        SentinelFile::new(dir.path().join(".rustdesk_update")),
    )
}

fn combined(prefs: &PreferenceStore, sentinel: &SentinelFile) -> RelaunchFlag {
    RelaunchFlag::new(vec![Box::new(prefs.clone()), Box::new(sentinel.clone())])
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_will_relaunch_guard(facts in arb_facts()) {
        let dir = TempDir::new().unwrap();
        let (prefs, sentinel) = stores(&dir);
        let coordinator = PostUpdateCoordinator::new(
            combined(&prefs, &sentinel),
            Arc::new(facts),
            Arc::new(ShellRunner::new("/bin/sh")),
            "true".to_string(),
        );

        let state = coordinator.on_will_relaunch();
        let expected = facts.installed && facts.daemon_installed && !facts.service_stopped;

        prop_assert_eq!(state == CoordinatorState::PendingReinstall, expected);
        prop_assert_eq!(prefs.is_set().unwrap(), expected);
        prop_assert_eq!(sentinel.path().exists(), expected);
        // No write at all when the guard fails.
        prop_assert_eq!(prefs.path().exists(), expected);
    }

    #[test]
    fn prop_flag_is_or_of_stores(pref_set in any::<bool>(), sentinel_set in any::<bool>()) {
        let dir = TempDir::new().unwrap();
        let (prefs, sentinel) = stores(&dir);
        if pref_set {
            prefs.set().unwrap();
        }
        if sentinel_set {
            sentinel.set().unwrap();
        }

        prop_assert_eq!(combined(&prefs, &sentinel).is_set(), pref_set || sentinel_set);
    }

    #[test]
    fn prop_clear_always_unsets(pref_set in any::<bool>(), sentinel_set in any::<bool>(), repeats in 1usize..4) {
        let dir = TempDir::new().unwrap();
        let (prefs, sentinel) = stores(&dir);
        if pref_set {
            prefs.set().unwrap();
        }
        if sentinel_set {
            sentinel.set().unwrap();
        }

        let flag = combined(&prefs, &sentinel);
        for _ in 0..repeats {
            flag.clear();
        }
        prop_assert!(!flag.is_set());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_output_returned_verbatim(text in arb_output_text()) {
        let output = ShellRunner::new("/bin/sh")
            .run(&format!("printf '%s' '{}'", text))
            .unwrap();
        prop_assert_eq!(output, text);
    }
}
