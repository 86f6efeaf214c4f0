//! End-to-end tests for the update → relaunch → reinstall hand-off.
//!
//! Each "process" is modelled by a fresh coordinator built from the same
//! configuration, so the only state carried across is what the relaunch
//! flag persisted on disk.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use rustdesk_updater::{
    CommandRunner, CoordinatorState, FlagBackend, InstallationFacts, LaunchMode,
    LifecycleListener, LogNotificationBackend, PostUpdateCoordinator, PreferenceStore,
    RelaunchFlag, SentinelFile, UpdateError, UpdateListener, UpdaterConfig, UpdaterEvent,
};
use tempfile::TempDir;

/// Records the command and holds it until the test releases it.
struct HeldRunner {
    commands: Mutex<Vec<String>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl CommandRunner for HeldRunner {
    fn run(&self, command: &str) -> Result<String, UpdateError> {
        self.commands.lock().unwrap().push(command.to_string());
        let _ = self.release.lock().unwrap().recv();
        Ok(String::new())
    }
}

fn test_config(dir: &TempDir) -> UpdaterConfig {
    let mut config = UpdaterConfig::default();
    config.flag.prefs_dir = dir.path().join("Preferences");
    config.flag.sentinel_path = dir.path().join(".rustdesk_update");
    config.reinstall.app_binary = "/Applications/RustDesk.app/Contents/MacOS/RustDesk".into();
    config
}

fn process(
    config: &UpdaterConfig,
    facts: InstallationFacts,
    runner: Arc<HeldRunner>,
) -> Arc<PostUpdateCoordinator> {
    Arc::new(PostUpdateCoordinator::new(
        RelaunchFlag::from_config(&config.flag),
        Arc::new(facts),
        runner,
        config.reinstall_command(),
    ))
}

fn held_runner() -> (Arc<HeldRunner>, mpsc::Sender<()>) {
    let (tx, rx) = mpsc::channel();
    let runner = Arc::new(HeldRunner {
        commands: Mutex::new(Vec::new()),
        release: Mutex::new(rx),
    });
    (runner, tx)
}

#[tokio::test]
async fn update_relaunch_reinstalls_service_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let prefs = PreferenceStore::new(config.flag.preference_file(), config.flag.key.clone());
    let sentinel = SentinelFile::new(config.flag.sentinel_path.clone());
    let (runner, release) = held_runner();

    // Process 1: the updater is about to relaunch into the new version.
    // With the service stopped on purpose nothing is recorded.
    let stopped = process(&config, InstallationFacts::new(true, true, true), runner.clone());
    LifecycleListener::new(Box::new(LogNotificationBackend), stopped.clone())
        .on_event(&UpdaterEvent::WillRelaunch);
    assert_eq!(stopped.state(), CoordinatorState::Idle);
    assert!(!prefs.path().exists());
    assert!(!sentinel.path().exists());

    // With the service running both stores are written.
    let running = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    LifecycleListener::new(Box::new(LogNotificationBackend), running.clone())
        .on_event(&UpdaterEvent::WillRelaunch);
    assert!(prefs.is_set().unwrap());
    assert!(sentinel.is_set().unwrap());

    // Process 2: relaunched by the updater with no arguments.
    let after = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    assert_eq!(after.state(), CoordinatorState::PendingReinstall);
    let dispatch = after
        .check_reinstall_service(&LaunchMode::from_args(["RustDesk"]))
        .expect("reinstall dispatched on bare relaunch");

    assert_eq!(
        dispatch.command(),
        "sleep 2; /Applications/RustDesk.app/Contents/MacOS/RustDesk --reinstall-service"
    );
    // Cleared while the command is still held.
    assert!(!dispatch.is_finished());
    assert!(!prefs.is_set().unwrap());
    assert!(!sentinel.path().exists());

    release.send(()).unwrap();
    dispatch.wait().await.unwrap();

    // Process 3: another bare launch finds nothing to do.
    let later = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    assert!(later.check_reinstall_service(&LaunchMode::Bare).is_none());
    assert_eq!(runner.commands.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn explicit_invocation_defers_reinstall_to_bare_launch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let (runner, release) = held_runner();

    let first = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    first.on_will_relaunch();

    // User runs a subcommand before the app is relaunched bare.
    let invoked = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    let launch = LaunchMode::from_args(["RustDesk", "--connect", "123456789"]);
    assert!(invoked.check_reinstall_service(&launch).is_none());
    assert_eq!(invoked.state(), CoordinatorState::PendingReinstall);
    assert!(runner.commands.lock().unwrap().is_empty());

    let bare = process(&config, InstallationFacts::new(true, true, false), runner.clone());
    let dispatch = bare.check_reinstall_service(&LaunchMode::Bare).unwrap();
    release.send(()).unwrap();
    dispatch.wait().await.unwrap();
    assert_eq!(runner.commands.lock().unwrap().len(), 1);
}

#[test]
fn config_file_round_trip_drives_flag_location() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let path = dir.path().join("updater.toml");
    config.save_to_file(&path).unwrap();

    let loaded = UpdaterConfig::load_or_default(Some(&path)).unwrap();
    RelaunchFlag::from_config(&loaded.flag).set();

    assert!(dir.path().join(".rustdesk_update").exists());
    assert!(dir
        .path()
        .join("Preferences")
        .join("com.carriez.rustdesk.json")
        .exists());
}
