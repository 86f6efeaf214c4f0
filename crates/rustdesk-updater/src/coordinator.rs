//! Post-update reinstall coordinator.
//!
//! Hands the "reinstall the background service" step across the relaunch
//! boundary:
//!
//! 1. When the external updater is about to relaunch the app, the coordinator
//!    checks the installation state and, if the daemon is installed and
//!    running, sets the relaunch flag.
//! 2. On the next bare launch it finds the flag, runs the reinstall command
//!    in the background, and clears the flag straight away.
//!
//! The reinstall is attempted at most once per flagged update. A failed
//! attempt is logged and never retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use crate::flag::RelaunchFlag;
use crate::installation::{InstallationState, SystemInstallation};
use crate::shell::{CommandRunner, ShellRunner};

/// How the current process was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// No arguments beyond the program name, as after an updater relaunch.
    Bare,
    /// Started with explicit arguments, e.g. a user-invoked subcommand.
    Invoked { args: Vec<String> },
}

impl LaunchMode {
    /// Classify a full argument vector; the first item is the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().skip(1).map(Into::into).collect();
        if args.is_empty() {
            Self::Bare
        } else {
            Self::Invoked { args }
        }
    }

    /// Classify the arguments of the running process.
    pub fn from_env() -> Self {
        Self::from_args(
            std::env::args_os().map(|arg| arg.to_string_lossy().into_owned()),
        )
    }

    pub fn is_bare(&self) -> bool {
        matches!(self, Self::Bare)
    }
}

/// Coordinator state, as persisted by the relaunch flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No reinstall pending
    Idle,
    /// A reinstall will run on the next bare launch
    PendingReinstall,
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::Idle
    }
}

/// A reinstall command running in the background.
///
/// Dropping this does not cancel the command.
#[derive(Debug)]
pub struct ReinstallDispatch {
    command: String,
    finished: Arc<AtomicBool>,
    result: oneshot::Receiver<Result<String, UpdateError>>,
}

impl ReinstallDispatch {
    /// The dispatched command text.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the command has completed.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Wait for the command and return its output.
    pub async fn wait(self) -> Result<String, UpdateError> {
        self.result.await?
    }

    /// Blocking variant of [`wait`](Self::wait) for hosts without an async
    /// runtime. Panics if called from within an async context.
    pub fn wait_blocking(self) -> Result<String, UpdateError> {
        self.result.blocking_recv()?
    }
}

/// Drives the Idle / PendingReinstall state machine.
pub struct PostUpdateCoordinator {
    flag: RelaunchFlag,
    installation: Arc<dyn InstallationState>,
    runner: Arc<dyn CommandRunner>,
    reinstall_command: String,
}

impl PostUpdateCoordinator {
    /// Create a coordinator from its collaborators.
    pub fn new(
        flag: RelaunchFlag,
        installation: Arc<dyn InstallationState>,
        runner: Arc<dyn CommandRunner>,
        reinstall_command: String,
    ) -> Self {
        Self {
            flag,
            installation,
            runner,
            reinstall_command,
        }
    }

    /// Create a coordinator backed by the system probe and shell.
    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(
            RelaunchFlag::from_config(&config.flag),
            Arc::new(SystemInstallation::from_config(config)),
            Arc::new(ShellRunner::from_config(&config.reinstall)),
            config.reinstall_command(),
        )
    }

    /// Current state, read from the relaunch flag.
    pub fn state(&self) -> CoordinatorState {
        if self.flag.is_set() {
            CoordinatorState::PendingReinstall
        } else {
            CoordinatorState::Idle
        }
    }

    pub fn flag(&self) -> &RelaunchFlag {
        &self.flag
    }

    pub fn installation(&self) -> &dyn InstallationState {
        self.installation.as_ref()
    }

    pub fn reinstall_command(&self) -> &str {
        &self.reinstall_command
    }

    /// Handle the updater's "will relaunch application" callback.
    ///
    /// Sets the relaunch flag only if the app and its daemon are installed
    /// and the service has not been stopped.
    pub fn on_will_relaunch(&self) -> CoordinatorState {
        if self.installation.needs_service_reinstall() {
            self.flag.set();
            CoordinatorState::PendingReinstall
        } else {
            debug!("Service reinstall not needed after this update");
            CoordinatorState::Idle
        }
    }

    /// Run the pending reinstall, if any, for this process start.
    ///
    /// Does nothing unless `launch` is bare: an explicitly invoked process
    /// leaves the flag for a later bare relaunch. When the flag is set the
    /// reinstall command is started in the background and the flag is
    /// cleared without waiting for it.
    ///
    /// Inside a Tokio runtime the command runs on its blocking pool,
    /// otherwise on a dedicated thread. If no worker can be started the
    /// flag is left set for the next launch.
    pub fn check_reinstall_service(&self, launch: &LaunchMode) -> Option<ReinstallDispatch> {
        if !launch.is_bare() {
            debug!("Launched with arguments, leaving relaunch flag untouched");
            return None;
        }
        if !self.flag.is_set() {
            return None;
        }

        info!("Relaunched after update, reinstalling service");
        let command = self.reinstall_command.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let (tx, result) = oneshot::channel();

        let runner = Arc::clone(&self.runner);
        let task_command = command.clone();
        let task_finished = Arc::clone(&finished);
        let job = move || {
            let outcome = runner.run(&task_command);
            match &outcome {
                Ok(_) => info!("Service reinstalled"),
                Err(e) => error!("Reinstall service failed: {}", e),
            }
            task_finished.store(true, Ordering::Release);
            let _ = tx.send(outcome);
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => {
                debug!("No Tokio runtime, running reinstall on a dedicated thread");
                if let Err(e) = std::thread::Builder::new()
                    .name("reinstall-service".to_string())
                    .spawn(job)
                {
                    warn!("Failed to start reinstall worker: {}", e);
                    return None;
                }
            }
        }

        self.flag.clear();
        Some(ReinstallDispatch {
            command,
            finished,
            result,
        })
    }
}
