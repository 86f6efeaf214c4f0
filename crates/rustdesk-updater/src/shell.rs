//! Shell command execution.
//!
//! Commands run through a system interpreter (`<shell> -c <command>`) with
//! stdout and stderr joined into one pipe, so the captured text interleaves
//! both streams the way a terminal would show them.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::config::ReinstallConfig;
use crate::error::{CommandFailure, UpdateError};

/// Runs command text to completion and returns its combined output.
pub trait CommandRunner: Send + Sync {
    /// Run `command`, blocking until it exits.
    fn run(&self, command: &str) -> Result<String, UpdateError>;
}

/// [`CommandRunner`] backed by a system shell interpreter.
///
/// `run` blocks the calling thread until the subprocess exits. There is no
/// timeout and no cancellation; callers that must stay responsive run it on a
/// blocking pool.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    /// Create a runner using the given interpreter.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Create a runner using the interpreter from the reinstall config.
    pub fn from_config(config: &ReinstallConfig) -> Self {
        Self::new(config.shell.clone())
    }

    /// The interpreter path.
    pub fn shell(&self) -> &Path {
        &self.shell
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<String, UpdateError> {
        let failed = |reason: CommandFailure| UpdateError::CommandFailed {
            command: command.to_string(),
            reason,
        };

        let (mut reader, writer) = std::io::pipe().map_err(|e| failed(CommandFailure::Io(e)))?;
        let stderr = writer
            .try_clone()
            .map_err(|e| failed(CommandFailure::Io(e)))?;

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr);

        debug!("Running {:?} -c {:?}", self.shell, command);
        let mut child = cmd.spawn().map_err(|e| failed(CommandFailure::Io(e)))?;
        // The write ends live in `cmd`; close them so the read below sees EOF.
        drop(cmd);

        let mut data = Vec::new();
        let read = reader.read_to_end(&mut data);
        let status = child.wait().map_err(|e| failed(CommandFailure::Io(e)))?;
        read.map_err(|e| failed(CommandFailure::Io(e)))?;

        let output = String::from_utf8(data).map_err(|e| failed(CommandFailure::Decode(e)))?;

        match status.code() {
            Some(0) => Ok(output),
            Some(code) => {
                debug!("Command exited with status {}", code);
                Err(failed(CommandFailure::Exit(code)))
            }
            None => Err(failed(CommandFailure::Signal)),
        }
    }
}
