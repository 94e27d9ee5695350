// src/exec.rs
//! Running the external diagnostic tools.
//!
//! Commands are plain strings split on whitespace, never handed to a shell.
//! Collectors talk to a [`CommandRunner`] so they can be driven by canned
//! output instead of a real Gaudi host.

use crate::error::{CollectError, Result};
#[cfg(any(test, feature = "testing"))]
use std::{cell::RefCell, collections::HashMap, io};
use tokio::process::Command;
use tracing::{debug, trace};

/// Something that can run a command line and hand back its stdout.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Runs `command` to completion. Returns trimmed stdout on a zero exit
    /// status, otherwise an error naming the command and its stderr.
    async fn run(&self, command: &str) -> Result<String>;
}

/// Runs commands as child processes of this one. No timeout is applied, a
/// hung tool stalls the pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, command: &str) -> Result<String> {
        let mut argv = command.split_whitespace();
        let program = argv.next().ok_or(CollectError::EmptyCommand)?;

        debug!("running {command}");
        let output = Command::new(program)
            .args(argv)
            .output()
            .await
            .map_err(|source| CollectError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(CollectError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        trace!("{command} returned:\n{stdout}");
        Ok(stdout)
    }
}

/// Serves pre-recorded output keyed by the exact command line and remembers
/// which commands were asked for. Unknown commands behave like a missing
/// binary.
#[cfg(any(test, feature = "testing"))]
#[derive(Debug, Default)]
pub struct CannedRunner {
    outputs: HashMap<String, std::result::Result<String, String>>,
    calls: RefCell<Vec<String>>,
}

#[cfg(any(test, feature = "testing"))]
impl CannedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers stdout for a command that exits successfully.
    pub fn with_output(mut self, command: &str, stdout: &str) -> Self {
        self.outputs
            .insert(command.to_string(), Ok(stdout.trim().to_string()));
        self
    }

    /// Registers a command that exits non-zero with the given stderr.
    pub fn with_failure(mut self, command: &str, stderr: &str) -> Self {
        self.outputs
            .insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    /// Commands run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

#[cfg(any(test, feature = "testing"))]
impl CommandRunner for CannedRunner {
    async fn run(&self, command: &str) -> Result<String> {
        if command.split_whitespace().next().is_none() {
            return Err(CollectError::EmptyCommand);
        }
        self.calls.borrow_mut().push(command.to_string());

        match self.outputs.get(command) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(CollectError::Failed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: stderr.clone(),
            }),
            None => Err(CollectError::Spawn {
                command: command.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no canned output"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let out = SystemRunner.run("echo  gaudi   hl-225").await.unwrap();
        assert_eq!(out, "gaudi hl-225");
    }

    #[tokio::test]
    async fn test_system_runner_reports_non_zero_exit() {
        let err = SystemRunner.run("false").await.unwrap_err();
        assert!(matches!(err, CollectError::Failed { ref command, .. } if command == "false"));
    }

    #[tokio::test]
    async fn test_system_runner_reports_missing_binary() {
        let err = SystemRunner
            .run("definitely-not-a-real-tool-4d00 -q")
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_empty_command() {
        assert!(matches!(
            SystemRunner.run("   ").await,
            Err(CollectError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_canned_runner() {
        let runner = CannedRunner::new()
            .with_output("nproc", "224\n")
            .with_failure("lscpu", "permission denied");

        assert_eq!(runner.run("nproc").await.unwrap(), "224");
        let err = runner.run("lscpu").await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
        assert!(runner.run("hl-smi").await.is_err());
        assert_eq!(runner.calls(), vec!["nproc", "lscpu", "hl-smi"]);
    }
}
