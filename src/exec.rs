//! External command execution behind a trait so assembly and diagnostics
//! can be tested without the real tools installed.

use crate::error::{NarratorError, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs an external program to completion.
///
/// Object-safe, Send + Sync so one executor can be shared across jobs.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` and return its stdout.
    ///
    /// A missing program is [`NarratorError::ToolNotFound`]; a non-zero exit
    /// is [`NarratorError::CommandFailed`] carrying the program's stderr.
    async fn execute(&self, program: &str, args: &[String]) -> Result<String>;
}

/// Production executor backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, program: &str, args: &[String]) -> Result<String> {
        tracing::debug!(program, ?args, "Running command");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NarratorError::ToolNotFound {
                        tool: program.to_string(),
                    }
                } else {
                    NarratorError::Other(format!("Failed to execute {program}: {e}"))
                }
            })?;

        if !output.status.success() {
            return Err(NarratorError::CommandFailed {
                tool: program.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
