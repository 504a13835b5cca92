//! Structured external command execution.
//!
//! Every state-changing operation certkeeper performs (issuing with
//! certbot, toggling the firewall rule, running aftercare) is a child
//! process. Commands are described as a program plus an argument vector
//! and never assembled by string concatenation, so domain names and paths
//! reach the child exactly as configured.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace, warn};

/// Default bound on a single external invocation (10 minutes)
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// How much of a failing command's stderr is kept in the error
const MAX_STDERR_BYTES: usize = 2048;

/// A program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Start describing an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run `command` through `sh -c`
    ///
    /// Only for operator-supplied command lines that are shell syntax by
    /// contract (aftercare hooks).
    pub fn shell(command: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(command)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " {:?}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured output of a command that exited successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (or waited on)
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The program ran and reported failure
    #[error("'{program}' failed with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Runs [`CommandSpec`]s.
///
/// Implementations must report a non-zero exit as [`CommandError::Failed`];
/// `Ok` always means the command succeeded.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Executes commands as real child processes with a bounded runtime.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl SystemExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn execute(&self, command: &CommandSpec) -> Result<CommandOutput, CommandError> {
        debug!(command = %command, "Running external command");

        let spawn_error = |source| CommandError::Spawn {
            program: command.program.clone(),
            source,
        };

        // The child is killed if the timeout drops the wait future
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(spawn_error)?,
            Err(_) => {
                warn!(
                    command = %command,
                    timeout_secs = self.timeout.as_secs(),
                    "External command timed out, killing it"
                );
                return Err(CommandError::Timeout {
                    program: command.program.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit status {}", code),
                None => "termination by signal".to_string(),
            };
            return Err(CommandError::Failed {
                program: command.program.clone(),
                status,
                stderr: truncate(stderr.trim()),
            });
        }

        trace!(command = %command, stdout_len = stdout.len(), "External command succeeded");
        Ok(CommandOutput { stdout, stderr })
    }
}

fn truncate(s: &str) -> String {
    if s.len() <= MAX_STDERR_BYTES {
        return s.to_string();
    }
    let mut end = MAX_STDERR_BYTES;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
