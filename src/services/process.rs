//! External command execution.
//!
//! Every invocation runs to completion (or timeout) and yields a
//! `CommandResult`; commands are strictly sequential, one per await point.
//! The `CommandRunner` trait is the seam the workflow tests substitute.

use crate::error::GitError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Per-command time budget; an elapsed timeout is a failed result, not an
/// error.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Observable output of one external invocation. Consumed immediately,
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    pub fn timeout(budget: Duration) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: format!("command timed out after {}s", budget.as_secs()),
            timed_out: true,
        }
    }
}

/// Seam for running external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandResult, GitError>;
}

/// Runs commands via tokio's process API with a fixed timeout
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandResult, GitError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Never let git fall back to an interactive credential prompt
        if program == "git" {
            cmd.env("GIT_TERMINAL_PROMPT", "0");
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| GitError::Spawn {
                program: program.to_string(),
                source: e,
            })?,
            Err(_) => {
                tracing::warn!(program, "command timed out");
                return Ok(CommandResult::timeout(self.timeout));
            }
        };

        let result = CommandResult {
            succeeded: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        };
        tracing::debug!(program, succeeded = result.succeeded, "command finished");
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner for workflow tests: records every invocation and
    //! replays canned results matched by command-line substring.

    use super::*;
    use std::sync::Mutex;

    pub(crate) struct ScriptedRunner {
        calls: Mutex<Vec<String>>,
        responses: Mutex<Vec<(String, CommandResult)>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(Vec::new()),
            }
        }

        /// Queue a result for the first future invocation whose command
        /// line contains `pattern`. Each queued result is used once.
        pub(crate) fn respond(self, pattern: &str, result: CommandResult) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((pattern.to_string(), result));
            self
        }

        /// Recorded command lines, in invocation order.
        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(
            &self,
            program: &str,
            args: &[&str],
            _cwd: &Path,
        ) -> Result<CommandResult, GitError> {
            let line = format!("{} {}", program, args.join(" "));
            self.calls.lock().unwrap().push(line.clone());

            let mut responses = self.responses.lock().unwrap();
            if let Some(idx) = responses.iter().position(|(pat, _)| line.contains(pat)) {
                return Ok(responses.remove(idx).1);
            }
            Ok(CommandResult::success(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_result_is_failed_and_flagged() {
        let result = CommandResult::timeout(Duration::from_secs(300));
        assert!(!result.succeeded);
        assert!(result.timed_out);
        assert!(result.stderr.contains("300"));
    }

    #[test]
    fn system_runner_captures_output() {
        let runner = SystemRunner::new();
        let result = tokio_test::block_on(async {
            runner
                .run("git", &["--version"], Path::new("."))
                .await
                .unwrap()
        });
        assert!(result.succeeded);
        assert!(result.stdout.contains("git version"));
    }

    #[tokio::test]
    async fn system_runner_enforces_timeout() {
        let runner = SystemRunner::with_timeout(Duration::from_millis(100));
        let result = runner
            .run("sleep", &["5"], Path::new("."))
            .await
            .unwrap();
        assert!(result.timed_out);
        assert!(!result.succeeded);
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run("definitely-not-a-real-binary", &[], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Spawn { .. }));
    }
}
