use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// A single external command: program, arguments and optional working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// First argument, which for engine commands is the subcommand
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
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

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Issue starting `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Issue waiting for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Issue running `{command}`: {}", describe_exit(*code))]
    Exit { command: String, code: Option<i32> },

    #[error("`{command}` did not finish within {} seconds", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Executes invocations on behalf of the pipeline
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion; any non-success outcome is an error.
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError>;
}

/// Runs commands as child processes with stdout and stderr passed straight through
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        let command_line = invocation.to_string();
        info!("EXEC: {}", command_line);

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.current_dir {
            debug!(dir = %dir.display(), "Working directory");
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let waited = match self.timeout {
            Some(limit) => {
                let bounded = tokio::time::timeout(limit, child.wait()).await;
                match bounded {
                    Ok(waited) => waited,
                    Err(_) => {
                        if let Err(e) = child.kill().await {
                            debug!("Failed to kill timed out process: {}", e);
                        }
                        return Err(ProcessError::Timeout {
                            command: command_line,
                            timeout: limit,
                        });
                    }
                }
            }
            None => child.wait().await,
        };

        let status = waited.map_err(|source| ProcessError::Wait {
            command: command_line.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Exit {
                command: command_line,
                code: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("/usr/bin/docker", ["build", "-t", "demo:build_el7", "."]);
        assert_eq!(
            invocation.to_string(),
            "/usr/bin/docker build -t demo:build_el7 ."
        );
    }

    #[test]
    fn test_invocation_display_quotes_whitespace() {
        let invocation = Invocation::new("echo", ["hello world", ""]);
        assert_eq!(invocation.to_string(), "echo \"hello world\" \"\"");
    }

    #[test]
    fn test_invocation_subcommand() {
        assert_eq!(
            Invocation::new("docker", ["stop", "x"]).subcommand(),
            Some("stop")
        );
        assert_eq!(Invocation::new("docker", Vec::<String>::new()).subcommand(), None);
    }

    #[test]
    fn test_exit_error_message() {
        let err = ProcessError::Exit {
            command: "docker stop x".to_string(),
            code: Some(125),
        };
        assert_eq!(
            err.to_string(),
            "Issue running `docker stop x`: exit status 125"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_success() {
        let runner = SystemRunner::new();
        let result = runner.run(&Invocation::new("true", Vec::<String>::new())).await;
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_nonzero_exit() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("sh", ["-c", "exit 3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Exit { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&Invocation::new("/nonexistent/rpmbox-engine", ["build"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_timeout() {
        let runner = SystemRunner::new().with_timeout(Some(Duration::from_millis(100)));
        let err = runner
            .run(&Invocation::new("sleep", ["5"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_uses_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new();
        runner
            .run(&Invocation::new("sh", ["-c", "touch marker"]).in_dir(dir.path()))
            .await
            .unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
