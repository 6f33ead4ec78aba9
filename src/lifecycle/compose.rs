//! Process-supervision CLI driver (`docker compose`).
//!
//! # Responsibilities
//! - Find a working compose CLI among the configured invocations
//! - Find the compose project descriptor
//! - Restart a service and tail its logs from the project directory
//!
//! # Design Decisions
//! - Detection runs on every call; the console acts rarely and binaries can
//!   appear or vanish between actions
//! - Children are killed when their deadline elapses

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::settings::{ConsoleSettings, TimeoutSettings};
use crate::lifecycle::types::{LifecycleError, LifecycleResult, Supervisor};
use crate::resilience::{first_success, first_success_async, with_deadline};

/// A compose CLI invocation prefix, e.g. `docker compose`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    program: String,
    args: Vec<String>,
}

impl CliCommand {
    /// Build from `[program, args...]`; `None` for an empty list.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn render(&self, extra: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(extra.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for CliCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&[]))
    }
}

/// Compose CLI supervisor.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    commands: Vec<CliCommand>,
    descriptors: Vec<PathBuf>,
    timeouts: TimeoutSettings,
}

impl ComposeCli {
    pub fn new(commands: Vec<CliCommand>, descriptors: Vec<PathBuf>, timeouts: TimeoutSettings) -> Self {
        Self {
            commands,
            descriptors,
            timeouts,
        }
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Self {
        let commands = settings
            .compose_binaries
            .iter()
            .filter_map(|parts| CliCommand::from_parts(parts))
            .collect();
        Self::new(commands, settings.compose_files.clone(), settings.timeouts.clone())
    }

    /// First invocation whose `--version` exits successfully.
    pub async fn detect(&self) -> LifecycleResult<CliCommand> {
        let timeout = self.timeouts.version_probe();
        let found = first_success_async(self.commands.iter().cloned(), |cli| async move {
            run(&cli, &["--version"], None, timeout).await
        })
        .await;

        match found {
            Ok((cli, version)) => {
                tracing::debug!(cli = %cli, version = %version.trim(), "Found supervision CLI");
                Ok(cli)
            }
            Err(exhausted) => {
                tracing::warn!(attempts = %exhausted, "No supervision CLI available");
                Err(LifecycleError::CliNotFound {
                    tried: exhausted.candidates().map(ToString::to_string).collect(),
                })
            }
        }
    }

    /// First descriptor candidate that exists as a file.
    pub fn descriptor(&self) -> LifecycleResult<PathBuf> {
        first_success(self.descriptors.iter().cloned(), |path| {
            if path.is_file() {
                Ok(())
            } else {
                Err(())
            }
        })
        .map(|(path, ())| path)
        .map_err(|exhausted| LifecycleError::DescriptorNotFound {
            tried: exhausted.candidates().cloned().collect(),
        })
    }

    /// Resolve the CLI and the directory holding the descriptor.
    async fn project(&self) -> LifecycleResult<(CliCommand, PathBuf)> {
        let cli = self.detect().await?;
        let descriptor = self.descriptor()?;
        let dir = descriptor
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok((cli, dir))
    }
}

#[async_trait]
impl Supervisor for ComposeCli {
    async fn restart(&self, service: &str) -> LifecycleResult<String> {
        let (cli, dir) = self.project().await?;
        tracing::info!(cli = %cli, service = %service, dir = %dir.display(), "Restarting service via CLI");
        run(&cli, &["restart", service], Some(&dir), self.timeouts.compose()).await
    }

    async fn tail_logs(&self, service: &str, lines: u32) -> LifecycleResult<String> {
        let (cli, dir) = self.project().await?;
        let tail = lines.to_string();
        run(&cli, &["logs", "--tail", &tail, service], Some(&dir), self.timeouts.compose_logs()).await
    }
}

/// Run `cli extra...` and return its stdout. Non-zero exit yields
/// `CommandFailed` with stderr (or stdout when stderr is empty).
async fn run(cli: &CliCommand, extra: &[&str], dir: Option<&Path>, timeout: Duration) -> LifecycleResult<String> {
    let rendered = cli.render(extra);

    let mut command = Command::new(&cli.program);
    command
        .args(&cli.args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    let output = with_deadline(
        timeout,
        async {
            command.output().await.map_err(|source| LifecycleError::Io {
                operation: rendered.clone(),
                source,
            })
        },
        || LifecycleError::Timeout {
            operation: rendered.clone(),
            secs: timeout.as_secs(),
        },
    )
    .await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stderr = if stderr.is_empty() {
        match output.status.code() {
            Some(code) if stdout.trim().is_empty() => format!("exit status {}", code),
            _ => stdout.trim().to_string(),
        }
    } else {
        stderr
    };
    Err(LifecycleError::CommandFailed { command: rendered, stderr })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("{}\n", body)).unwrap();
        path
    }

    // Run through `sh` so the script never needs exec permission
    fn cli(path: &Path) -> CliCommand {
        CliCommand::from_parts(&["sh".to_string(), path.display().to_string()]).unwrap()
    }

    #[test]
    fn test_command_rendering() {
        let cmd = CliCommand::from_parts(&["docker".into(), "compose".into()]).unwrap();
        assert_eq!(cmd.to_string(), "docker compose");
        assert_eq!(cmd.render(&["restart", "relay"]), "docker compose restart relay");
        assert!(CliCommand::from_parts(&[]).is_none());
    }

    #[tokio::test]
    async fn test_detect_skips_missing_binaries() {
        let dir = TempDir::new().unwrap();
        let good = script(dir.path(), "compose-ok", "echo 'Docker Compose version v2'");
        let missing = CliCommand::from_parts(&[dir.path().join("not-installed").display().to_string()]).unwrap();

        let compose = ComposeCli::new(vec![missing, cli(&good)], vec![], TimeoutSettings::default());
        assert_eq!(compose.detect().await.unwrap(), cli(&good));
    }

    #[tokio::test]
    async fn test_detect_rejects_failing_version_check() {
        let dir = TempDir::new().unwrap();
        let broken = script(dir.path(), "compose-broken", "exit 1");

        let compose = ComposeCli::new(vec![cli(&broken)], vec![], TimeoutSettings::default());
        let err = compose.detect().await.unwrap_err();
        assert!(matches!(err, LifecycleError::CliNotFound { ref tried } if tried.len() == 1));
    }

    #[tokio::test]
    async fn test_restart_runs_in_descriptor_dir() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(project.join("docker-compose.yml"), "services: {}\n").unwrap();
        let fake = script(dir.path(), "compose", "echo \"$1 $2 in $(pwd)\"");

        let compose = ComposeCli::new(
            vec![cli(&fake)],
            vec![dir.path().join("missing.yml"), project.join("docker-compose.yml")],
            TimeoutSettings::default(),
        );
        let out = compose.restart("relay").await.unwrap();
        assert!(out.starts_with("restart relay in "), "got {out}");
        assert!(out.trim_end().ends_with("project"));
    }

    #[tokio::test]
    async fn test_missing_descriptor() {
        let dir = TempDir::new().unwrap();
        let fake = script(dir.path(), "compose", "exit 0");
        let compose = ComposeCli::new(vec![cli(&fake)], vec![dir.path().join("docker-compose.yml")], TimeoutSettings::default());

        let err = compose.restart("relay").await.unwrap_err();
        assert!(matches!(err, LifecycleError::DescriptorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_failure_captures_stderr() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "").unwrap();
        let fake = script(
            dir.path(),
            "compose",
            "if [ \"$1\" = \"--version\" ]; then exit 0; fi\necho 'no such service: relay' >&2\nexit 1",
        );
        let compose = ComposeCli::new(vec![cli(&fake)], vec![dir.path().join("docker-compose.yml")], TimeoutSettings::default());

        let err = compose.restart("relay").await.unwrap_err();
        assert!(err.to_string().contains("no such service: relay"), "got {err}");
    }

    #[tokio::test]
    async fn test_restart_timeout() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "").unwrap();
        let fake = script(dir.path(), "compose", "if [ \"$1\" = \"--version\" ]; then exit 0; fi\nsleep 10");
        let timeouts = TimeoutSettings { compose_secs: 1, ..TimeoutSettings::default() };
        let compose = ComposeCli::new(vec![cli(&fake)], vec![dir.path().join("docker-compose.yml")], timeouts);

        let err = compose.restart("relay").await.unwrap_err();
        assert!(matches!(err, LifecycleError::Timeout { secs: 1, .. }), "got {err:?}");
    }
}
