//! Shell command watcher
//!
//! Runs `sh -c <command>`; exit status 0 is a valid result.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;

use super::Watcher;
use crate::domain::Verdict;
use crate::error::{BoxError, Result, TickwatchError};

/// Output kept in the result description
const MAX_DESCRIPTION_BYTES: usize = 512;

/// Configuration for a command watcher
#[derive(Debug, Clone, Default)]
pub struct CommandWatcherConfig {
    /// The command to execute
    pub command: String,
    /// Environment variables to set
    pub env: Vec<(String, String)>,
    pub group: Option<String>,
    pub interval: Option<Duration>,
    pub timeout: Option<Duration>,
}

impl CommandWatcherConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Watcher that executes a shell command
#[derive(Debug, Clone)]
pub struct CommandWatcher {
    name: String,
    config: CommandWatcherConfig,
}

impl CommandWatcher {
    pub fn new(name: impl Into<String>, config: CommandWatcherConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// A command watcher with defaults
    pub fn simple(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, CommandWatcherConfig::new(command))
    }

    pub fn command(&self) -> &str {
        &self.config.command
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.len() <= MAX_DESCRIPTION_BYTES {
        return text.to_string();
    }
    let mut end = MAX_DESCRIPTION_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[async_trait]
impl Watcher for CommandWatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn group(&self) -> Option<&str> {
        self.config.group.as_deref()
    }

    fn interval(&self) -> Option<Duration> {
        self.config.interval
    }

    fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    fn validate(&self) -> Result<()> {
        if self.config.command.trim().is_empty() {
            return Err(TickwatchError::Configuration("command is empty".to_string()));
        }
        Ok(())
    }

    async fn execute(&self) -> std::result::Result<Verdict, BoxError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.config.command);
        for (key, value) in &self.config.env {
            cmd.env(key, value);
        }
        // an abandoned execution must not leave the process behind
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd.spawn()?.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let payload = json!({ "exit_code": output.status.code() });

        if output.status.success() {
            Ok(Verdict::valid(truncate(&stdout)).with_payload(payload))
        } else {
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            Ok(Verdict::invalid(format!(
                "exit code {:?}: {}",
                output.status.code(),
                truncate(&detail)
            ))
            .with_payload(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_command_is_valid() {
        let watcher = CommandWatcher::simple("echo", "echo healthy");
        let verdict = watcher.execute().await.unwrap();
        assert!(verdict.is_valid);
        assert_eq!(verdict.description, "healthy");
        assert_eq!(verdict.payload.unwrap()["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_failing_command_is_invalid() {
        let watcher = CommandWatcher::simple("fail", "echo 'disk full' >&2; exit 3");
        let verdict = watcher.execute().await.unwrap();
        assert!(!verdict.is_valid);
        assert_eq!(verdict.description, "exit code Some(3): disk full");
    }

    #[tokio::test]
    async fn test_env_passed_through() {
        let watcher = CommandWatcher::new(
            "env",
            CommandWatcherConfig::new("echo $TICKWATCH_PROBE").env("TICKWATCH_PROBE", "on"),
        );
        let verdict = watcher.execute().await.unwrap();
        assert_eq!(verdict.description, "on");
    }

    #[test]
    fn test_empty_command_fails_validation() {
        let watcher = CommandWatcher::simple("blank", "  ");
        assert!(watcher.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let watcher = CommandWatcher::new(
            "grouped",
            CommandWatcherConfig::new("true")
                .group("host")
                .interval(Duration::from_secs(15))
                .timeout(Duration::from_secs(2)),
        );
        assert_eq!(watcher.group(), Some("host"));
        assert_eq!(watcher.interval(), Some(Duration::from_secs(15)));
        assert_eq!(watcher.timeout(), Some(Duration::from_secs(2)));
        assert_eq!(watcher.command(), "true");
    }

    #[test]
    fn test_truncate_long_output() {
        let long = "x".repeat(MAX_DESCRIPTION_BYTES + 10);
        let out = truncate(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), MAX_DESCRIPTION_BYTES + 3);
    }
}
