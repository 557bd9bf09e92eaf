//! provider::command
//!
//! Provider that runs a local executable once per prompt.
//!
//! # Protocol
//!
//! - The prompt is written to the child's stdin, which is then closed
//! - The model name is exported as `DUSK_MODEL`, and any `{model}` in the
//!   configured arguments is replaced with it
//! - Stdout (minus trailing newlines) is the output
//! - A non-zero exit is a failure carrying stderr
//!
//! The child is killed if the timeout elapses.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::traits::{ModelProvider, ProviderError, ProviderRequest, ProviderResponse};

/// Environment variable carrying the requested model.
pub const MODEL_ENV: &str = "DUSK_MODEL";

/// Runs `program args...` for every submission.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn build(&self, model: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|a| a.replace("{model}", model)))
            .env(MODEL_ENV, model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ModelProvider for CommandProvider {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn submit(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut child = self.build(&request.model).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProviderError::Unavailable(format!("'{}' not found", self.program))
            } else {
                ProviderError::Unavailable(format!("failed to start '{}': {}", self.program, e))
            }
        })?;

        // Feed stdin concurrently so a chatty child cannot deadlock on a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let prompt = request.prompt.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    if e.kind() != std::io::ErrorKind::BrokenPipe {
                        tracing::debug!(error = %e, "failed to write prompt to provider");
                    }
                }
            });
        }

        let started = std::time::Instant::now();
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
            .map_err(|e| ProviderError::Failed(e.to_string()))?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                stderr
            };
            return Err(ProviderError::Failed(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!(
            program = %self.program,
            model = %request.model,
            duration_ms,
            "provider command finished"
        );
        Ok(ProviderResponse {
            output: stdout.trim_end_matches(&['\n', '\r'][..]).to_string(),
            duration_ms: Some(duration_ms),
        })
    }
}
