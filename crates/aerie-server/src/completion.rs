//! Completion engine: one prompt in, one trimmed completion out.
//!
//! The engine shells out to a local text-generation script and treats it
//! as a black box. The timeout is a hard ceiling; a wedged script must
//! not hold a request slot open indefinitely.

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;

/// Strip quote characters from user input before it is embedded in the
/// prompt template.
pub fn sanitize_input(input: &str) -> String {
    input.chars().filter(|c| *c != '"' && *c != '\'').collect()
}

/// Build the fixed persona prompt around sanitized user input.
pub fn build_prompt(input: &str) -> String {
    format!(
        "You are EAGLE, an AI assistant. User: {} EAGLE:",
        sanitize_input(input)
    )
}

/// Runs the configured script for each completion request.
pub struct CompletionEngine {
    interpreter: String,
    script: PathBuf,
    timeout: Duration,
}

impl CompletionEngine {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            config.script_path.clone(),
            config.timeout,
        )
    }

    /// Produce a completion for `input`.
    pub async fn complete(&self, input: &str) -> Result<String, RelayError> {
        let prompt = build_prompt(input);
        debug!(len = prompt.len(), "running completion script");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.interpreter)
                .arg(&self.script)
                .arg(&prompt)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| RelayError::Timeout)??;

        if !output.stderr.is_empty() {
            warn!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "completion script stderr"
            );
        }

        if !output.status.success() {
            return Err(RelayError::ScriptFailed(output.status));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(RelayError::EmptyCompletion);
        }
        Ok(text)
    }
}
