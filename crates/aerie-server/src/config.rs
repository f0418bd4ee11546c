//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the relay can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use aerie_shared::constants::DEFAULT_RELAY_PORT;

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address for the HTTP API server. The port comes from the
    /// `PORT` env var; the relay always binds `0.0.0.0`.
    /// Default: `0.0.0.0:3001`
    pub http_addr: SocketAddr,

    /// Interpreter used to run the completion script.
    /// Env: `COMPLETION_INTERPRETER`
    /// Default: `python3`
    pub interpreter: String,

    /// Path to the text-generation script.
    /// Env: `COMPLETION_SCRIPT`
    /// Default: `./eagle_handler.py`
    pub script_path: PathBuf,

    /// Hard ceiling on one completion run.
    /// Env: `COMPLETION_TIMEOUT_SECS`
    /// Default: 10 seconds
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_RELAY_PORT).into(),
            interpreter: "python3".to_string(),
            script_path: PathBuf::from("./eagle_handler.py"),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.http_addr = ([0, 0, 0, 0], parsed).into();
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Ok(interpreter) = std::env::var("COMPLETION_INTERPRETER") {
            if !interpreter.is_empty() {
                config.interpreter = interpreter;
            }
        }

        if let Ok(path) = std::env::var("COMPLETION_SCRIPT") {
            config.script_path = PathBuf::from(path);
        }

        if let Ok(secs) = std::env::var("COMPLETION_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                config.timeout = Duration::from_secs(parsed);
            } else {
                tracing::warn!(value = %secs, "Invalid COMPLETION_TIMEOUT_SECS, using default");
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3001).into());
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
