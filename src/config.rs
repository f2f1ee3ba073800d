//! Service configuration resolution and validation.
//!
//! All settings are environment-sourced (`PORT`, `REPL_PATH`,
//! `REPL_TIMEOUT_SECONDS`, `REPL_CMD`, `REPL_ARGS`) with CLI flags taking
//! precedence. The resolved [`ServiceConfig`] is handed to the session and
//! HTTP layers as explicit parameters; no module below this one reads the
//! environment directly.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::{AppError, Result};

/// Default HTTP listening port when `PORT` is absent or invalid.
const DEFAULT_PORT: u16 = 8080;

/// Default REPL launch command when `REPL_CMD` is absent.
const DEFAULT_REPL_CMD: &str = "lake";

/// Default REPL launch arguments when `REPL_ARGS` is absent.
const DEFAULT_REPL_ARGS: &[&str] = &["exe", "repl"];

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// HTTP listening port.
    pub port: u16,
    /// REPL executable name.
    pub program: String,
    /// Arguments passed to the REPL executable.
    pub args: Vec<String>,
    /// Working-directory override for the REPL process.
    pub workdir: Option<PathBuf>,
    /// Default per-command timeout in seconds; `0` means no timeout.
    pub timeout_seconds: u64,
}

impl ServiceConfig {
    /// Resolve configuration from the process environment.
    ///
    /// Invalid `PORT` or `REPL_TIMEOUT_SECONDS` values fall back to their
    /// defaults with a warning rather than failing startup, matching the
    /// service's lenient boot contract.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `REPL_PATH` is set but does not name
    /// an existing directory.
    pub fn from_env() -> Result<Self> {
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().unwrap_or_else(|err| {
                warn!(%raw, %err, "invalid PORT value, using default");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let timeout_seconds = match env::var("REPL_TIMEOUT_SECONDS") {
            Ok(raw) => raw.parse::<u64>().unwrap_or_else(|err| {
                warn!(%raw, %err, "invalid REPL_TIMEOUT_SECONDS value, disabling timeout");
                0
            }),
            Err(_) => 0,
        };

        let program = env::var("REPL_CMD").unwrap_or_else(|_| DEFAULT_REPL_CMD.to_owned());

        let args = match env::var("REPL_ARGS") {
            Ok(raw) => raw.split_whitespace().map(str::to_owned).collect(),
            Err(_) => DEFAULT_REPL_ARGS.iter().map(|&a| a.to_owned()).collect(),
        };

        let workdir = match env::var("REPL_PATH") {
            Ok(raw) if !raw.is_empty() => Some(PathBuf::from(raw)),
            _ => None,
        };

        let mut config = Self {
            port,
            program,
            args,
            workdir,
            timeout_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Default per-command timeout; `None` when timeouts are disabled.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    fn validate(&mut self) -> Result<()> {
        if self.program.is_empty() {
            return Err(AppError::Config("REPL_CMD must not be empty".into()));
        }

        if let Some(dir) = self.workdir.take() {
            let canonical = dir
                .canonicalize()
                .map_err(|err| AppError::Config(format!("REPL_PATH invalid: {err}")))?;
            self.workdir = Some(canonical);
        }

        Ok(())
    }
}
