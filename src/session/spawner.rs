//! REPL process spawner.
//!
//! Launches the REPL executable with piped stdin/stdout and
//! `kill_on_drop(true)` so the process is cleaned up automatically if the
//! service aborts. No output is read at spawn time: the REPL protocol has
//! no ready banner, and the first response is read lazily when the first
//! command executes.

use std::path::PathBuf;

use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::{AppError, Result};

/// Configuration for launching the REPL process.
///
/// Supplied by the configuration layer; the session module never reads
/// global configuration itself.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// REPL executable name (e.g. `lake`).
    pub program: String,
    /// Arguments passed to the executable (e.g. `exe repl`).
    pub args: Vec<String>,
    /// Working directory the process starts in; `None` inherits the
    /// service's own working directory.
    pub workdir: Option<PathBuf>,
}

/// Freshly spawned REPL process with its pipes detached and its PID
/// captured for later signal delivery.
#[derive(Debug)]
pub struct SpawnedRepl {
    /// Child process handle — kept alive so `kill_on_drop` works.
    pub child: Child,
    /// The REPL's stdin for writing framed commands.
    pub stdin: ChildStdin,
    /// The REPL's stdout for line-by-line response scanning.
    pub stdout: ChildStdout,
    /// OS process id, if the process is still running at capture time.
    pub pid: Option<u32>,
}

/// Spawn the REPL process described by `config`.
///
/// stderr is left inherited so REPL diagnostics flow into the service's
/// own stderr rather than an unread pipe.
///
/// # Errors
///
/// Returns `AppError::Startup` if the OS spawn fails or either pipe cannot
/// be captured.
pub fn spawn_repl(config: &SpawnConfig) -> Result<SpawnedRepl> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args);

    if let Some(ref dir) = config.workdir {
        cmd.current_dir(dir);
    }

    cmd.stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Startup(format!("failed to spawn repl process: {err}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Startup("failed to capture repl stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Startup("failed to capture repl stdout".into()))?;

    let pid = child.id();

    Ok(SpawnedRepl {
        child,
        stdin,
        stdout,
        pid,
    })
}
