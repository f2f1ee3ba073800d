//! REPL session manager: serialized, timeout-bounded, byte-exact
//! request/response exchange with one subprocess.
//!
//! The REPL processes exactly one command at a time, so a single
//! [`tokio::sync::Mutex`] wraps the entire write-then-read exchange; every
//! caller queues on that lock and no two commands' pipe traffic can
//! interleave. A background monitor task owns the [`Child`] handle, awaits
//! its exit, and publishes the observed status on a watch channel so
//! liveness checks never touch the pipes or the execution lock.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::session::codec::ReplLineCodec;
use crate::session::framer::ResponseFramer;
use crate::session::spawner::{spawn_repl, SpawnConfig};
use crate::{AppError, Result};

/// Exit status of the REPL process as observed by the monitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitObservation {
    /// Process exited; the code is `None` when it was terminated by a
    /// signal.
    Exited(Option<i32>),
    /// `wait` itself failed; the process handle is gone and its final
    /// state is unknown.
    WaitFailed,
}

impl ExitObservation {
    /// Whether the observation represents a clean zero-status exit.
    #[must_use]
    pub fn is_clean(self) -> bool {
        matches!(self, Self::Exited(Some(0)))
    }
}

/// Result of one command exchange.
///
/// `complete` distinguishes a structurally finished response from one
/// truncated by the caller's timeout; a truncated response is returned
/// as-is and the caller must treat it as unreliable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Accumulated response text, physical lines joined without separators.
    pub response: String,
    /// `true` when structural depth returned to zero; `false` when the
    /// deadline elapsed first.
    pub complete: bool,
}

/// How long `shutdown` waits for a natural exit after closing stdin
/// before escalating to an interrupt signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Pipes shared under the execution lock.
///
/// `stdin` becomes `None` once [`ReplSession::shutdown`] has closed it;
/// any later `execute` fails with a write error rather than panicking.
struct SessionPipes {
    stdin: Option<ChildStdin>,
    stdout: FramedRead<ChildStdout, ReplLineCodec>,
}

/// One managed REPL subprocess: its pipes, execution lock, and observed
/// exit status.
///
/// Created once at service start and destroyed at service shutdown. The
/// pipes, the lock, and the per-command scan state live and die together,
/// so they can never disagree about where the stream stands.
pub struct ReplSession {
    pipes: Mutex<SessionPipes>,
    pid: Option<u32>,
    exit_rx: watch::Receiver<Option<ExitObservation>>,
}

impl ReplSession {
    /// Spawn the REPL process and start its exit monitor.
    ///
    /// Must be called from within a tokio runtime (the monitor task is
    /// spawned immediately). No output is read here; the first response is
    /// read lazily by the first [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Startup` if the process cannot be spawned or its
    /// pipes attached.
    pub fn start(config: &SpawnConfig) -> Result<Self> {
        let spawned = spawn_repl(config)?;
        let pid = spawned.pid;
        info!(program = %config.program, ?pid, "repl process started");

        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(monitor_exit(spawned.child, exit_tx));

        Ok(Self {
            pipes: Mutex::new(SessionPipes {
                stdin: Some(spawned.stdin),
                stdout: FramedRead::new(spawned.stdout, ReplLineCodec::new()),
            }),
            pid,
            exit_rx,
        })
    }

    /// Execute one command against the REPL.
    ///
    /// Acquires exclusive access to the session (blocking behind any
    /// in-flight exchange), writes `payload` followed by a blank line (the
    /// REPL's command-complete marker), then drives the response framer
    /// over stdout lines until the response is structurally complete or
    /// the deadline elapses.
    ///
    /// The deadline starts when the command has been written, and bounds
    /// each line read itself via [`tokio::time::timeout_at`] — a REPL that
    /// goes silent mid-response cannot hold the caller past the deadline.
    /// On expiry the bytes accumulated so far are returned with
    /// `complete: false`; a timeout is not an error.
    ///
    /// `timeout` of `None` or zero means no deadline.
    ///
    /// # Errors
    ///
    /// - `AppError::Write` — stdin is closed or the write fails.
    /// - `AppError::Read` — stdout errors, an output line exceeds the codec
    ///   limit, or the stream ends before the response completes.
    /// - `AppError::Protocol` — the first meaningful line does not begin
    ///   with `{`.
    pub async fn execute(&self, payload: &[u8], timeout: Option<Duration>) -> Result<ExecOutcome> {
        let mut pipes = self.pipes.lock().await;

        // Command plus the blank line that submits it.
        let mut framed = Vec::with_capacity(payload.len() + 2);
        framed.extend_from_slice(payload);
        framed.extend_from_slice(b"\n\n");

        let stdin = pipes
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::Write("repl stdin already closed".into()))?;
        stdin
            .write_all(&framed)
            .await
            .map_err(|err| AppError::Write(format!("failed to write to repl: {err}")))?;
        stdin
            .flush()
            .await
            .map_err(|err| AppError::Write(format!("failed to flush repl stdin: {err}")))?;

        let deadline = timeout
            .filter(|t| !t.is_zero())
            .map(|t| Instant::now() + t);

        let mut framer = ResponseFramer::new();
        let mut response = String::new();

        loop {
            let item = match deadline {
                Some(at) => match tokio::time::timeout_at(at, pipes.stdout.next()).await {
                    Ok(item) => item,
                    Err(_elapsed) => {
                        warn!(
                            accumulated = response.len(),
                            "command deadline elapsed, returning partial response"
                        );
                        return Ok(ExecOutcome {
                            response,
                            complete: false,
                        });
                    }
                },
                None => pipes.stdout.next().await,
            };

            match item {
                Some(Ok(line)) => {
                    if framer.feed_line(&line, &mut response)? {
                        debug!(bytes = response.len(), "response complete");
                        return Ok(ExecOutcome {
                            response,
                            complete: true,
                        });
                    }
                }
                Some(Err(err)) => return Err(err),
                None => {
                    return Err(AppError::Read(
                        "repl stdout closed before response completed".into(),
                    ));
                }
            }
        }
    }

    /// Whether the REPL process is still running.
    ///
    /// A point read of the exit status published by the monitor task; does
    /// not take the execution lock and never touches the pipes, so health
    /// probes stay responsive while a command is in flight.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Tear the session down: close stdin, give the process a grace
    /// period to exit on the EOF, interrupt it if it is still running,
    /// and wait for its exit.
    ///
    /// Every step is attempted even when an earlier one fails; the first
    /// failure is returned after cleanup has gone as far as it can.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Shutdown` if stdin cannot be closed, the
    /// interrupt signal cannot be delivered, the exit cannot be observed,
    /// or the process exits with a non-zero status.
    pub async fn shutdown(&self) -> Result<()> {
        let mut first_error: Option<AppError> = None;

        // Close stdin to signal end-of-input. Dropping the handle closes
        // the pipe even if the explicit shutdown call fails.
        {
            let mut pipes = self.pipes.lock().await;
            if let Some(mut stdin) = pipes.stdin.take() {
                if let Err(err) = stdin.shutdown().await {
                    warn!(%err, "failed to close repl stdin");
                    note_failure(
                        &mut first_error,
                        AppError::Shutdown(format!("failed to close repl stdin: {err}")),
                    );
                }
            }
        }

        // Grace period for a natural exit on EOF before escalating.
        let mut exit_rx = self.exit_rx.clone();
        let exited_on_eof =
            tokio::time::timeout(SHUTDOWN_GRACE, exit_rx.wait_for(Option::is_some))
                .await
                .is_ok_and(|observed| observed.is_ok());

        if !exited_on_eof {
            warn!("repl process did not exit on stdin close, sending interrupt");
            if let Err(err) = self.send_interrupt() {
                warn!(%err, "failed to interrupt repl process");
                note_failure(&mut first_error, err);
            }
        }

        // Wait for the monitor task to observe the exit.
        let mut exit_rx = self.exit_rx.clone();
        match exit_rx.wait_for(Option::is_some).await {
            Ok(observed) => {
                if let Some(observation) = *observed {
                    info!(?observation, "repl process exit observed");
                    if !observation.is_clean() {
                        note_failure(
                            &mut first_error,
                            AppError::Shutdown(match observation {
                                ExitObservation::Exited(Some(code)) => {
                                    format!("repl process exited with status {code}")
                                }
                                ExitObservation::Exited(None) => {
                                    "repl process terminated by signal".into()
                                }
                                ExitObservation::WaitFailed => {
                                    "failed to wait for repl process exit".into()
                                }
                            }),
                        );
                    }
                }
            }
            Err(_closed) => {
                note_failure(
                    &mut first_error,
                    AppError::Shutdown(
                        "exit monitor ended before reporting repl process exit".into(),
                    ),
                );
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[cfg(unix)]
    fn send_interrupt(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = self
            .pid
            .ok_or_else(|| AppError::Shutdown("repl process id unavailable".into()))?;
        let raw = i32::try_from(pid)
            .map_err(|_| AppError::Shutdown(format!("repl process id out of range: {pid}")))?;

        kill(Pid::from_raw(raw), Signal::SIGINT)
            .map_err(|err| AppError::Shutdown(format!("failed to send SIGINT to repl: {err}")))
    }

    #[cfg(not(unix))]
    fn send_interrupt(&self) -> Result<()> {
        // No interrupt delivery off unix; stdin EOF plus kill_on_drop
        // cover teardown.
        Ok(())
    }
}

/// Record the first failure encountered during teardown.
fn note_failure(slot: &mut Option<AppError>, err: AppError) {
    if slot.is_none() {
        *slot = Some(err);
    }
}

/// Exit monitor: owns the child handle, awaits its exit, and publishes the
/// observed status.
///
/// Exactly one observation is ever published. If every receiver is gone
/// the send result is ignored; the process has still been reaped.
async fn monitor_exit(mut child: Child, exit_tx: watch::Sender<Option<ExitObservation>>) {
    let observation = match child.wait().await {
        Ok(status) => {
            info!(code = ?status.code(), "repl process exited");
            ExitObservation::Exited(status.code())
        }
        Err(err) => {
            warn!(%err, "error waiting for repl process");
            ExitObservation::WaitFailed
        }
    };

    let _ = exit_tx.send(Some(observation));
}
