//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// REPL process could not be spawned or its pipes attached.
    Startup(String),
    /// REPL input stream is closed or broken.
    Write(String),
    /// REPL output stream is broken or ended mid-response.
    Read(String),
    /// REPL output violates the expected response framing.
    Protocol(String),
    /// Stream-close, signal-delivery, or process-wait failure during teardown.
    Shutdown(String),
    /// File-system or I/O operation failure outside the REPL pipes.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Startup(msg) => write!(f, "startup: {msg}"),
            Self::Write(msg) => write!(f, "write: {msg}"),
            Self::Read(msg) => write!(f, "read: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Shutdown(msg) => write!(f, "shutdown: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

// Satisfies the `Decoder::Error: From<io::Error>` bound for the line codec;
// a raw I/O error surfacing through the framed stdout stream is a read fault.
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Read(err.to_string())
    }
}
