#![forbid(unsafe_code)]

//! `repl-relay` — exposes a single long-lived interactive REPL subprocess
//! as a synchronous HTTP request/response service.
//!
//! The [`session`] module owns the subprocess lifecycle and the streaming
//! response framer; [`server`] mounts the HTTP surface; [`config`] resolves
//! environment-sourced settings into the explicit parameters the session
//! layer consumes.

pub mod config;
pub mod errors;
pub mod server;
pub mod session;

pub use config::ServiceConfig;
pub use errors::{AppError, Result};
