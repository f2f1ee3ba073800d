//! REPL subprocess session: spawn, framed stdout scanning, serialized
//! execution, and teardown.
//!
//! The [`manager::ReplSession`] owns the process pipes and the execution
//! lock; [`framer::ResponseFramer`] decides where one JSON response ends on
//! the undelimited output stream; [`codec::ReplLineCodec`] provides bounded
//! line framing over stdout; [`spawner`] launches the process.

pub mod codec;
pub mod framer;
pub mod manager;
pub mod spawner;

pub use manager::{ExecOutcome, ReplSession};
pub use spawner::SpawnConfig;
