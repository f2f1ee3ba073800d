//! Streaming response framer.
//!
//! The REPL emits responses on stdout with no length prefix or explicit
//! end-of-message marker; the only framing signal is the JSON structure
//! itself. The framer scans each output line character by character,
//! tracking brace depth while ignoring braces that appear inside string
//! literals or behind escapes, and reports completion once every brace
//! opened since the first line has been closed.
//!
//! Scan state persists across line boundaries within one response: a string
//! literal or a pending escape may span lines as delivered by the REPL,
//! though in practice each line is a complete JSON line.

use crate::{AppError, Result};

/// Per-response scan state for the stdout stream.
///
/// Created fresh for each command execution and discarded once the
/// response is returned.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    /// Net count of unmatched `{` seen outside strings since the response
    /// began.
    depth: i32,
    /// Whether the scanner is currently inside a string literal.
    in_string: bool,
    /// Whether the previous character was an unconsumed backslash.
    escape_pending: bool,
    /// Whether the first non-empty line has been seen.
    started: bool,
}

impl ResponseFramer {
    /// Create a fresh framer for one command's response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one physical output line.
    ///
    /// Empty lines before the first non-empty line are discarded without
    /// touching `response`. Consumed lines are appended to `response`
    /// verbatim, concatenated without separators, so the accumulated text
    /// of a multi-line response is the joined JSON document.
    ///
    /// Returns `Ok(true)` once the response is structurally complete: after
    /// a consumed line, depth has returned to `<= 0` (`<=`, not `==`,
    /// tolerating a closing brace that ends an already-balanced line).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Protocol` if the first non-empty line does not
    /// begin with `{`. No recovery is attempted.
    pub fn feed_line(&mut self, line: &str, response: &mut String) -> Result<bool> {
        if !self.started {
            if line.is_empty() {
                return Ok(false);
            }
            if !line.starts_with('{') {
                return Err(AppError::Protocol(format!(
                    "expecting leading curly bracket, got: {line}"
                )));
            }
            self.started = true;
        }

        for ch in line.chars() {
            if self.escape_pending {
                // The escaped character is consumed with no structural effect.
                self.escape_pending = false;
            } else if ch == '\\' {
                self.escape_pending = true;
            } else if ch == '"' {
                self.in_string = !self.in_string;
            } else if !self.in_string {
                match ch {
                    '{' => self.depth += 1,
                    '}' => self.depth -= 1,
                    _ => {}
                }
            }
        }

        response.push_str(line);
        Ok(self.depth <= 0)
    }
}
