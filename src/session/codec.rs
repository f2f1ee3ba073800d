//! Bounded line codec for the REPL's stdout stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a fixed maximum line length
//! so an unterminated or runaway output line from a misbehaving REPL cannot
//! exhaust memory. Decode-only: commands are written to the REPL's stdin as
//! raw bytes (payload plus a blank-line terminator), so no encoder is
//! needed on this codec.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum stdout line length accepted by the codec: 1 MiB.
///
/// Lines exceeding this limit cause [`ReplLineCodec::decode`] to return
/// [`AppError::Read`] with `"output line too long"` rather than allocating
/// unbounded memory for a single line.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Line codec for the REPL's stdout stream.
///
/// Delegates framing to [`LinesCodec`] with a fixed [`MAX_LINE_BYTES`]
/// limit. Each `\n`-terminated UTF-8 string is one physical output line;
/// the trailing newline (and any `\r`) is stripped.
#[derive(Debug)]
pub struct ReplLineCodec(LinesCodec);

impl ReplLineCodec {
    /// Create a new `ReplLineCodec` with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for ReplLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ReplLineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` when `src` holds no complete line yet (buffering).
    /// Returns `Err(AppError::Read("output line too long: …"))` when the
    /// line exceeds [`MAX_LINE_BYTES`].
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    /// Decode the final line when the stream reaches EOF.
    ///
    /// Delegates to [`LinesCodec::decode_eof`], applying the same error
    /// mapping.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

/// Map a [`LinesCodecError`] to an [`AppError`].
fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Read(format!("output line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Read(io_err.to_string()),
    }
}
