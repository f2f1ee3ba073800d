//! Unit tests for the bounded stdout line codec.
//!
//! Covers:
//! - single newline-terminated line decodes without the delimiter
//! - batched lines decode as separate items
//! - partial delivery is buffered until the newline arrives
//! - lines beyond the 1 MiB cap return `AppError::Read("output line too long…")`
//! - EOF with a trailing unterminated line is drained by `decode_eof`

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use repl_relay::errors::AppError;
use repl_relay::session::codec::{ReplLineCodec, MAX_LINE_BYTES};

// ── Single line decodes correctly ────────────────────────────────────────────

/// A complete response line is decoded and returned without the trailing
/// newline.
#[test]
fn single_line_decodes_without_newline() {
    let mut codec = ReplLineCodec::new();
    let mut buf = BytesMut::from("{\"result\":\"2\"}\n");

    let decoded = codec.decode(&mut buf).expect("valid line must decode");

    assert_eq!(decoded, Some("{\"result\":\"2\"}".to_owned()));
}

// ── Batched lines decode separately ──────────────────────────────────────────

/// Two lines delivered in one buffer are yielded by successive `decode`
/// calls.
#[test]
fn batched_lines_decode_separately() {
    let mut codec = ReplLineCodec::new();
    let mut buf = BytesMut::from("{\"a\":\n\"x}y\"}\n");

    let first = codec.decode(&mut buf).expect("first decode");
    assert_eq!(first, Some("{\"a\":".to_owned()));

    let second = codec.decode(&mut buf).expect("second decode");
    assert_eq!(second, Some("\"x}y\"}".to_owned()));

    let third = codec.decode(&mut buf).expect("empty buffer decode");
    assert!(third.is_none(), "no further lines must be yielded");
}

// ── Partial delivery is buffered ─────────────────────────────────────────────

/// A line fragment without its newline is held back until the delimiter
/// arrives.
#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = ReplLineCodec::new();

    let mut buf = BytesMut::from("{\"result\":");
    let pending = codec.decode(&mut buf).expect("fragment decode");
    assert!(pending.is_none(), "fragment must not be yielded early");

    buf.extend_from_slice(b"\"2\"}\n");
    let complete = codec.decode(&mut buf).expect("completed decode");
    assert_eq!(complete, Some("{\"result\":\"2\"}".to_owned()));
}

// ── Oversized lines are rejected ─────────────────────────────────────────────

/// A line exceeding `MAX_LINE_BYTES` yields a read error instead of an
/// unbounded allocation.
#[test]
fn oversized_line_returns_read_error() {
    let mut codec = ReplLineCodec::new();
    let mut buf = BytesMut::from(vec![b'x'; MAX_LINE_BYTES + 1].as_slice());

    let err = codec
        .decode(&mut buf)
        .expect_err("oversized line must be rejected");

    match err {
        AppError::Read(msg) => {
            assert!(
                msg.contains("output line too long"),
                "unexpected message: {msg}"
            );
        }
        other => panic!("expected AppError::Read, got: {other:?}"),
    }
}

// ── EOF drains the trailing line ─────────────────────────────────────────────

/// `decode_eof` yields a final line that was never newline-terminated.
#[test]
fn decode_eof_drains_unterminated_line() {
    let mut codec = ReplLineCodec::new();
    let mut buf = BytesMut::from("{\"tail\":1}");

    let pending = codec.decode(&mut buf).expect("no complete line yet");
    assert!(pending.is_none());

    let last = codec.decode_eof(&mut buf).expect("eof drain");
    assert_eq!(last, Some("{\"tail\":1}".to_owned()));
}
