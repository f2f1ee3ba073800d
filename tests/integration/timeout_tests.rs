//! Integration tests for the per-command deadline.
//!
//! Covers:
//! - a REPL that emits one line then goes silent: the caller gets back
//!   within a small bound of the timeout with the partial bytes flagged
//!   incomplete
//! - a REPL that emits nothing at all: same bound, empty partial
//! - a prompt response is unaffected by a generous deadline
//! - the session survives a timed-out exchange (the next command still
//!   fails or succeeds on its own terms, not on leftover state)

use std::time::{Duration, Instant};

use super::test_helpers::sh_session;

// ── One line then silence ────────────────────────────────────────────────────

/// The deadline bounds the read itself, not just the gaps between lines.
#[tokio::test]
async fn silent_repl_returns_partial_within_timeout_bound() {
    let session = sh_session(
        r#"IFS= read -r line; IFS= read -r blank; printf '{"partial":\n'; sleep 30"#,
    );

    let started = Instant::now();
    let outcome = session
        .execute(br#"{"cmd":"1+1"}"#, Some(Duration::from_secs(1)))
        .await
        .expect("timeout is not an error");
    let elapsed = started.elapsed();

    assert!(!outcome.complete, "truncated response must be flagged");
    assert_eq!(outcome.response, r#"{"partial":"#);
    assert!(
        elapsed >= Duration::from_millis(900),
        "returned before the deadline: {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(5),
        "deadline did not bound the silent read: {elapsed:?}"
    );
}

// ── No output at all ─────────────────────────────────────────────────────────

/// With no output before the deadline the caller gets an empty partial,
/// still within the bound.
#[tokio::test]
async fn completely_silent_repl_returns_empty_partial() {
    let session = sh_session("sleep 30");

    let started = Instant::now();
    let outcome = session
        .execute(br#"{"cmd":"1+1"}"#, Some(Duration::from_secs(1)))
        .await
        .expect("timeout is not an error");

    assert!(!outcome.complete);
    assert!(outcome.response.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

// ── Prompt response under a deadline ─────────────────────────────────────────

/// A response that arrives before the deadline is returned complete.
#[tokio::test]
async fn prompt_response_is_unaffected_by_deadline() {
    let session = sh_session(
        r#"while IFS= read -r line; do [ -n "$line" ] && printf '{"result":"2"}\n'; done"#,
    );

    let outcome = session
        .execute(br#"{"cmd":"1+1"}"#, Some(Duration::from_secs(10)))
        .await
        .expect("exchange must succeed");

    assert!(outcome.complete);
    assert_eq!(outcome.response, r#"{"result":"2"}"#);
}

// ── Zero timeout means no deadline ───────────────────────────────────────────

/// A zero timeout disables the deadline entirely rather than expiring
/// immediately.
#[tokio::test]
async fn zero_timeout_disables_the_deadline() {
    let session = sh_session(
        r#"IFS= read -r line; IFS= read -r blank; sleep 1; printf '{"late":true}\n'"#,
    );

    let outcome = session
        .execute(br#"{"cmd":"wait"}"#, Some(Duration::ZERO))
        .await
        .expect("exchange must succeed");

    assert!(outcome.complete, "zero timeout must wait for completion");
    assert_eq!(outcome.response, r#"{"late":true}"#);
}
