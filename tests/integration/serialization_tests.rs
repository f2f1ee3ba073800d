//! Integration tests for serialized access to one session.
//!
//! The fake REPL echoes each command back as its response, so any
//! interleaving of two in-flight exchanges would hand some caller a
//! response body it never sent. Running many concurrent callers and
//! asserting every caller receives exactly its own payload demonstrates
//! that the session lock serializes the full write-then-read exchange.

use std::sync::Arc;

use futures_util::future::join_all;

use super::test_helpers::echo_session;

/// Concurrent callers never observe each other's pipe traffic.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_are_serialized() {
    let session = Arc::new(echo_session());

    let callers = (0..8).map(|caller| {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            for round in 0..5 {
                let payload = format!(r#"{{"caller":{caller},"round":{round}}}"#);
                let outcome = session
                    .execute(payload.as_bytes(), None)
                    .await
                    .expect("exchange must succeed");

                assert!(outcome.complete);
                assert_eq!(
                    outcome.response, payload,
                    "caller {caller} received a response belonging to another command"
                );
            }
        })
    });

    for result in join_all(callers).await {
        result.expect("caller task must not panic");
    }
}

/// A long exchange blocks a later caller rather than interleaving with it.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_caller_waits_for_first_exchange() {
    // First response arrives only after a delay; the echo of the second
    // command must still come back to the second caller intact.
    let session = Arc::new(super::test_helpers::sh_session(
        r#"IFS= read -r line; IFS= read -r blank; sleep 1; printf '{"slow":true}\n'
           while IFS= read -r line; do [ -n "$line" ] && printf '%s\n' "$line"; done"#,
    ));

    let slow_session = Arc::clone(&session);
    let slow = tokio::spawn(async move {
        slow_session
            .execute(br#"{"cmd":"slow"}"#, None)
            .await
            .expect("slow exchange")
    });

    // Give the first caller time to take the lock and write.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let fast = session
        .execute(br#"{"cmd":"fast"}"#, None)
        .await
        .expect("fast exchange");

    let slow = slow.await.expect("slow task");
    assert_eq!(slow.response, r#"{"slow":true}"#);
    assert_eq!(
        fast.response, r#"{"cmd":"fast"}"#,
        "second caller must receive its own echo, not the first response"
    );
}
