//! Session teardown when the peer goes away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cairn::{Client, Creds, IpcError, MethodGroup, ServerSession};

use crate::proto::chat_proto::chat;
use crate::stream_pair;

#[tokio::test]
async fn peer_crash_drops_pending_replies() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();

    let ran = Arc::new(AtomicBool::new(false));
    let ran_in = ran.clone();
    chat::connect(&client, Creds::current(), "ada".to_string(), move |_| {
        ran_in.store(true, Ordering::SeqCst);
    })
    .unwrap();
    assert_eq!(client.pending_replies(), 1);

    // The peer "crashes" before answering.
    drop(b);

    match client.dispatch_one(&mut []).await {
        Err(IpcError::Disconnected) => {}
        Err(other) => panic!("expected Disconnected, got {other}"),
        Ok(()) => panic!("expected Disconnected, got a message"),
    }
    assert!(
        !ran.load(Ordering::SeqCst),
        "reply callback must be dropped, not invoked"
    );
    assert_eq!(client.pending_replies(), 0);
}

#[tokio::test]
async fn session_error_handler_fires_once_on_client_crash() {
    let (a, b) = stream_pair();
    let errored = Arc::new(AtomicBool::new(false));
    let flag = errored.clone();
    let session = ServerSession::from_std(a, move |_| {
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();

    drop(b);

    let mut groups: [&mut dyn MethodGroup; 0] = [];
    assert!(session.dispatch_one(&mut groups).await.is_err());
    assert!(errored.load(Ordering::SeqCst));

    // Dispatch never resumes; the handler already ran and is gone.
    errored.store(false, Ordering::SeqCst);
    assert!(session.dispatch_one(&mut groups).await.is_err());
    assert!(!errored.load(Ordering::SeqCst));
}

#[tokio::test]
async fn signal_into_a_dead_session_fails_and_tears_down() {
    let (a, b) = stream_pair();
    let errored = Arc::new(AtomicBool::new(false));
    let flag = errored.clone();
    let session = ServerSession::from_std(a, move |_| {
        flag.store(true, Ordering::SeqCst);
    })
    .unwrap();

    drop(b);

    assert!(chat::text_added(&session, "nobody hears".to_string()).is_err());
    assert!(errored.load(Ordering::SeqCst));
}
