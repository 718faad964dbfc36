//! Connect-bool round trip through typed shims on both ends.

use std::sync::{Arc, Mutex};

use cairn::{Client, Creds, MethodGroup, ServerSession};

use crate::proto::chat_proto::chat;
use crate::stream_pair;

#[tokio::test]
async fn connect_round_trips_with_kernel_credentials() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();

    let seen: Arc<Mutex<Option<(Creds, String)>>> = Arc::default();
    let seen_in = seen.clone();
    let server = tokio::spawn(async move {
        let session = ServerSession::from_std(b, |_| {}).unwrap();
        let mut methods = chat::Methods::default();
        methods.connect = Some(Box::new(move |creds, name| {
            *seen_in.lock().unwrap() = Some((creds, name));
            true
        }));
        let mut groups: [&mut dyn MethodGroup; 1] = [&mut methods];
        session.dispatch_one(&mut groups).await.unwrap();
    });

    // The field values here are bogus; the kernel substitutes the truth.
    let replies: Arc<Mutex<Vec<bool>>> = Arc::default();
    let replies_in = replies.clone();
    let bogus = Creds {
        pid: 1,
        uid: 2,
        gid: 3,
    };
    chat::connect(&client, bogus, "ada".to_string(), move |accepted| {
        replies_in.lock().unwrap().push(accepted);
    })
    .unwrap();
    assert_eq!(client.pending_replies(), 1);

    client.dispatch_one(&mut []).await.unwrap();
    server.await.unwrap();

    let (creds, name) = seen.lock().unwrap().take().unwrap();
    assert_eq!(name, "ada");
    assert_eq!(creds.pid, std::process::id() as i32);
    assert_eq!(creds.uid, unsafe { libc::geteuid() });
    assert_eq!(creds.gid, unsafe { libc::getegid() });

    assert_eq!(
        *replies.lock().unwrap(),
        vec![true],
        "reply callback must run exactly once"
    );
    assert_eq!(client.pending_replies(), 0);
}

#[tokio::test]
async fn void_method_reaches_the_handler_without_a_reply() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();

    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let seen_in = seen.clone();
    let server = tokio::spawn(async move {
        let session = ServerSession::from_std(b, |_| {}).unwrap();
        let mut methods = chat::Methods::default();
        methods.send = Some(Box::new(move |text| {
            seen_in.lock().unwrap().push(text);
        }));
        let mut groups: [&mut dyn MethodGroup; 1] = [&mut methods];
        session.dispatch_one(&mut groups).await.unwrap();
        session.close();
    });

    chat::send(&client, "fire and forget".to_string()).unwrap();
    assert_eq!(client.pending_replies(), 0, "void methods register nothing");
    server.await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["fire and forget".to_string()]);
}
