//! Signal fan-out and silent drops.

use std::sync::{Arc, Mutex};

use cairn::{Client, Decode, Encode, ServerSession, SignalGroup, Transport};

use crate::proto::chat_proto::chat;
use crate::stream_pair;

#[tokio::test]
async fn signal_carries_zero_cookie_on_the_wire() {
    let (a, b) = stream_pair();
    let session = ServerSession::from_std(a, |_| {}).unwrap();
    let peer = Transport::from_std(b).unwrap();

    chat::text_added(&session, "hello".to_string()).unwrap();

    let mut message = peer.receive().await.unwrap();
    assert_eq!(message.header().cookie(), 0);
    assert_eq!(message.header().interface_id(), chat::ID);
    assert_eq!(
        message.header().ordinal(),
        chat::Element::text_added as u16
    );
    assert_eq!(String::decode(&mut message.parser()).unwrap(), "hello");
}

#[tokio::test]
async fn typed_dispatch_skips_unhandled_signals() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();
    let session = ServerSession::from_std(b, |_| {}).unwrap();

    let texts: Arc<Mutex<Vec<String>>> = Arc::default();
    let texts_in = texts.clone();
    let mut signals = chat::Signals::default();
    signals.text_added = Some(Box::new(move |text| {
        texts_in.lock().unwrap().push(text);
    }));

    chat::text_added(&session, "one".to_string()).unwrap();
    // A frame nobody handles: method ordinal with a signal cookie.
    session
        .send_signal(chat::ID, chat::Element::send as u16, |packet| {
            "stray".encode(packet);
        })
        .unwrap();
    chat::text_added(&session, "two".to_string()).unwrap();

    let mut groups: [&mut dyn SignalGroup; 1] = [&mut signals];
    for _ in 0..3 {
        client.dispatch_one(&mut groups).await.unwrap();
    }
    assert_eq!(
        *texts.lock().unwrap(),
        vec!["one".to_string(), "two".to_string()]
    );
}

#[tokio::test]
async fn signals_from_unknown_interfaces_are_discarded() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();
    let session = ServerSession::from_std(b, |_| {}).unwrap();

    session
        .send_signal(0xDEAD_0000, 0, |packet| 1u8.encode(packet))
        .unwrap();
    chat::text_added(&session, "still alive".to_string()).unwrap();

    let texts: Arc<Mutex<Vec<String>>> = Arc::default();
    let texts_in = texts.clone();
    let mut signals = chat::Signals::default();
    signals.text_added = Some(Box::new(move |text| {
        texts_in.lock().unwrap().push(text);
    }));
    let mut groups: [&mut dyn SignalGroup; 1] = [&mut signals];
    client.dispatch_one(&mut groups).await.unwrap();
    client.dispatch_one(&mut groups).await.unwrap();
    assert_eq!(*texts.lock().unwrap(), vec!["still alive".to_string()]);
}
