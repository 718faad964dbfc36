//! Large payloads in a single frame.

use cairn::{Client, Decode, Transport};

use crate::proto::chat_proto::chat;
use crate::stream_pair;

#[tokio::test]
async fn sixty_kilobyte_string_uses_one_frame() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();
    let peer = Transport::from_std(b).unwrap();

    let text = "x".repeat(60_000);
    chat::send(&client, text.clone()).unwrap();

    let mut message = peer.receive().await.unwrap();
    // 2 bytes of length prefix plus the string itself.
    assert_eq!(message.header().payload_len(), 60_002);
    assert_eq!(message.header().control_len(), 0);
    assert_eq!(String::decode(&mut message.parser()).unwrap(), text);
}

#[tokio::test]
async fn empty_string_round_trips() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();
    let peer = Transport::from_std(b).unwrap();

    chat::send(&client, String::new()).unwrap();

    let mut message = peer.receive().await.unwrap();
    assert_eq!(message.header().payload_len(), 2);
    assert_eq!(String::decode(&mut message.parser()).unwrap(), "");
}
