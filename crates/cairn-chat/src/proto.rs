//! The chat wire protocol.

use cairn::Creds;

cairn::protocol! {
    /// Protocol spoken between the chat client and server.
    pub protocol chat_proto {
        interface chat: "chat" / "1.0" {
            method connect(creds: Creds, name: String) -> bool;
            method send(text: String);
            signal text_added(text: String);
        }
    }
}
