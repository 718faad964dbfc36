//! cairn — statically-typed IPC between processes on the same host,
//! carried over a local stream socket.
//!
//! A compile-time schema ([`protocol!`]) declares named, versioned
//! interfaces of methods (request/reply) and signals (fire-and-forget).
//! Typed invocations become 12-byte-headed frames; frames dispatch back
//! into typed handler callbacks on the far side. Ancillary socket payload
//! — passed file descriptors and peer credentials — rides along.
//!
//! The library creates no threads and embeds no reactor: every dispatch
//! loop is a plain future over socket readiness, driven by whatever
//! executor the application already runs. One task drives one client or
//! session; sends are a single non-blocking system call.
//!
//! Wire-level building blocks (framing, serialization, packet assembly)
//! live in `cairn-wire` and are re-exported here.

pub mod client;
pub mod group;
mod proto_macro;
pub mod session;
pub mod transport;

pub use cairn_wire as wire;

pub use cairn_wire::codec::{CodecError, Decode, Encode};
pub use cairn_wire::creds::Creds;
pub use cairn_wire::fd::FdHandle;
pub use cairn_wire::impl_pod_codec;
pub use cairn_wire::packet::Packet;
pub use cairn_wire::parser::{Message, Parser};
pub use cairn_wire::schema::{interface_id, name_hash, ElementInfo, ElementKind};
pub use cairn_wire::wire::{MsgHeader, MsgId, INITIAL_COOKIE, SIGNAL_COOKIE};

pub use client::{dispatch_signals, Client, ReplyDecoder};
pub use group::{DispatchOutcome, MethodGroup, SignalGroup};
pub use session::{dispatch_methods, ErrorHandler, ServerSession};
pub use transport::{IpcError, Transport};
