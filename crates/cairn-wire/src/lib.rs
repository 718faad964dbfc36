//! cairn-wire — wire format, schema identifiers, and serialization for
//! cairn IPC. Everything here is socket-free and synchronous; the
//! transport and dispatch loops live in the `cairn` crate.

pub mod codec;
pub mod creds;
pub mod fd;
pub mod packet;
pub mod parser;
pub mod schema;
pub mod wire;

// Re-exported for the impl_pod_codec! expansion.
pub use zerocopy;

pub use codec::{CodecError, Decode, Encode};
pub use creds::Creds;
pub use fd::FdHandle;
pub use packet::Packet;
pub use parser::{Message, Parser};
pub use schema::{interface_id, name_hash, ElementInfo, ElementKind};
pub use wire::{MsgHeader, MsgId, WireError, HEADER_SIZE, INITIAL_COOKIE, SIGNAL_COOKIE};
