//! Handler groups — dispatch tables keyed by interface id.
//!
//! Dispatch indexes first by interface id (a linear scan over the
//! declared groups; cardinalities are tiny), then by element ordinal
//! within the matched group. A missing handler for a received element is
//! not an error: the message is consumed and discarded.

use cairn_wire::codec::CodecError;
use cairn_wire::packet::Packet;
use cairn_wire::parser::Parser;
use cairn_wire::wire::MsgHeader;

/// Outcome of dispatching one inbound message into a method group.
pub enum DispatchOutcome {
    /// A non-void method handler ran; its reply must be sent.
    Reply(Packet),
    /// A handler ran and nothing needs to be sent.
    Done,
    /// No handler was installed for the ordinal; discard the message.
    Unhandled,
}

/// Signal handlers for one interface, dispatched at the client.
pub trait SignalGroup {
    fn interface_id(&self) -> u32;

    /// Dispatch one signal; returns `false` when this group has no
    /// installed handler for the ordinal.
    fn dispatch(&mut self, ordinal: u16, parser: &mut Parser<'_>) -> Result<bool, CodecError>;
}

/// Method handlers for one interface, dispatched at the server session.
pub trait MethodGroup {
    fn interface_id(&self) -> u32;

    fn dispatch(
        &mut self,
        header: &MsgHeader,
        parser: &mut Parser<'_>,
    ) -> Result<DispatchOutcome, CodecError>;
}
