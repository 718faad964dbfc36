//! Client core — cookie allocation, reply correlation, signal dispatch.

use std::cell::{Cell, RefCell};
use std::io;
use std::path::Path;

use tokio::net::UnixStream;

use cairn_wire::codec::CodecError;
use cairn_wire::packet::Packet;
use cairn_wire::parser::Parser;
use cairn_wire::wire::{MsgHeader, MsgId, INITIAL_COOKIE};

use crate::group::SignalGroup;
use crate::transport::{IpcError, Transport};

/// One-shot continuation that decodes a reply payload and runs the
/// caller's callback.
pub type ReplyDecoder = Box<dyn FnOnce(&mut Parser<'_>) -> Result<(), CodecError> + Send>;

/// Box a reply-decoding continuation with the lifetimes the active table
/// expects; used by the `protocol!`-generated shims.
pub fn reply_decoder<F>(f: F) -> ReplyDecoder
where
    F: FnOnce(&mut Parser<'_>) -> Result<(), CodecError> + Send + 'static,
{
    Box::new(f)
}

struct ActiveRequest {
    id: MsgId,
    decode_reply: ReplyDecoder,
}

/// The invoking side of a connection.
///
/// All state lives behind `Cell`/`RefCell`: one task drives the client
/// and nothing locks. Methods therefore take `&self`, which lets an
/// application `select!` between [`Client::dispatch_one`] and
/// invocations on the same value.
pub struct Client {
    transport: Transport,
    cookie: Cell<u16>,
    active: RefCell<Vec<ActiveRequest>>,
}

impl Client {
    pub fn new(stream: UnixStream) -> io::Result<Self> {
        Ok(Self {
            transport: Transport::new(stream)?,
            cookie: Cell::new(INITIAL_COOKIE),
            active: RefCell::new(Vec::new()),
        })
    }

    pub async fn connect(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(UnixStream::connect(path).await?)
    }

    /// Adopt a std stream (e.g. one half of a `socketpair`).
    pub fn from_std(stream: std::os::unix::net::UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Self::new(UnixStream::from_std(stream)?)
    }

    fn next_cookie(&self) -> u16 {
        let cookie = self.cookie.get();
        self.cookie.set(cookie.wrapping_add(1));
        cookie
    }

    /// Raw invocation entry point; the `protocol!` shims call this with
    /// the compile-time-checked pieces already resolved.
    ///
    /// Allocates a cookie, registers the reply decoder (when the method
    /// returns something), encodes, and sends. At most one active entry
    /// exists per cookie; the entry is removed again if the send fails.
    pub fn invoke(
        &self,
        interface_id: u32,
        ordinal: u16,
        encode: impl FnOnce(&mut Packet),
        reply: Option<ReplyDecoder>,
    ) -> Result<(), IpcError> {
        let cookie = self.next_cookie();
        let id = MsgId {
            interface_id,
            ordinal,
            cookie,
        };
        if let Some(decode_reply) = reply {
            self.active
                .borrow_mut()
                .push(ActiveRequest { id, decode_reply });
        }

        let mut packet = Packet::new(MsgHeader::request(interface_id, ordinal, cookie));
        encode(&mut packet);

        let result = self.transport.send(packet);
        if result.is_err() {
            self.active.borrow_mut().retain(|request| request.id != id);
        }
        result
    }

    /// Receive and dispatch exactly one inbound message.
    ///
    /// A message matching an active request's full `(interface_id,
    /// ordinal, cookie)` triple runs that reply decoder exactly once;
    /// anything else routes as a signal through `signals`. Unmatched
    /// messages are consumed and discarded. Any error drops the active
    /// list.
    pub async fn dispatch_one(
        &self,
        signals: &mut [&mut dyn SignalGroup],
    ) -> Result<(), IpcError> {
        let result = self.dispatch_inner(signals).await;
        if result.is_err() {
            self.active.borrow_mut().clear();
        }
        result
    }

    async fn dispatch_inner(
        &self,
        signals: &mut [&mut dyn SignalGroup],
    ) -> Result<(), IpcError> {
        let mut message = self.transport.receive().await?;
        let id = message.header().id();

        let position = self
            .active
            .borrow()
            .iter()
            .position(|request| request.id == id);
        if let Some(position) = position {
            let request = self.active.borrow_mut().remove(position);
            let mut parser = message.parser();
            (request.decode_reply)(&mut parser)?;
            return Ok(());
        }

        // Not a known reply: treat as a signal, even when the ordinal
        // names a method.
        let mut parser = message.parser();
        for group in signals.iter_mut() {
            if group.interface_id() != id.interface_id {
                continue;
            }
            if group.dispatch(id.ordinal, &mut parser)? {
                return Ok(());
            }
            break;
        }
        tracing::trace!(
            interface_id = format_args!("{:08x}", id.interface_id),
            ordinal = id.ordinal,
            cookie = id.cookie,
            "unmatched message discarded"
        );
        Ok(())
    }

    /// Invocations still awaiting replies.
    pub fn pending_replies(&self) -> usize {
        self.active.borrow().len()
    }

    /// Drop every pending reply continuation and shut the socket down.
    pub fn close(&self) {
        self.active.borrow_mut().clear();
        self.transport.close();
    }
}

/// Drive signal dispatch until the transport fails. The active-request
/// table is dropped on exit; pending reply callbacks never run.
pub async fn dispatch_signals(
    client: &Client,
    signals: &mut [&mut dyn SignalGroup],
) -> Result<(), IpcError> {
    loop {
        client.dispatch_one(signals).await?;
    }
}
