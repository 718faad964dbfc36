//! Server-session core — method dispatch, signal emission, teardown.

use std::cell::RefCell;
use std::io;

use tokio::net::UnixStream;

use cairn_wire::packet::Packet;
use cairn_wire::wire::MsgHeader;

use crate::group::{DispatchOutcome, MethodGroup};
use crate::transport::{IpcError, Transport};

/// One-shot continuation run when the session tears down with an error.
pub type ErrorHandler = Box<dyn FnOnce(&IpcError) + Send>;

/// The serving side of one connected peer.
///
/// The session owns the socket and an error-handler continuation. Method
/// calls are handled synchronously with respect to the dispatch loop; the
/// session keeps no request state. Like [`Client`](crate::Client), all
/// methods take `&self` under single-task discipline.
pub struct ServerSession {
    transport: Transport,
    on_error: RefCell<Option<ErrorHandler>>,
}

impl ServerSession {
    pub fn new(
        stream: UnixStream,
        on_error: impl FnOnce(&IpcError) + Send + 'static,
    ) -> io::Result<Self> {
        Ok(Self {
            transport: Transport::new(stream)?,
            on_error: RefCell::new(Some(Box::new(on_error))),
        })
    }

    /// Adopt a std stream (e.g. one half of a `socketpair`).
    pub fn from_std(
        stream: std::os::unix::net::UnixStream,
        on_error: impl FnOnce(&IpcError) + Send + 'static,
    ) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Self::new(UnixStream::from_std(stream)?, on_error)
    }

    /// Receive and dispatch exactly one inbound message.
    ///
    /// Methods with a non-void return produce exactly one reply packet
    /// echoing the request id; void methods and signals produce nothing;
    /// unmatched elements are consumed and discarded. A transport or
    /// decode failure runs the error handler and closes the session.
    pub async fn dispatch_one(
        &self,
        methods: &mut [&mut dyn MethodGroup],
    ) -> Result<(), IpcError> {
        match self.dispatch_inner(methods).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    async fn dispatch_inner(
        &self,
        methods: &mut [&mut dyn MethodGroup],
    ) -> Result<(), IpcError> {
        let mut message = self.transport.receive().await?;
        let header = message.header();

        let mut outcome = DispatchOutcome::Unhandled;
        {
            let mut parser = message.parser();
            for group in methods.iter_mut() {
                if group.interface_id() != header.interface_id() {
                    continue;
                }
                outcome = group.dispatch(&header, &mut parser)?;
                break;
            }
        }

        match outcome {
            DispatchOutcome::Reply(reply) => self.transport.send(reply)?,
            DispatchOutcome::Done => {}
            DispatchOutcome::Unhandled => {
                tracing::trace!(
                    interface_id = format_args!("{:08x}", header.interface_id()),
                    ordinal = header.ordinal(),
                    "unmatched message discarded"
                );
            }
        }
        Ok(())
    }

    /// Emit a fire-and-forget signal; the wire cookie is zero.
    pub fn send_signal(
        &self,
        interface_id: u32,
        ordinal: u16,
        encode: impl FnOnce(&mut Packet),
    ) -> Result<(), IpcError> {
        let mut packet = Packet::new(MsgHeader::signal(interface_id, ordinal));
        encode(&mut packet);
        match self.transport.send(packet) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn fail(&self, err: &IpcError) {
        if let Some(handler) = self.on_error.borrow_mut().take() {
            tracing::warn!(error = %err, "session failed");
            handler(err);
        }
        self.transport.close();
    }

    /// Tear the session down without invoking the error handler.
    pub fn close(&self) {
        self.on_error.borrow_mut().take();
        self.transport.close();
    }
}

/// Drive method dispatch until the session ends. The error handler has
/// already run when this returns an error.
pub async fn dispatch_methods(
    session: &ServerSession,
    methods: &mut [&mut dyn MethodGroup],
) -> Result<(), IpcError> {
    loop {
        session.dispatch_one(methods).await?;
    }
}
