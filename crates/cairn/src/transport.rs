//! Local-socket message transport.
//!
//! A thin wrapper over a connected `tokio::net::UnixStream` that sends
//! assembled packets as one scatter-gather write and receives one full
//! message at a time: a non-consuming peek of the header, then a single
//! `recvmsg` for header, payload, and ancillary data.
//!
//! Sends never queue. One non-blocking system call either moves the whole
//! frame into the kernel buffer or the send is a transport failure.

use std::io::{self, IoSlice, IoSliceMut};
use std::os::fd::AsRawFd;

use nix::sys::socket::{
    self, ControlMessage, ControlMessageOwned, MsgFlags, UnixAddr, UnixCredentials,
};
use tokio::io::Interest;
use tokio::net::UnixStream;

use cairn_wire::codec::CodecError;
use cairn_wire::creds::Creds;
use cairn_wire::fd::FdHandle;
use cairn_wire::packet::Packet;
use cairn_wire::parser::Message;
use cairn_wire::wire::{MsgHeader, WireError, HEADER_SIZE};
use zerocopy::FromBytes;

/// Errors surfaced by the transport and the dispatch loops.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("socket i/o: {0}")]
    Io(#[from] io::Error),

    #[error("peer closed the connection")]
    Disconnected,

    #[error("short send: wrote {written} of {expected} bytes")]
    ShortSend { written: usize, expected: usize },

    #[error("frame: {0}")]
    Frame(#[from] WireError),

    #[error("malformed message: {0}")]
    Codec(#[from] CodecError),
}

pub struct Transport {
    stream: UnixStream,
}

impl Transport {
    /// Wrap a connected stream. Enables credential passing and
    /// (best-effort) security-label passing on the socket.
    pub fn new(stream: UnixStream) -> io::Result<Self> {
        socket::setsockopt(&stream, socket::sockopt::PassCred, &true)
            .map_err(io::Error::from)?;
        // No nix wrapper for SO_PASSSEC; not every kernel/LSM offers it.
        let on: libc::c_int = 1;
        let rc = unsafe {
            libc::setsockopt(
                stream.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PASSSEC,
                &on as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            tracing::debug!(
                error = %io::Error::last_os_error(),
                "SO_PASSSEC not enabled on session socket"
            );
        }
        Ok(Self { stream })
    }

    /// Adopt a std stream (e.g. one half of a `socketpair`).
    pub fn from_std(stream: std::os::unix::net::UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Self::new(UnixStream::from_std(stream)?)
    }

    /// Send one assembled packet: finalize the header, then a single
    /// scatter-gather `sendmsg` carrying every payload segment plus the
    /// credentials and rights control messages.
    pub fn send(&self, mut packet: Packet) -> Result<(), IpcError> {
        let expected = packet.finalize()?;

        let iov: Vec<IoSlice<'_>> = packet
            .segments()
            .iter()
            .map(|segment| IoSlice::new(segment))
            .collect();

        let creds = Creds::current();
        let ucred = libc::ucred {
            pid: creds.pid,
            uid: creds.uid,
            gid: creds.gid,
        };
        let unix_creds = UnixCredentials::from(ucred);

        let mut cmsgs: Vec<ControlMessage<'_>> = Vec::with_capacity(2);
        if packet.wants_creds() {
            cmsgs.push(ControlMessage::ScmCredentials(&unix_creds));
        }
        if !packet.fds().is_empty() {
            cmsgs.push(ControlMessage::ScmRights(packet.fds()));
        }

        let written = socket::sendmsg::<UnixAddr>(
            self.stream.as_raw_fd(),
            &iov,
            &cmsgs,
            MsgFlags::MSG_NOSIGNAL | MsgFlags::MSG_DONTWAIT,
            None,
        )
        .map_err(io::Error::from)?;

        if written != expected {
            return Err(IpcError::ShortSend { written, expected });
        }
        Ok(())
    }

    /// Receive one full message. Parks until the socket is readable or
    /// errored, then consumes exactly one frame.
    pub async fn receive(&self) -> Result<Message, IpcError> {
        loop {
            let ready = self
                .stream
                .ready(Interest::READABLE | Interest::ERROR)
                .await?;

            if ready.is_error() {
                let code = socket::getsockopt(&self.stream, socket::sockopt::SocketError)
                    .map_err(io::Error::from)?;
                if code != 0 {
                    return Err(IpcError::Io(io::Error::from_raw_os_error(code)));
                }
            }

            match self.stream.try_io(Interest::READABLE, || self.recv_one()) {
                Ok(message) => return Ok(message),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(IpcError::Disconnected)
                }
                Err(e) => return Err(IpcError::Io(e)),
            }
        }
    }

    fn recv_one(&self) -> io::Result<Message> {
        let fd = self.stream.as_raw_fd();

        // Peek the header without consuming it. MSG_TRUNC asks the kernel
        // for the real queued length even when it exceeds our buffer.
        let mut header_buf = [0u8; HEADER_SIZE];
        let peeked = socket::recv(
            fd,
            &mut header_buf,
            MsgFlags::MSG_PEEK | MsgFlags::MSG_TRUNC | MsgFlags::MSG_DONTWAIT,
        )
        .map_err(io::Error::from)?;
        if peeked == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        if peeked < HEADER_SIZE {
            // Header not fully queued yet; re-arm readiness and retry.
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let header = MsgHeader::read_from(&header_buf[..])
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad header peek"))?;

        let total = HEADER_SIZE + header.payload_len() as usize;
        let mut buf = vec![0u8; total];
        // Room for the sender-declared ancillary region plus the
        // credentials message the kernel attaches under SO_PASSCRED even
        // when the sender requested none.
        let slack =
            unsafe { libc::CMSG_SPACE(std::mem::size_of::<libc::ucred>() as u32) } as usize;
        let mut cmsg_buf: Vec<u8> = Vec::with_capacity(header.control_len() as usize + slack);

        let mut fds = Vec::new();
        let mut creds = None;
        let received_bytes;
        {
            let mut iov = [IoSliceMut::new(&mut buf)];
            let received = socket::recvmsg::<UnixAddr>(
                fd,
                &mut iov,
                Some(&mut cmsg_buf),
                MsgFlags::MSG_CMSG_CLOEXEC | MsgFlags::MSG_DONTWAIT,
            )
            .map_err(io::Error::from)?;

            for cmsg in received.cmsgs().map_err(io::Error::from)? {
                match cmsg {
                    ControlMessageOwned::ScmRights(raw_fds) => {
                        fds.extend(
                            raw_fds
                                .into_iter()
                                .map(|raw| unsafe { FdHandle::from_raw(raw) }),
                        );
                    }
                    ControlMessageOwned::ScmCredentials(c) => {
                        creds = Some(Creds {
                            pid: c.pid(),
                            uid: c.uid(),
                            gid: c.gid(),
                        });
                    }
                    other => {
                        tracing::trace!(cmsg = ?other, "ignoring control message");
                    }
                }
            }
            if received.flags.contains(MsgFlags::MSG_CTRUNC) {
                tracing::warn!(
                    control_len = header.control_len(),
                    "ancillary data truncated"
                );
            }
            received_bytes = received.bytes;
        }

        if received_bytes < total {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("truncated frame: {received_bytes} of {total} bytes"),
            ));
        }

        let payload = buf.split_off(HEADER_SIZE);
        Ok(Message::new(header, payload, fds, creds))
    }

    /// Shut both directions down; pending readiness waits complete with
    /// an error.
    pub fn close(&self) {
        let _ = socket::shutdown(self.stream.as_raw_fd(), socket::Shutdown::Both);
    }
}
