//! Outbound frame assembly.
//!
//! A [`Packet`] collects payload bytes into a list of segments suitable
//! for one scatter-gather send, plus the ancillary items (descriptors,
//! credentials request) the transport turns into control messages. The
//! header travels as the front of the first segment; its length fields
//! are patched in by [`Packet::finalize`] once everything is appended.

use std::os::fd::RawFd;

use zerocopy::AsBytes;

use crate::wire::{MsgHeader, WireError, HEADER_SIZE, MAX_PAYLOAD};

/// Spare payload capacity reserved up front so small messages stay in a
/// single segment.
const INITIAL_CAPACITY: usize = 128;

/// One outbound message under construction.
pub struct Packet {
    /// Payload segments. The first starts with the 12-byte header.
    /// Invariant: never empty.
    segments: Vec<Vec<u8>>,
    /// Descriptors queued for the rights control message, in attach order.
    /// They must stay open until the packet is sent.
    fds: Vec<RawFd>,
    want_creds: bool,
}

impl Packet {
    pub fn new(header: MsgHeader) -> Self {
        let mut first = Vec::with_capacity(HEADER_SIZE + INITIAL_CAPACITY);
        first.extend_from_slice(header.as_bytes());
        Self {
            segments: vec![first],
            fds: Vec::new(),
            want_creds: false,
        }
    }

    /// Append payload bytes. Packs into the trailing segment while its
    /// spare capacity lasts, else starts a new segment.
    pub fn append(&mut self, bytes: &[u8]) {
        match self.segments.last_mut() {
            Some(last) if last.capacity() - last.len() >= bytes.len() => {
                last.extend_from_slice(bytes);
            }
            _ => self.segments.push(bytes.to_vec()),
        }
    }

    /// Reserve `count` payload bytes and return the writable span, for
    /// encoders that patch a length prefix in front of data they copy.
    pub fn reserve(&mut self, count: usize) -> &mut [u8] {
        let needs_segment = self
            .segments
            .last()
            .map_or(true, |last| last.capacity() - last.len() < count);
        if needs_segment {
            self.segments.push(Vec::with_capacity(count));
        }
        let last = self
            .segments
            .last_mut()
            .expect("segments start with the header segment");
        let start = last.len();
        last.resize(start + count, 0);
        &mut last[start..]
    }

    /// Queue a descriptor for the ancillary rights block. The caller must
    /// keep it open until the packet is sent.
    pub fn attach_fd(&mut self, fd: RawFd) {
        self.fds.push(fd);
    }

    /// Mark the packet to carry sender credentials; the transport fills
    /// them from the current process at send time.
    pub fn request_creds(&mut self) {
        self.want_creds = true;
    }

    /// Ancillary region size the receiver must be prepared to take:
    /// credentials control message (if requested) then one rights message
    /// carrying all attached descriptors.
    pub fn control_space(&self) -> usize {
        let mut space = 0;
        if self.want_creds {
            space += unsafe { libc::CMSG_SPACE(std::mem::size_of::<libc::ucred>() as u32) } as usize;
        }
        if !self.fds.is_empty() {
            space += unsafe {
                libc::CMSG_SPACE((self.fds.len() * std::mem::size_of::<RawFd>()) as u32)
            } as usize;
        }
        space
    }

    /// Compute the final payload and control lengths and patch them into
    /// the header segment. Returns the total header+payload byte count
    /// for the scatter-gather send.
    pub fn finalize(&mut self) -> Result<usize, WireError> {
        let total: usize = self.segments.iter().map(Vec::len).sum();
        let payload = total - HEADER_SIZE;
        if payload > MAX_PAYLOAD {
            return Err(WireError::PayloadTooLarge(payload));
        }
        let control = self.control_space();
        let head = &mut self.segments[0];
        head[8..10].copy_from_slice(&(payload as u16).to_le_bytes());
        head[10..12].copy_from_slice(&(control as u16).to_le_bytes());
        Ok(total)
    }

    /// Payload segments for the scatter-gather send, header first.
    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    /// Attached descriptors in attach order.
    pub fn fds(&self) -> &[RawFd] {
        &self.fds
    }

    pub fn wants_creds(&self) -> bool {
        self.want_creds
    }
}
