//! Typed encoders and decoders.
//!
//! Arguments are encoded into a [`Packet`] in declared signature order
//! and decoded from a [`Parser`] in the same order. Payload items are
//! little-endian; strings and sequences carry a u16 length prefix;
//! credentials and descriptors travel in the ancillary region and occupy
//! no payload bytes.

use std::os::fd::{AsRawFd, BorrowedFd};

use crate::creds::Creds;
use crate::fd::FdHandle;
use crate::packet::Packet;
use crate::parser::Parser;

/// Errors raised while decoding a received payload.
///
/// An over-read (or a bad length prefix, which surfaces as one) is
/// unrecoverable: the session that hits it tears down. Missing ancillary
/// items are *not* errors; those decoders yield sentinel values instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("payload over-read: wanted {wanted} bytes, {remaining} remaining")]
    OverRead { wanted: usize, remaining: usize },

    #[error("string payload is not valid utf-8")]
    Utf8,
}

/// Write one value into an outbound packet.
pub trait Encode {
    fn encode(&self, packet: &mut Packet);
}

/// Read one value out of a received message. Borrowing implementations
/// (`&str`, `&[u8]`) view the message payload for the message's lifetime;
/// everything else copies.
pub trait Decode<'m>: Sized {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, packet: &mut Packet) {
        (**self).encode(packet);
    }
}

macro_rules! numeric_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl Encode for $ty {
            fn encode(&self, packet: &mut Packet) {
                packet.append(&self.to_le_bytes());
            }
        }

        impl<'m> Decode<'m> for $ty {
            fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
                let bytes = parser.take(std::mem::size_of::<$ty>())?;
                Ok(<$ty>::from_le_bytes(
                    bytes.try_into().expect("take returned the requested length"),
                ))
            }
        }
    )*};
}

numeric_codec!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Encode for bool {
    fn encode(&self, packet: &mut Packet) {
        packet.append(&[u8::from(*self)]);
    }
}

impl<'m> Decode<'m> for bool {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        Ok(u8::decode(parser)? != 0)
    }
}

impl Encode for str {
    fn encode(&self, packet: &mut Packet) {
        debug_assert!(self.len() <= u16::MAX as usize);
        let span = packet.reserve(std::mem::size_of::<u16>() + self.len());
        span[..2].copy_from_slice(&(self.len() as u16).to_le_bytes());
        span[2..].copy_from_slice(self.as_bytes());
    }
}

impl Encode for String {
    fn encode(&self, packet: &mut Packet) {
        self.as_str().encode(packet);
    }
}

impl<'m> Decode<'m> for &'m str {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        let bytes = <&[u8]>::decode(parser)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::Utf8)
    }
}

impl<'m> Decode<'m> for String {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        Ok(<&str>::decode(parser)?.to_owned())
    }
}

impl<'m> Decode<'m> for &'m [u8] {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        let count = u16::decode(parser)? as usize;
        parser.take(count)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, packet: &mut Packet) {
        debug_assert!(self.len() <= u16::MAX as usize);
        (self.len() as u16).encode(packet);
        for item in self {
            item.encode(packet);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, packet: &mut Packet) {
        self.as_slice().encode(packet);
    }
}

impl<'m, T: Decode<'m>> Decode<'m> for Vec<T> {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        let count = u16::decode(parser)? as usize;
        let mut items = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            items.push(T::decode(parser)?);
        }
        Ok(items)
    }
}

impl Encode for Creds {
    /// Requests kernel-attached sender credentials; the encoded instance's
    /// field values are not transmitted.
    fn encode(&self, packet: &mut Packet) {
        packet.request_creds();
    }
}

impl<'m> Decode<'m> for Creds {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        Ok(parser.take_creds().unwrap_or(Creds::ABSENT))
    }
}

impl Encode for FdHandle {
    fn encode(&self, packet: &mut Packet) {
        packet.attach_fd(self.as_raw_fd());
    }
}

impl Encode for BorrowedFd<'_> {
    fn encode(&self, packet: &mut Packet) {
        packet.attach_fd(self.as_raw_fd());
    }
}

impl<'m> Decode<'m> for FdHandle {
    fn decode(parser: &mut Parser<'m>) -> Result<Self, CodecError> {
        Ok(parser.take_fd())
    }
}

/// Implement [`Encode`]/[`Decode`] for byte-copyable structs as raw
/// in-memory bytes (natural alignment, no padding normalization — the
/// protocol assumes a homogeneous ABI). The type must derive zerocopy's
/// `AsBytes` and `FromBytes`.
#[macro_export]
macro_rules! impl_pod_codec {
    ($($ty:ty),* $(,)?) => {$(
        impl $crate::codec::Encode for $ty {
            fn encode(&self, packet: &mut $crate::packet::Packet) {
                packet.append($crate::zerocopy::AsBytes::as_bytes(self));
            }
        }

        impl<'m> $crate::codec::Decode<'m> for $ty {
            fn decode(
                parser: &mut $crate::parser::Parser<'m>,
            ) -> Result<Self, $crate::codec::CodecError> {
                let bytes = parser.take(::std::mem::size_of::<$ty>())?;
                Ok(<$ty as $crate::zerocopy::FromBytes>::read_from(bytes)
                    .expect("take returned exactly size_of bytes"))
            }
        }
    )*};
}
