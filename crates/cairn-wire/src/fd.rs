//! Owning file descriptor handle.
//!
//! Received descriptors become [`FdHandle`]s: single-owner, closed exactly
//! once when dropped. The non-owning counterpart for sending is std's
//! [`BorrowedFd`] — attaching one to a packet never transfers close
//! responsibility.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

/// An owned descriptor, or the invalid sentinel a decoder yields when the
/// message carried fewer descriptors than the signature asked for.
#[derive(Debug, Default)]
pub struct FdHandle(Option<OwnedFd>);

impl FdHandle {
    /// The invalid handle. Holds nothing and closes nothing.
    pub const fn invalid() -> Self {
        Self(None)
    }

    /// Take ownership of a raw descriptor.
    ///
    /// # Safety
    /// `fd` must be an open descriptor not owned elsewhere. Negative
    /// values yield the invalid handle.
    pub unsafe fn from_raw(fd: RawFd) -> Self {
        if fd < 0 {
            Self(None)
        } else {
            Self(Some(OwnedFd::from_raw_fd(fd)))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Raw descriptor number, `-1` when invalid.
    pub fn as_raw_fd(&self) -> RawFd {
        self.0.as_ref().map_or(-1, AsRawFd::as_raw_fd)
    }

    /// Borrow without transferring close responsibility.
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        self.0.as_ref().map(|fd| fd.as_fd())
    }

    /// Duplicate the underlying descriptor (`dup`). The clone closes
    /// independently of the original.
    pub fn try_clone(&self) -> io::Result<FdHandle> {
        match &self.0 {
            Some(fd) => Ok(FdHandle(Some(fd.try_clone()?))),
            None => Ok(FdHandle::invalid()),
        }
    }

    /// Unwrap into the underlying descriptor, if any.
    pub fn into_owned(self) -> Option<OwnedFd> {
        self.0
    }
}

impl From<OwnedFd> for FdHandle {
    fn from(fd: OwnedFd) -> Self {
        Self(Some(fd))
    }
}
