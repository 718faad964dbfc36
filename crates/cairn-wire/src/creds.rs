//! Peer credentials as reported by the kernel.

/// The `(pid, uid, gid)` tuple a local socket attaches to a message.
///
/// Encoding a `Creds` argument requests a kernel-attached credentials
/// control message; the field values of the encoded instance are *not*
/// transmitted. Decoding when no credentials arrived yields [`Creds::ABSENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Creds {
    pub pid: i32,
    pub uid: u32,
    pub gid: u32,
}

impl Creds {
    /// Sentinel for "no credentials were delivered": every field at its
    /// type's maximum.
    pub const ABSENT: Self = Self {
        pid: i32::MAX,
        uid: u32::MAX,
        gid: u32::MAX,
    };

    /// Credentials of the current process (pid, effective uid/gid).
    pub fn current() -> Self {
        Self {
            pid: std::process::id() as i32,
            uid: unsafe { libc::geteuid() },
            gid: unsafe { libc::getegid() },
        }
    }

    pub fn is_absent(&self) -> bool {
        *self == Self::ABSENT
    }
}
