//! cairn integration tests — end-to-end over real socketpairs.
//!
//! Each module drives one scenario group with a typed client on one end
//! and either a typed server session or a raw [`cairn::Transport`] (for
//! wire-level assertions) on the other. No external fixtures needed:
//!
//!   cargo test --test integration

mod ancillary;
mod payload;
mod roundtrip;
mod signals;
mod teardown;

/// A connected pair of std streams; callers wrap each end as needed.
pub fn stream_pair() -> (
    std::os::unix::net::UnixStream,
    std::os::unix::net::UnixStream,
) {
    std::os::unix::net::UnixStream::pair().expect("socketpair")
}
