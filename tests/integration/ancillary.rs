//! Descriptor and credential passing.

use std::io::{Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::sync::{Arc, Mutex};

use cairn::{Client, Creds, FdHandle, MethodGroup, ServerSession};

use crate::proto::pipe_proto::pipes;
use crate::stream_pair;

fn identity(fd: RawFd) -> (libc::dev_t, libc::ino_t) {
    let mut stat = unsafe { std::mem::zeroed::<libc::stat>() };
    assert_eq!(unsafe { libc::fstat(fd, &mut stat) }, 0, "fstat failed");
    (stat.st_dev, stat.st_ino)
}

fn pipe() -> (OwnedFd, OwnedFd) {
    let mut fds = [0i32; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe failed");
    unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
}

#[tokio::test]
async fn fd_and_creds_cross_regardless_of_signature_order() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();

    let (read_end, write_end) = pipe();
    let mut write_end = std::fs::File::from(write_end);
    // Pass a duplicate; the original stays with the client.
    let send_handle = FdHandle::from(read_end.try_clone().unwrap());

    let received: Arc<Mutex<Option<(FdHandle, Creds)>>> = Arc::default();
    let received_in = received.clone();
    let server = tokio::spawn(async move {
        let session = ServerSession::from_std(b, |_| {}).unwrap();
        let mut methods = pipes::Methods::default();
        methods.plumb = Some(Box::new(move |source, creds| {
            *received_in.lock().unwrap() = Some((source, creds));
            true
        }));
        let mut groups: [&mut dyn MethodGroup; 1] = [&mut methods];
        session.dispatch_one(&mut groups).await.unwrap();
    });

    pipes::plumb(&client, send_handle, Creds::current(), |accepted| {
        assert!(accepted);
    })
    .unwrap();
    client.dispatch_one(&mut []).await.unwrap();
    server.await.unwrap();

    let (handle, creds) = received.lock().unwrap().take().unwrap();
    assert!(handle.is_valid());
    // The fd comes from the rights queue, the creds from the credentials
    // block — their order in the signature does not matter.
    assert_eq!(creds.uid, unsafe { libc::geteuid() });
    assert_eq!(creds.pid, std::process::id() as i32);

    // Same open file description on both sides.
    assert_eq!(identity(handle.as_raw_fd()), identity(read_end.as_raw_fd()));

    // Bytes written on the client's write end surface through the passed
    // descriptor.
    write_end.write_all(b"through the pipe").unwrap();
    let mut reader = std::fs::File::from(handle.into_owned().unwrap());
    let mut buf = [0u8; 16];
    reader.read_exact(&mut buf).unwrap();
    assert_eq!(&buf, b"through the pipe");

    // Closing the server's copy must not invalidate the client's.
    drop(reader);
    identity(read_end.as_raw_fd());
}

#[tokio::test]
async fn missing_ancillary_items_yield_sentinels_not_errors() {
    let (a, b) = stream_pair();
    let client = Client::from_std(a).unwrap();

    let received: Arc<Mutex<Option<(FdHandle, Creds)>>> = Arc::default();
    let received_in = received.clone();
    let server = tokio::spawn(async move {
        let session = ServerSession::from_std(b, |_| {}).unwrap();
        let mut methods = pipes::Methods::default();
        methods.plumb = Some(Box::new(move |source, creds| {
            *received_in.lock().unwrap() = Some((source, creds));
            true
        }));
        let mut groups: [&mut dyn MethodGroup; 1] = [&mut methods];
        session.dispatch_one(&mut groups).await.unwrap();
    });

    // Raw invoke with an empty payload: no fd attached, no creds
    // requested. The typed shim would attach both; the decoders must
    // fall back to sentinels when the items never arrive.
    let replied = Arc::new(Mutex::new(false));
    let replied_in = replied.clone();
    client
        .invoke(
            pipes::ID,
            pipes::Element::plumb as u16,
            |_| {},
            Some(cairn::client::reply_decoder(move |parser| {
                let accepted = <bool as cairn::Decode<'_>>::decode(parser)?;
                *replied_in.lock().unwrap() = accepted;
                Ok(())
            })),
        )
        .unwrap();
    client.dispatch_one(&mut []).await.unwrap();
    server.await.unwrap();

    let (handle, creds) = received.lock().unwrap().take().unwrap();
    assert!(!handle.is_valid(), "absent fd decodes to the invalid handle");
    // SO_PASSCRED is enabled transport-wide, so the kernel may still
    // attach sender credentials; if it did not, the sentinel shows up.
    if creds.is_absent() {
        assert_eq!(creds, Creds::ABSENT);
    } else {
        assert_eq!(creds.uid, unsafe { libc::geteuid() });
    }
    assert!(*replied.lock().unwrap());
}
