//! Chat server — accepts connections and fans text out to every session.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use cairn::{MethodGroup, ServerSession};

use crate::proto::chat_proto::chat;

pub async fn run(socket_path: PathBuf) -> Result<()> {
    // Stale socket file from a previous run.
    let _ = std::fs::remove_file(&socket_path);
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("binding {}", socket_path.display()))?;
    tracing::info!(socket = %socket_path.display(), "chat server listening");

    let (texts, _) = broadcast::channel::<String>(64);

    loop {
        let (stream, _addr) = listener.accept().await?;
        tracing::debug!("accepted connection");
        let texts = texts.clone();
        tokio::spawn(async move {
            if let Err(error) = serve_session(stream, texts).await {
                tracing::debug!(%error, "session ended");
            }
        });
    }
}

async fn serve_session(stream: UnixStream, texts: broadcast::Sender<String>) -> Result<()> {
    let session = ServerSession::new(stream, |error| {
        tracing::warn!(%error, "chat session failed");
    })?;

    let mut methods = chat::Methods::default();
    methods.connect = Some(Box::new(|creds, name| {
        tracing::info!(
            name,
            uid = creds.uid,
            gid = creds.gid,
            pid = creds.pid,
            "user connected"
        );
        true
    }));
    let texts_in = texts.clone();
    methods.send = Some(Box::new(move |text| {
        println!("<CHAT>: {text}");
        let _ = texts_in.send(text);
    }));

    let mut receiver = texts.subscribe();
    let mut groups: [&mut dyn MethodGroup; 1] = [&mut methods];
    loop {
        tokio::select! {
            result = session.dispatch_one(&mut groups) => result?,
            text = receiver.recv() => match text {
                Ok(text) => chat::text_added(&session, text)?,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "slow session skipped broadcasts");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
