//! Chat client — joins a server, sends stdin lines, prints broadcasts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use cairn::{Client, Creds, SignalGroup};

use crate::proto::chat_proto::chat;

pub async fn run(socket_path: PathBuf, name: String) -> Result<()> {
    let client = Client::connect(&socket_path)
        .await
        .with_context(|| format!("connecting to {}", socket_path.display()))?;

    chat::connect(&client, Creds::current(), name, |accepted| {
        if accepted {
            tracing::info!("server accepted the connection");
        } else {
            tracing::error!("server rejected the connection");
        }
    })?;

    let mut signals = chat::Signals::default();
    signals.text_added = Some(Box::new(|text| println!("{text}")));

    let mut groups: [&mut dyn SignalGroup; 1] = [&mut signals];
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            result = client.dispatch_one(&mut groups) => result?,
            line = lines.next_line() => match line? {
                Some(line) if !line.trim().is_empty() => chat::send(&client, line)?,
                Some(_) => {}
                None => break,
            },
        }
    }
    client.close();
    Ok(())
}
