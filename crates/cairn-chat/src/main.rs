//! cairn-chat — demo chat client and server over cairn IPC.

use std::path::PathBuf;

use anyhow::Result;

mod client;
mod config;
mod proto;
mod server;

fn print_usage() {
    println!("Usage: cairn-chat <command>");
    println!();
    println!("Commands");
    println!("  serve [socket]         Run the chat server on a unix socket");
    println!("  join  [socket] [name]  Join a server and chat from stdin");
    println!();
    println!("Defaults come from the config file (see config.rs) or");
    println!("CAIRN_CHAT_SOCKET / CAIRN_CHAT_NAME / CAIRN_CHAT_CONFIG.");
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity, e.g. RUST_LOG=debug cairn-chat serve
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = config::ChatConfig::load();
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("serve") => {
            let socket = args.next().map(PathBuf::from).unwrap_or(config.socket_path);
            server::run(socket).await
        }
        Some("join") => {
            let socket = args.next().map(PathBuf::from).unwrap_or(config.socket_path);
            let name = args.next().unwrap_or(config.display_name);
            client::run(socket, name).await
        }
        _ => {
            print_usage();
            std::process::exit(2);
        }
    }
}
