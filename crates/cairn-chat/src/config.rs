//! Configuration for the chat demo.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CHAT_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/chat.toml
//!   3. ~/.config/cairn/chat.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Socket path the server binds and the client dials.
    pub socket_path: PathBuf,
    /// Display name the client sends with `connect`.
    pub display_name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("/tmp/cairn-chat.sock"),
            display_name: std::env::var("USER").unwrap_or_else(|_| "user".to_string()),
        }
    }
}

impl ChatConfig {
    pub fn load() -> Self {
        let mut config = Self::from_file().unwrap_or_default();
        if let Ok(path) = std::env::var("CAIRN_CHAT_SOCKET") {
            config.socket_path = path.into();
        }
        if let Ok(name) = std::env::var("CAIRN_CHAT_NAME") {
            config.display_name = name;
        }
        config
    }

    fn from_file() -> Option<Self> {
        let path = std::env::var_os("CAIRN_CHAT_CONFIG")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("XDG_CONFIG_HOME")
                    .map(|dir| PathBuf::from(dir).join("cairn/chat.toml"))
            })
            .or_else(|| {
                std::env::var_os("HOME")
                    .map(|home| PathBuf::from(home).join(".config/cairn/chat.toml"))
            })?;
        let text = std::fs::read_to_string(&path).ok()?;
        match toml::from_str(&text) {
            Ok(config) => Some(config),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring malformed config file");
                None
            }
        }
    }
}
