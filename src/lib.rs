//! Line-based TCP chat server
//!
//! This library provides a small multi-client chat server speaking a
//! newline-terminated text protocol. Clients register with a `login:<name>`
//! line and every subsequent line is broadcast to all authenticated
//! participants, prefixed with the sender's login.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{ChatClient, ChatClientConfig, ClientEvent};
pub use error::{ChatError, Result};
pub use server::{ChatServer, Hub};

use crate::protocol::line::DEFAULT_MAX_LINE_LEN;

/// Chat server configuration
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Server listen address
    pub bind_addr: std::net::SocketAddr,
    /// Number of history lines replayed to a freshly authenticated client
    pub history_backfill: usize,
    /// Maximum length of a single incoming line in bytes
    pub max_line_len: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8888".parse().unwrap(),
            history_backfill: 10,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();
        assert_eq!(config.bind_addr.port(), 8888);
        assert!(config.bind_addr.ip().is_loopback());
        assert_eq!(config.history_backfill, 10);
    }
}
