//! Error handling for the chat server

use std::fmt;

/// Result type alias for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Chat server error types
///
/// Protocol-level rejections (bad first line, duplicate login) are not
/// errors: they are answered in-band over the connection and the session
/// keeps running. These variants cover the failures that actually tear a
/// connection down or prevent the server from starting.
#[derive(Debug, Clone)]
pub enum ChatError {
    /// Listener bind/setup failures; fatal before serving starts
    Startup(String),
    /// Failures establishing or tearing down a connection
    Connection(String),
    /// Read/write I/O errors on an established connection
    Network(String),
    /// Malformed input that cannot be recovered in-band (oversized or
    /// non-UTF-8 line)
    Protocol(String),
    /// Timeout error
    Timeout(String),
}

impl ChatError {
    /// Create a startup error
    pub fn startup<T: Into<String>>(msg: T) -> Self {
        ChatError::Startup(msg.into())
    }

    /// Create a connection error
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        ChatError::Connection(msg.into())
    }

    /// Create a network error
    pub fn network<T: Into<String>>(msg: T) -> Self {
        ChatError::Network(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<T: Into<String>>(msg: T) -> Self {
        ChatError::Protocol(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ChatError::Timeout(msg.into())
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Startup(msg) => write!(f, "Startup error: {}", msg),
            ChatError::Connection(msg) => write!(f, "Connection error: {}", msg),
            ChatError::Network(msg) => write!(f, "Network error: {}", msg),
            ChatError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            ChatError::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Network(format!("IO error: {}", err))
    }
}
