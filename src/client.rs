//! Line-protocol chat client
//!
//! This module provides a client for connecting to the chat server,
//! registering a login, and receiving broadcast lines as they arrive. It is
//! the counterpart the integration tests drive, and doubles as a library
//! surface for embedding.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ChatError, Result};
use crate::protocol::line::LineCodec;
use crate::protocol::messages::LOGIN_PREFIX;

/// Chat client configuration
#[derive(Clone, Debug)]
pub struct ChatClientConfig {
    /// Server address to connect to
    pub server_addr: std::net::SocketAddr,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8888".parse().unwrap(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Events that the client can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// One decoded line from the server, delimiter stripped
    Line(String),
    /// The server closed the connection or reading failed
    Disconnected,
}

/// Line-protocol chat client
///
/// Dropping the client closes the write side of the connection, which the
/// server treats as a disconnect.
pub struct ChatClient {
    writer: OwnedWriteHalf,
}

impl ChatClient {
    /// Connect to the chat server.
    ///
    /// Returns the client plus the receiver on which every server line is
    /// delivered as a [`ClientEvent`].
    pub async fn connect(
        config: ChatClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>)> {
        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(config.server_addr),
        )
        .await
        .map_err(|_| ChatError::timeout("Connection timeout"))?
        .map_err(|e| ChatError::connection(format!("Failed to connect: {}", e)))?;

        let (read, writer) = stream.into_split();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(read, event_tx));

        Ok((Self { writer }, event_rx))
    }

    /// Send a registration attempt for the given login name
    pub async fn login(&mut self, name: &str) -> Result<()> {
        self.send_raw(&format!("{}{}\n", LOGIN_PREFIX, name)).await
    }

    /// Send one chat line (the newline is appended here)
    pub async fn send_line(&mut self, text: &str) -> Result<()> {
        self.send_raw(&format!("{}\n", text)).await
    }

    /// Write bytes to the server exactly as given, no framing added
    pub async fn send_raw(&mut self, data: &str) -> Result<()> {
        self.writer
            .write_all(data.as_bytes())
            .await
            .map_err(|e| ChatError::network(format!("Write error: {}", e)))
    }
}

/// Decode server bytes into lines and forward them until the connection or
/// the event receiver goes away
async fn read_loop(mut read: OwnedReadHalf, tx: mpsc::UnboundedSender<ClientEvent>) {
    let mut codec = LineCodec::new();
    let mut buf = vec![0u8; 4096];

    loop {
        match read.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                codec.feed(&buf[..n]);
                loop {
                    match codec.decode_next() {
                        Ok(Some(line)) => {
                            if tx.send(ClientEvent::Line(line)).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            debug!("client decode error: {}", e);
                            let _ = tx.send(ClientEvent::Disconnected);
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                debug!("client read error: {}", e);
                break;
            }
        }
    }

    let _ = tx.send(ClientEvent::Disconnected);
}
