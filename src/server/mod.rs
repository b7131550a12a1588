//! TCP chat server implementation
//!
//! This module provides the listener/accept loop plus the two components it
//! wires together: the shared [`Hub`] (session registry, history, broadcast)
//! and the per-connection [`Session`] state machine.

pub mod hub;
pub mod session;

pub use hub::{Hub, SessionId};
pub use session::{Session, SessionState};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::ChatConfig;
use crate::error::{ChatError, Result};

/// Line-based TCP chat server
pub struct ChatServer {
    config: ChatConfig,
    hub: Arc<Hub>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ChatServer {
    /// Bind the listener for the configured address.
    ///
    /// A bind failure is fatal: it surfaces here, before any connection is
    /// accepted.
    pub async fn bind(config: ChatConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await.map_err(|e| {
            ChatError::startup(format!("Failed to bind {}: {}", config.bind_addr, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ChatError::startup(format!("Failed to read local address: {}", e)))?;

        Ok(Self {
            config,
            hub: Arc::new(Hub::new()),
            listener,
            local_addr,
        })
    }

    /// The address the listener actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle to the shared session registry
    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    /// Accept and handle connections until the task is dropped or aborted.
    ///
    /// Each accepted socket runs in its own spawned task; per-connection
    /// failures are logged and never stop the accept loop.
    pub async fn run(self) -> Result<()> {
        info!("chat server listening on {}", self.local_addr);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("accepted connection from {}", peer);
                    let hub = Arc::clone(&self.hub);
                    let config = self.config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Session::run(hub, stream, config).await {
                            warn!("connection from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => {
                    warn!("accept failed: {}", e);
                }
            }
        }
    }
}
