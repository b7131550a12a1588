//! Per-connection session state machine
//!
//! Each accepted socket is driven by one [`Session::run`] task. The session
//! registers itself with the [`Hub`], greets the peer, then decodes incoming
//! bytes into lines and interprets them according to its state: before
//! authentication only `login:<name>` attempts are meaningful, afterwards
//! every line is chat content broadcast under the session's login.
//!
//! All outgoing writes go through an unbounded channel drained by a
//! dedicated writer task, so handling one peer's input never blocks on
//! another peer's socket.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ChatConfig;
use crate::error::{ChatError, Result};
use crate::protocol::line::LineCodec;
use crate::protocol::messages::{
    DISCONNECT_HINT, INVALID_LOGIN_LINE, LOGIN_PREFIX, SERVER_LABEL, WELCOME_LINE,
    connected_content, left_content, render_hello, render_login_taken,
};
use crate::server::hub::{Hub, SessionId};

/// Authentication state of a session
///
/// A session starts unauthenticated and transitions at most once. There is
/// no stored `Closed` state: closing a connection ends the session task and
/// removes the registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated { login: String },
}

/// Server-side state for one connected client
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    hub: Arc<Hub>,
    outbound: mpsc::UnboundedSender<String>,
    state: SessionState,
    /// Number of history lines replayed on successful login
    backfill: usize,
}

impl Session {
    /// Drive a freshly accepted connection until it closes.
    ///
    /// Registers with the hub, sends the greeting, then processes lines
    /// until the peer disconnects or an unrecoverable read/decode error
    /// occurs. On exit the session is deregistered and, if it was
    /// authenticated, its departure is broadcast to the remaining
    /// participants.
    pub async fn run(hub: Arc<Hub>, stream: TcpStream, config: ChatConfig) -> Result<()> {
        let peer = stream
            .peer_addr()
            .map_err(|e| ChatError::connection(format!("No peer address: {}", e)))?;
        let (read, write) = stream.into_split();

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let id = hub.register(outbound.clone()).await;

        let mut session = Session {
            id,
            hub: Arc::clone(&hub),
            outbound,
            state: SessionState::Unauthenticated,
            backfill: config.history_backfill,
        };

        info!("session {} connected from {}", id, peer);
        session.send(WELCOME_LINE);

        let mut writer = tokio::spawn(write_loop(write, outbound_rx));

        // The writer branch fires when the socket's write side fails; that
        // tears the session down the same as a read error would.
        let result = tokio::select! {
            result = session.read_loop(read, config.max_line_len) => result,
            _ = &mut writer => Ok(()),
        };

        drop(session);
        match hub.unregister(id).await {
            Some(login) => {
                info!("{} >  connection lost", login);
                hub.broadcast(SERVER_LABEL, &left_content(&login)).await;
            }
            None => debug!("session {} closed before login", id),
        }
        writer.abort();

        if let Err(ref e) = result {
            debug!("session {} from {} ended with error: {}", id, peer, e);
        }
        result
    }

    /// Read socket bytes and process each decoded line in arrival order
    async fn read_loop(&mut self, mut read: OwnedReadHalf, max_line_len: usize) -> Result<()> {
        let mut codec = LineCodec::with_max_len(max_line_len);
        let mut buf = vec![0u8; 4096];

        loop {
            let n = read
                .read(&mut buf)
                .await
                .map_err(|e| ChatError::network(format!("Read error: {}", e)))?;
            if n == 0 {
                return Ok(());
            }

            codec.feed(&buf[..n]);
            while let Some(line) = codec.decode_next()? {
                self.handle_line(line).await;
            }
        }
    }

    /// Interpret one decoded line according to the current state
    async fn handle_line(&mut self, line: String) {
        match &self.state {
            SessionState::Authenticated { login } => {
                let login = login.clone();
                self.hub.broadcast(&login, &line).await;
            }
            SessionState::Unauthenticated => match line.strip_prefix(LOGIN_PREFIX) {
                Some(rest) => self.handle_login_attempt(rest.trim()).await,
                None => {
                    debug!("session {}: rejected pre-login line: {}", self.id, line);
                    self.send(INVALID_LOGIN_LINE);
                }
            },
        }
    }

    /// Process a `login:` attempt while unauthenticated
    async fn handle_login_attempt(&mut self, candidate: &str) {
        if self.hub.claim_login(self.id, candidate).await {
            // History snapshot is taken before the connected-broadcast, so
            // the backfill never contains this session's own announcement.
            let backfill = self.hub.history_tail(self.backfill).await.concat();
            if !backfill.is_empty() {
                self.send(&backfill);
            }
            self.hub
                .broadcast(SERVER_LABEL, &connected_content(candidate))
                .await;
            self.send(&render_hello(candidate));

            info!("session {}: logged in as {}", self.id, candidate);
            self.state = SessionState::Authenticated {
                login: candidate.to_string(),
            };
        } else {
            debug!("session {}: login {} already taken", self.id, candidate);
            self.send(&render_login_taken(candidate));
            // Hint for interactive clients; the connection stays open so the
            // peer can retry with a different name.
            self.send(DISCONNECT_HINT);
        }
    }

    /// Queue text for the writer task; never blocks.
    /// A closed channel means the writer is gone and the connection is
    /// already tearing down, so the failure is only logged.
    fn send(&self, text: &str) {
        if self.outbound.send(text.to_string()).is_err() {
            debug!("session {}: outbound channel closed", self.id);
        }
    }
}

/// Drain queued writes into the socket until the channel closes or a write
/// fails. Exiting on failure lets the session task observe it via select.
async fn write_loop(mut write: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(text) = rx.recv().await {
        if let Err(e) = write.write_all(text.as_bytes()).await {
            debug!("write failed: {}", e);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a session wired straight to channels, skipping the socket
    fn test_session(
        hub: &Arc<Hub>,
        id: SessionId,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Session {
        Session {
            id,
            hub: Arc::clone(hub),
            outbound,
            state: SessionState::Unauthenticated,
            backfill: 10,
        }
    }

    async fn attach(hub: &Arc<Hub>) -> (Session, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = hub.register(tx.clone()).await;
        (test_session(hub, id, tx), rx)
    }

    #[tokio::test]
    async fn test_non_login_line_rejected() {
        let hub = Arc::new(Hub::new());
        let (mut session, mut rx) = attach(&hub).await;

        session.handle_line("hello?".to_string()).await;

        assert_eq!(rx.try_recv().unwrap(), INVALID_LOGIN_LINE);
        assert_eq!(session.state, SessionState::Unauthenticated);
        assert_eq!(hub.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_login_success_sequence() {
        let hub = Arc::new(Hub::new());
        let (mut session, mut rx) = attach(&hub).await;

        session.handle_line("login:alice".to_string()).await;

        // Empty history: no backfill write, then own connected-broadcast,
        // then the hello line.
        assert_eq!(
            rx.try_recv().unwrap(),
            "SERVER >  User alice - connected to chat!\n"
        );
        assert_eq!(rx.try_recv().unwrap(), "Hello alice!\n");
        assert!(rx.try_recv().is_err());

        assert_eq!(
            session.state,
            SessionState::Authenticated {
                login: "alice".to_string()
            }
        );
        assert!(hub.is_login_taken("alice").await);
    }

    #[tokio::test]
    async fn test_login_trims_whitespace() {
        let hub = Arc::new(Hub::new());
        let (mut session, mut rx) = attach(&hub).await;

        session.handle_line("login:  alice \t".to_string()).await;

        assert_eq!(
            rx.try_recv().unwrap(),
            "SERVER >  User alice - connected to chat!\n"
        );
        assert!(hub.is_login_taken("alice").await);
    }

    #[tokio::test]
    async fn test_duplicate_login_rejected_then_retry() {
        let hub = Arc::new(Hub::new());
        let (mut first, _first_rx) = attach(&hub).await;
        first.handle_line("login:alice".to_string()).await;

        let (mut second, mut rx) = attach(&hub).await;
        second.handle_line("login:alice".to_string()).await;

        // Nothing precedes the rejection: the session was never
        // authenticated, so it saw no broadcasts.
        assert_eq!(
            rx.try_recv().unwrap(),
            "Invalid login. alice already using!\n"
        );
        assert_eq!(rx.try_recv().unwrap(), DISCONNECT_HINT);
        assert_eq!(second.state, SessionState::Unauthenticated);

        // Same connection may retry with a free name
        second.handle_line("login:bob".to_string()).await;
        let backfill = rx.try_recv().unwrap();
        assert_eq!(backfill, "SERVER >  User alice - connected to chat!\n");
        assert_eq!(
            rx.try_recv().unwrap(),
            "SERVER >  User bob - connected to chat!\n"
        );
        assert_eq!(rx.try_recv().unwrap(), "Hello bob!\n");
        assert_eq!(
            second.state,
            SessionState::Authenticated {
                login: "bob".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_authenticated_line_broadcasts() {
        let hub = Arc::new(Hub::new());
        let (mut alice, mut alice_rx) = attach(&hub).await;
        let (mut bob, mut bob_rx) = attach(&hub).await;

        alice.handle_line("login:alice".to_string()).await;
        bob.handle_line("login:bob".to_string()).await;
        while alice_rx.try_recv().is_ok() {}
        while bob_rx.try_recv().is_ok() {}

        alice.handle_line("hi".to_string()).await;

        // Everyone authenticated receives it, sender included
        assert_eq!(alice_rx.try_recv().unwrap(), "alice >  hi\n");
        assert_eq!(bob_rx.try_recv().unwrap(), "alice >  hi\n");
        assert_eq!(hub.history_tail(0).await.last().unwrap(), "alice >  hi\n");
    }

    #[tokio::test]
    async fn test_backfill_is_last_ten_oldest_first() {
        let hub = Arc::new(Hub::new());
        for i in 0..12 {
            hub.broadcast("old", &format!("msg {}", i)).await;
        }

        let (mut session, mut rx) = attach(&hub).await;
        session.handle_line("login:alice".to_string()).await;

        // One concatenated write holding exactly the last 10 lines
        let backfill = rx.try_recv().unwrap();
        let lines: Vec<&str> = backfill.split_inclusive('\n').collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "old >  msg 2\n");
        assert_eq!(lines[9], "old >  msg 11\n");

        assert_eq!(
            rx.try_recv().unwrap(),
            "SERVER >  User alice - connected to chat!\n"
        );
        assert_eq!(rx.try_recv().unwrap(), "Hello alice!\n");
    }

    #[tokio::test]
    async fn test_unauthenticated_never_receives_broadcasts() {
        let hub = Arc::new(Hub::new());
        let (mut alice, _alice_rx) = attach(&hub).await;
        let (_anon, mut anon_rx) = attach(&hub).await;

        alice.handle_line("login:alice".to_string()).await;
        alice.handle_line("anyone?".to_string()).await;

        assert!(anon_rx.try_recv().is_err());
    }
}
