//! Session registry and broadcast mediator
//!
//! The [`Hub`] owns the two pieces of shared state in the system: the set of
//! active sessions and the append-only message history. All mutation funnels
//! through its methods, guarded by a single lock, so a login-uniqueness check
//! and the registration it authorizes are one atomic step, and every
//! broadcast is appended to history and fanned out as one critical section.

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};

use crate::protocol::messages::render_message;

/// Identifier for a registered session, unique for the hub's lifetime
pub type SessionId = u64;

/// Registry entry for one connected session
#[derive(Debug)]
struct SessionEntry {
    id: SessionId,
    /// Set at most once by [`Hub::claim_login`]; unique among set logins
    login: Option<String>,
    /// Fire-and-forget write path into the session's socket writer task
    outbound: mpsc::UnboundedSender<String>,
}

#[derive(Debug, Default)]
struct HubInner {
    /// Active sessions in registration order (broadcast iteration order)
    sessions: Vec<SessionEntry>,
    /// Rendered broadcast lines, append-only
    history: Vec<String>,
    next_id: SessionId,
}

/// Shared registry of active sessions plus message history
#[derive(Debug, Default)]
pub struct Hub {
    inner: RwLock<HubInner>,
}

impl Hub {
    /// Create a new, empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session's outbound channel, returning its id.
    /// The session starts without a login and receives no broadcasts yet.
    pub async fn register(&self, outbound: mpsc::UnboundedSender<String>) -> SessionId {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;
        inner.sessions.push(SessionEntry {
            id,
            login: None,
            outbound,
        });
        debug!("session {} registered ({} active)", id, inner.sessions.len());
        id
    }

    /// Remove a session from the registry, returning its login if it had
    /// one. Idempotent: unknown ids are a no-op returning `None`.
    pub async fn unregister(&self, id: SessionId) -> Option<String> {
        let mut inner = self.inner.write().await;
        let pos = inner.sessions.iter().position(|entry| entry.id == id)?;
        let entry = inner.sessions.remove(pos);
        debug!(
            "session {} unregistered ({} active)",
            id,
            inner.sessions.len()
        );
        entry.login
    }

    /// Check whether some registered session already holds this login
    pub async fn is_login_taken(&self, candidate: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .sessions
            .iter()
            .any(|entry| entry.login.as_deref() == Some(candidate))
    }

    /// Atomically claim a login for a session.
    ///
    /// Returns `true` and sets the entry's login if no other session holds
    /// it; returns `false` without mutating anything if the login is taken
    /// or the id is not registered. Two concurrent claims of the same name
    /// cannot both succeed: the check and the set happen under one lock.
    pub async fn claim_login(&self, id: SessionId, candidate: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner
            .sessions
            .iter()
            .any(|entry| entry.login.as_deref() == Some(candidate))
        {
            return false;
        }
        match inner.sessions.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.login = Some(candidate.to_string());
                true
            }
            None => false,
        }
    }

    /// Broadcast a message to every authenticated session.
    ///
    /// The rendered line is appended to history and delivered to sessions
    /// in registration order, all under one lock acquisition, so delivery
    /// order always matches history order. A session whose outbound channel
    /// is gone is skipped; one dead peer never aborts the fan-out.
    pub async fn broadcast(&self, label: &str, content: &str) {
        let line = render_message(label, content);
        let mut inner = self.inner.write().await;
        inner.history.push(line.clone());
        info!("{}", line.trim_end_matches('\n'));

        for entry in inner.sessions.iter().filter(|e| e.login.is_some()) {
            if entry.outbound.send(line.clone()).is_err() {
                debug!("session {}: dropping broadcast, connection gone", entry.id);
            }
        }
    }

    /// Last `n` history entries, oldest-first; `n == 0` returns everything
    pub async fn history_tail(&self, n: usize) -> Vec<String> {
        let inner = self.inner.read().await;
        let len = inner.history.len();
        let start = if n == 0 { 0 } else { len.saturating_sub(n) };
        inner.history[start..].to_vec()
    }

    /// Total number of broadcasts so far
    pub async fn history_len(&self) -> usize {
        self.inner.read().await.history.len()
    }

    /// Number of registered sessions (authenticated or not)
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}
