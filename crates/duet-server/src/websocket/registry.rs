//! Live-connection tracking and fan-out snapshots, per session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;
use tracing::debug;

use duet_core::SessionId;

use super::connection::RelayConnection;

/// Concurrency-safe multi-map from session id to its live connections.
///
/// Constructed once at startup and handed to every relay task through the
/// router state; holds no transport or storage handles. A session id is
/// present iff its membership set is non-empty — emptied entries are
/// removed, never left behind.
pub struct SessionRegistry {
    /// Live connections grouped by session.
    sessions: RwLock<HashMap<SessionId, Vec<Arc<RelayConnection>>>>,
    /// Atomic counter tracking total connections (avoids read-locking for
    /// count queries).
    active_count: AtomicUsize,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Add a connection to its session's membership set, creating the set
    /// if absent. Membership size is not capped.
    pub async fn join(&self, connection: Arc<RelayConnection>) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(connection.session_id().clone())
            .or_default()
            .push(connection);
        let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove a connection from its session's membership set.
    ///
    /// Idempotent — removing an absent connection is a no-op. Drops the
    /// session entry entirely when the set empties.
    pub async fn leave(&self, session_id: &SessionId, connection_id: &str) {
        let mut sessions = self.sessions.write().await;
        let Some(members) = sessions.get_mut(session_id) else {
            return;
        };
        let before = members.len();
        members.retain(|c| c.id != connection_id);
        let removed = before - members.len();
        if members.is_empty() {
            let _ = sessions.remove(session_id);
            debug!(session_id = %session_id, "session emptied, entry removed");
        }
        if removed > 0 {
            let _ = self.active_count.fetch_sub(removed, Ordering::Relaxed);
        }
    }

    /// Point-in-time snapshot of the session's connections other than
    /// `exclude`. Callers iterate the snapshot, never the live set.
    pub async fn broadcast_targets(
        &self,
        session_id: &SessionId,
        exclude: &str,
    ) -> Vec<Arc<RelayConnection>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|members| {
                members
                    .iter()
                    .filter(|c| c.id != exclude)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of active connections across all sessions.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Number of sessions with at least one live connection.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether a session currently has any members.
    pub async fn contains_session(&self, session_id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::Outbound;
    use tokio::sync::mpsc;

    fn session(a: &str, b: &str) -> SessionId {
        SessionId::for_pair(&a.into(), &b.into()).unwrap()
    }

    fn make_connection(
        id: &str,
        session_id: &SessionId,
    ) -> (Arc<RelayConnection>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = RelayConnection::new(
            id.to_string(),
            "alice".into(),
            session_id.clone(),
            tx,
        );
        (Arc::new(conn), rx)
    }

    #[tokio::test]
    async fn join_adds_connection() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (conn, _rx) = make_connection("c1", &sid);
        registry.join(conn).await;
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.contains_session(&sid).await);
    }

    #[tokio::test]
    async fn leave_removes_connection_and_empty_session() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (conn, _rx) = make_connection("c1", &sid);
        registry.join(conn).await;

        registry.leave(&sid, "c1").await;
        assert_eq!(registry.connection_count(), 0);
        assert!(!registry.contains_session(&sid).await);
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn leave_keeps_session_with_remaining_members() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (c1, _rx1) = make_connection("c1", &sid);
        let (c2, _rx2) = make_connection("c2", &sid);
        registry.join(c1).await;
        registry.join(c2).await;

        registry.leave(&sid, "c1").await;
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.contains_session(&sid).await);
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (conn, _rx) = make_connection("c1", &sid);
        registry.join(conn).await;

        registry.leave(&sid, "c1").await;
        registry.leave(&sid, "c1").await;
        registry.leave(&sid, "never_joined").await;
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_targets_excludes_sender() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (c1, _rx1) = make_connection("c1", &sid);
        let (c2, _rx2) = make_connection("c2", &sid);
        let (c3, _rx3) = make_connection("c3", &sid);
        registry.join(c1).await;
        registry.join(c2).await;
        registry.join(c3).await;

        let targets = registry.broadcast_targets(&sid, "c1").await;
        let ids: Vec<_> = targets.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"c2"));
        assert!(ids.contains(&"c3"));
    }

    #[tokio::test]
    async fn broadcast_targets_scoped_to_session() {
        let registry = SessionRegistry::new();
        let ab = session("alice", "bob");
        let cd = session("carol", "dave");
        let (c1, _rx1) = make_connection("c1", &ab);
        let (c2, _rx2) = make_connection("c2", &cd);
        registry.join(c1).await;
        registry.join(c2).await;

        let targets = registry.broadcast_targets(&ab, "none").await;
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, "c1");
    }

    #[tokio::test]
    async fn broadcast_targets_empty_session() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        assert!(registry.broadcast_targets(&sid, "c1").await.is_empty());
    }

    #[tokio::test]
    async fn membership_uncapped() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let mut rxs = Vec::new();
        for i in 0..5 {
            let (conn, rx) = make_connection(&format!("c{i}"), &sid);
            registry.join(conn).await;
            rxs.push(rx);
        }
        assert_eq!(registry.connection_count(), 5);
        assert_eq!(registry.broadcast_targets(&sid, "c0").await.len(), 4);
    }

    #[tokio::test]
    async fn present_iff_nonempty_under_interleaving() {
        let registry = SessionRegistry::new();
        let sid = session("alice", "bob");
        let (c1, _rx1) = make_connection("c1", &sid);
        let (c2, _rx2) = make_connection("c2", &sid);

        registry.join(c1).await;
        registry.join(c2).await;
        registry.leave(&sid, "c1").await;
        assert!(registry.contains_session(&sid).await);

        registry.leave(&sid, "c2").await;
        assert!(!registry.contains_session(&sid).await);

        let (c3, _rx3) = make_connection("c3", &sid);
        registry.join(c3).await;
        assert!(registry.contains_session(&sid).await);
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_join_leave_consistent() {
        let registry = Arc::new(SessionRegistry::new());
        let sid = session("alice", "bob");

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            let sid = sid.clone();
            handles.push(tokio::spawn(async move {
                let (conn, _rx) = {
                    let (tx, rx) = mpsc::channel(4);
                    (
                        Arc::new(RelayConnection::new(
                            format!("c{i}"),
                            "alice".into(),
                            sid.clone(),
                            tx,
                        )),
                        rx,
                    )
                };
                registry.join(conn).await;
                registry.leave(&sid, &format!("c{i}")).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.connection_count(), 0);
        assert!(!registry.contains_session(&sid).await);
    }
}
