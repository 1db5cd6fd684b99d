//! In-memory session store with pluggable eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Role of one transcript turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One role-tagged message in a transcript. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a new turn.
    #[must_use]
    pub fn new(role: Role, content: String) -> Self {
        Self { role, content }
    }
}

/// One ongoing triage conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// Ordered transcript, replayed verbatim to the gateway on every call.
    pub transcript: Vec<Turn>,
    /// Set once a verdict has been extracted; terminal.
    pub finished: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time the session was read or written. Drives idle eviction.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Vec::new(),
            finished: false,
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a turn and refresh the activity timestamp.
    pub fn push(&mut self, turn: Turn) {
        self.transcript.push(turn);
        self.touch();
    }

    /// Mark the session terminal.
    pub fn mark_finished(&mut self) {
        self.finished = true;
        self.touch();
    }

    /// Refresh the activity timestamp.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Eviction policy for the session store.
///
/// `None` on either field disables that bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvictionPolicy {
    /// Sessions idle longer than this are pruned.
    pub idle_ttl: Option<Duration>,
    /// When full, the least recently active session is evicted on create.
    pub max_sessions: Option<usize>,
}

/// Shared handle to one session's state.
///
/// Holding the inner lock across a gateway call serializes concurrent
/// operations on the same session.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

/// Process-wide map from session identifier to session state.
///
/// No persistence; lifecycle is tied to process uptime.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
    policy: EvictionPolicy,
}

impl SessionStore {
    /// Create a store with the given eviction policy.
    #[must_use]
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Create an empty session under a fresh identifier.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn create(&self) -> (Uuid, SessionHandle) {
        self.prune_expired();

        let id = Uuid::new_v4();
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(Session::new(id)));

        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        if let Some(max) = self.policy.max_sessions {
            while sessions.len() >= max {
                let Some(oldest) = least_recently_active(&sessions) else {
                    break;
                };
                sessions.remove(&oldest);
                tracing::debug!(session_id = %oldest, "Evicted session at capacity");
            }
        }
        sessions.insert(id, Arc::clone(&handle));
        (id, handle)
    }

    /// Look up a session by identifier.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .get(&id)
            .map(Arc::clone)
    }

    /// Remove a session. Returns whether it existed.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .remove(&id)
            .is_some()
    }

    /// Number of live sessions.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session store lock poisoned")
            .len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle longer than the configured TTL.
    ///
    /// Sessions currently locked by an in-flight operation are skipped.
    /// Returns the number of sessions pruned.
    ///
    /// # Panics
    ///
    /// Panics if the store lock is poisoned.
    pub fn prune_expired(&self) -> usize {
        let Some(ttl) = self.policy.idle_ttl else {
            return 0;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };

        let now = Utc::now();
        let mut sessions = self.sessions.lock().expect("session store lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(session) => now.signed_duration_since(session.last_activity) <= ttl,
            // In use right now, so not idle.
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned idle sessions");
        }
        pruned
    }

    /// Spawn a background task that prunes idle sessions until cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let store = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        store.prune_expired();
                    }
                }
            }
        })
    }
}

/// Find the session with the oldest activity timestamp, skipping locked ones.
fn least_recently_active(sessions: &HashMap<Uuid, SessionHandle>) -> Option<Uuid> {
    sessions
        .iter()
        .filter_map(|(id, handle)| {
            handle
                .try_lock()
                .ok()
                .map(|session| (*id, session.last_activity))
        })
        .min_by_key(|(_, last_activity)| *last_activity)
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_returns_fresh_ids() {
        let store = SessionStore::new(EvictionPolicy::default());
        let (a, _) = store.create();
        let (b, _) = store.create();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let store = SessionStore::new(EvictionPolicy::default());
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_push_and_finish() {
        let store = SessionStore::new(EvictionPolicy::default());
        let (id, handle) = store.create();

        {
            let mut session = handle.lock().await;
            session.push(Turn::new(Role::System, "prompt".to_string()));
            session.push(Turn::new(Role::User, "query".to_string()));
            session.mark_finished();
        }

        let handle = store.get(id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.transcript.len(), 2);
        assert!(session.finished);
        assert_eq!(session.transcript[0].role, Role::System);
    }

    #[tokio::test]
    async fn test_remove() {
        let store = SessionStore::new(EvictionPolicy::default());
        let (id, _handle) = store.create();
        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_prune_expired_drops_idle_sessions() {
        let store = SessionStore::new(EvictionPolicy {
            idle_ttl: Some(Duration::from_secs(60)),
            max_sessions: None,
        });
        let (stale_id, handle) = store.create();
        let (fresh_id, _fresh) = store.create();

        {
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::seconds(120);
        }

        assert_eq!(store.prune_expired(), 1);
        assert!(store.get(stale_id).is_none());
        assert!(store.get(fresh_id).is_some());
    }

    #[tokio::test]
    async fn test_prune_skips_locked_sessions() {
        let store = SessionStore::new(EvictionPolicy {
            idle_ttl: Some(Duration::from_secs(0)),
            max_sessions: None,
        });
        let (id, handle) = store.create();

        let guard = handle.lock().await;
        assert_eq!(store.prune_expired(), 0);
        drop(guard);
        assert!(store.get(id).is_some());
    }

    #[tokio::test]
    async fn test_no_ttl_means_no_pruning() {
        let store = SessionStore::new(EvictionPolicy::default());
        let (id, handle) = store.create();
        {
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::days(30);
        }
        assert_eq!(store.prune_expired(), 0);
        assert!(store.get(id).is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_active() {
        let store = SessionStore::new(EvictionPolicy {
            idle_ttl: None,
            max_sessions: Some(2),
        });
        let (old_id, old_handle) = store.create();
        let (kept_id, _kept) = store.create();

        {
            let mut session = old_handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::seconds(30);
        }

        let (new_id, _new) = store.create();
        assert_eq!(store.len(), 2);
        assert!(store.get(old_id).is_none());
        assert!(store.get(kept_id).is_some());
        assert!(store.get(new_id).is_some());
    }

    #[tokio::test]
    async fn test_sweeper_prunes_and_stops() {
        let store = Arc::new(SessionStore::new(EvictionPolicy {
            idle_ttl: Some(Duration::from_secs(60)),
            max_sessions: None,
        }));
        let (id, handle) = store.create();
        {
            let mut session = handle.lock().await;
            session.last_activity = Utc::now() - chrono::Duration::seconds(120);
        }
        drop(handle);

        let cancel = CancellationToken::new();
        let task = Arc::clone(&store).spawn_sweeper(Duration::from_millis(10), cancel.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.get(id).is_none());

        cancel.cancel();
        task.await.unwrap();
    }
}
