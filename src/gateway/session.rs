//! Per-client session records keyed by an opaque session identifier.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use secrecy::SecretString;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::{sync::Mutex, time::Instant};

const SESSION_ID_BYTES: usize = 32;
const MAX_SESSION_ID_LEN: usize = 128;

/// Identifier handed to a client; the only key into the store.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(Base64UrlUnpadded::encode_string(&bytes))
    }

    /// Accept an identifier presented by a client (cookie value).
    #[must_use]
    pub fn from_client(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value.len() > MAX_SESSION_ID_LEN {
            return None;
        }
        Some(Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Enough to correlate log lines without leaking the cookie.
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}…)")
    }
}

/// Authority-issued token plus the user record returned with it.
#[derive(Clone, Debug)]
pub struct Session {
    pub token: SecretString,
    pub user: Value,
}

struct SessionEntry {
    session: Session,
    created_at: Instant,
    logging_out: bool,
}

impl SessionEntry {
    fn is_live(&self, ttl: Option<Duration>) -> bool {
        ttl.is_none_or(|ttl| self.created_at.elapsed() < ttl)
    }
}

/// In-memory session store partitioned by [`SessionId`].
///
/// With a TTL set, expired entries are evicted lazily on access and in bulk
/// by [`SessionStore::purge_expired`]. Without one, entries live until logout.
pub struct SessionStore {
    ttl: Option<Duration>,
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Store a session under a new identifier.
    pub async fn insert(&self, session: Session) -> SessionId {
        let id = SessionId::generate();
        self.sessions.lock().await.insert(
            id.clone(),
            SessionEntry {
                session,
                created_at: Instant::now(),
                logging_out: false,
            },
        );
        id
    }

    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        if sessions.get(id)?.is_live(self.ttl) {
            sessions.get(id).map(|entry| entry.session.clone())
        } else {
            sessions.remove(id);
            None
        }
    }

    pub async fn remove(&self, id: &SessionId) -> Option<Session> {
        self.sessions
            .lock()
            .await
            .remove(id)
            .map(|entry| entry.session)
    }

    /// Claim a live session for teardown.
    ///
    /// Returns `None` when there is no live session or another logout already
    /// holds the claim. The session stays readable until
    /// [`SessionStore::remove`]; [`SessionStore::release`] drops the claim.
    pub async fn begin_logout(&self, id: &SessionId) -> Option<Session> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(id)?;
        if !entry.is_live(self.ttl) {
            sessions.remove(id);
            return None;
        }
        if entry.logging_out {
            return None;
        }
        entry.logging_out = true;
        Some(entry.session.clone())
    }

    /// Drop a teardown claim after a failed logout.
    pub async fn release(&self, id: &SessionId) {
        if let Some(entry) = self.sessions.lock().await.get_mut(id) {
            entry.logging_out = false;
        }
    }

    pub async fn is_authenticated(&self, id: &SessionId) -> bool {
        self.get(id).await.is_some()
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live(Some(ttl)));
        before - sessions.len()
    }

    /// Number of stored entries, expired ones included until evicted.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn session(token: &str) -> Session {
        Session {
            token: SecretString::from(token.to_string()),
            user: json!({"id": 1}),
        }
    }

    #[test]
    fn generated_ids_are_unique_and_url_safe() {
        let first = SessionId::generate();
        let second = SessionId::generate();
        assert_ne!(first, second);
        assert_eq!(first.as_str().len(), 43);
        assert!(
            first
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn client_ids_reject_empty_and_oversized_values() {
        assert!(SessionId::from_client("").is_none());
        assert!(SessionId::from_client("   ").is_none());
        assert!(SessionId::from_client(&"a".repeat(129)).is_none());
        assert_eq!(
            SessionId::from_client(" abc ").map(|id| id.as_str().to_string()),
            Some("abc".to_string())
        );
    }

    #[test]
    fn debug_does_not_print_full_id() {
        let id = SessionId::generate();
        let rendered = format!("{id:?}");
        assert!(!rendered.contains(id.as_str()));
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = SessionStore::new(None);
        let id = store.insert(session("T")).await;

        let stored = store.get(&id).await;
        assert_eq!(
            stored.as_ref().map(|s| s.token.expose_secret().to_string()),
            Some("T".to_string())
        );
        assert!(store.is_authenticated(&id).await);

        assert!(store.remove(&id).await.is_some());
        assert!(!store.is_authenticated(&id).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn sessions_are_partitioned_by_id() {
        let store = SessionStore::new(None);
        let alice = store.insert(session("alice-token")).await;
        let bob = store.insert(session("bob-token")).await;

        store.remove(&alice).await;

        assert!(!store.is_authenticated(&alice).await);
        assert_eq!(
            store
                .get(&bob)
                .await
                .map(|s| s.token.expose_secret().to_string()),
            Some("bob-token".to_string())
        );
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let store = SessionStore::new(Some(Duration::ZERO));
        let id = store.insert(session("T")).await;
        assert_eq!(store.len().await, 1);

        assert!(store.get(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = SessionStore::new(Some(Duration::ZERO));
        store.insert(session("A")).await;
        store.insert(session("B")).await;
        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty().await);

        let store = SessionStore::new(None);
        store.insert(session("A")).await;
        assert_eq!(store.purge_expired().await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn logout_claim_is_exclusive_until_released() {
        let store = SessionStore::new(None);
        let id = store.insert(session("T")).await;

        assert!(store.begin_logout(&id).await.is_some());
        assert!(store.begin_logout(&id).await.is_none());
        // Still signed in while the claim is held.
        assert!(store.is_authenticated(&id).await);

        store.release(&id).await;
        assert!(store.begin_logout(&id).await.is_some());

        store.remove(&id).await;
        assert!(store.begin_logout(&id).await.is_none());
    }

    #[tokio::test]
    async fn expired_session_cannot_be_claimed() {
        let store = SessionStore::new(Some(Duration::ZERO));
        let id = store.insert(session("T")).await;
        assert!(store.begin_logout(&id).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_id_is_anonymous() {
        let store = SessionStore::new(None);
        let Some(id) = SessionId::from_client("never-issued") else {
            panic!("expected a client id");
        };
        assert!(store.get(&id).await.is_none());
    }
}
