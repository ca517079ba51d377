//! In-process session storage.
//!
//! Session state stays on the server; the cookie carries only an opaque,
//! encrypted session key. Purging a session deletes its state here, so a
//! copy of the old cookie no longer resolves to a user.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use actix_session::storage::{LoadError, SaveError, SessionKey, SessionStore, UpdateError};
use actix_web::cookie::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

type SessionState = HashMap<String, String>;

struct StoredSession {
    state: SessionState,
    expires_at: Instant,
}

impl StoredSession {
    fn new(state: SessionState, ttl: &Duration) -> Self {
        Self {
            state,
            expires_at: Instant::now() + StdDuration::try_from(*ttl).unwrap_or_default(),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Session store keeping every session in memory.
///
/// Clones share the same map; build one in `main` and hand a clone to each
/// worker. Sessions are lost on restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired sessions.
    async fn sweep(&self) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Removed {} expired sessions", removed);
        }
    }
}

/// Fresh opaque session key: 32 random bytes, hex encoded.
fn generate_session_key() -> Result<SessionKey, anyhow::Error> {
    let random_bytes: [u8; 32] = rand::random();
    SessionKey::try_from(hex::encode(random_bytes)).map_err(anyhow::Error::from)
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, session_key: &SessionKey) -> Result<Option<SessionState>, LoadError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_key.as_ref())
            .filter(|s| !s.is_expired(Instant::now()))
            .map(|s| s.state.clone()))
    }

    async fn save(
        &self,
        session_state: SessionState,
        ttl: &Duration,
    ) -> Result<SessionKey, SaveError> {
        self.sweep().await;

        let session_key = generate_session_key().map_err(SaveError::Other)?;
        self.sessions.write().await.insert(
            session_key.as_ref().to_string(),
            StoredSession::new(session_state, ttl),
        );
        Ok(session_key)
    }

    async fn update(
        &self,
        session_key: SessionKey,
        session_state: SessionState,
        ttl: &Duration,
    ) -> Result<SessionKey, UpdateError> {
        {
            let mut sessions = self.sessions.write().await;
            if let Some(stored) = sessions
                .get_mut(session_key.as_ref())
                .filter(|s| !s.is_expired(Instant::now()))
            {
                *stored = StoredSession::new(session_state, ttl);
                return Ok(session_key);
            }
        }

        // Unknown or expired: never resurrect the old key
        self.save(session_state, ttl).await.map_err(|e| match e {
            SaveError::Serialization(e) => UpdateError::Serialization(e),
            SaveError::Other(e) => UpdateError::Other(e),
        })
    }

    async fn update_ttl(&self, session_key: &SessionKey, ttl: &Duration) -> Result<(), anyhow::Error> {
        if let Some(stored) = self.sessions.write().await.get_mut(session_key.as_ref()) {
            stored.expires_at = Instant::now() + StdDuration::try_from(*ttl).unwrap_or_default();
        }
        Ok(())
    }

    async fn delete(&self, session_key: &SessionKey) -> Result<(), anyhow::Error> {
        self.sessions.write().await.remove(session_key.as_ref());
        Ok(())
    }
}
