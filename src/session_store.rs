//! Session persistence seam
//!
//! The controller only sees the `SessionStore` trait. Two backends ship: an
//! in-process map and PostgreSQL (see `db`). `SessionBackend` picks one at runtime.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

use crate::db::PgSessionStore;
use crate::session::EditSession;

/// Keyed get/put of edit sessions
///
/// Implementations must be safe to call concurrently for different user ids.
pub trait SessionStore: Send + Sync {
    fn get(&self, user_id: i64) -> impl Future<Output = Result<Option<EditSession>>> + Send;

    fn put(&self, user_id: i64, session: EditSession) -> impl Future<Output = Result<()>> + Send;

    fn remove(&self, user_id: i64) -> impl Future<Output = Result<Option<EditSession>>> + Send;

    /// Remove every session not touched since `cutoff`, returning the removed sessions
    fn evict_idle(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<EditSession>>> + Send;
}

/// Thread-safe in-memory session map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<i64, EditSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<EditSession>> {
        Ok(self.sessions.read().await.get(&user_id).cloned())
    }

    async fn put(&self, user_id: i64, session: EditSession) -> Result<()> {
        self.sessions.write().await.insert(user_id, session);
        Ok(())
    }

    async fn remove(&self, user_id: i64) -> Result<Option<EditSession>> {
        Ok(self.sessions.write().await.remove(&user_id))
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<EditSession>> {
        let mut sessions = self.sessions.write().await;
        let idle: Vec<i64> = sessions
            .iter()
            .filter(|(_, s)| s.touched_at < cutoff)
            .map(|(id, _)| *id)
            .collect();
        Ok(idle.into_iter().filter_map(|id| sessions.remove(&id)).collect())
    }
}

/// Store chosen from configuration at startup
pub enum SessionBackend {
    Memory(InMemorySessionStore),
    Postgres(PgSessionStore),
}

impl SessionBackend {
    pub fn name(&self) -> &'static str {
        match self {
            SessionBackend::Memory(_) => "memory",
            SessionBackend::Postgres(_) => "postgres",
        }
    }
}

impl SessionStore for SessionBackend {
    async fn get(&self, user_id: i64) -> Result<Option<EditSession>> {
        match self {
            SessionBackend::Memory(store) => store.get(user_id).await,
            SessionBackend::Postgres(store) => store.get(user_id).await,
        }
    }

    async fn put(&self, user_id: i64, session: EditSession) -> Result<()> {
        match self {
            SessionBackend::Memory(store) => store.put(user_id, session).await,
            SessionBackend::Postgres(store) => store.put(user_id, session).await,
        }
    }

    async fn remove(&self, user_id: i64) -> Result<Option<EditSession>> {
        match self {
            SessionBackend::Memory(store) => store.remove(user_id).await,
            SessionBackend::Postgres(store) => store.remove(user_id).await,
        }
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<EditSession>> {
        match self {
            SessionBackend::Memory(store) => store.evict_idle(cutoff).await,
            SessionBackend::Postgres(store) => store.evict_idle(cutoff).await,
        }
    }
}
