use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};

use crate::session::EditSession;
use crate::session_store::SessionStore;

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    // Sessions are stored as serialized JSON; generation and touch time are
    // duplicated into columns so eviction can filter without parsing
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS edit_sessions (
            user_id BIGINT PRIMARY KEY,
            session TEXT NOT NULL,
            generation BIGINT NOT NULL,
            touched_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create edit_sessions table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS edit_sessions_touched_at_idx ON edit_sessions (touched_at)",
    )
    .execute(pool)
    .await
    .context("Failed to create touched_at index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// PostgreSQL-backed session store
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        init_database_schema(&pool).await?;
        Ok(Self::new(pool))
    }
}

fn decode_session(raw: &str) -> Result<EditSession> {
    serde_json::from_str(raw).context("Failed to decode stored session")
}

impl SessionStore for PgSessionStore {
    async fn get(&self, user_id: i64) -> Result<Option<EditSession>> {
        debug!(user_id, "Loading session");

        let row = sqlx::query("SELECT session FROM edit_sessions WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read session")?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("session")?;
                Ok(Some(decode_session(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, user_id: i64, session: EditSession) -> Result<()> {
        debug!(user_id, generation = session.generation, "Saving session");

        let raw = serde_json::to_string(&session).context("Failed to encode session")?;
        sqlx::query(
            "INSERT INTO edit_sessions (user_id, session, generation, touched_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE
             SET session = EXCLUDED.session,
                 generation = EXCLUDED.generation,
                 touched_at = EXCLUDED.touched_at",
        )
        .bind(user_id)
        .bind(raw)
        .bind(session.generation as i64)
        .bind(session.touched_at)
        .execute(&self.pool)
        .await
        .context("Failed to save session")?;

        Ok(())
    }

    async fn remove(&self, user_id: i64) -> Result<Option<EditSession>> {
        debug!(user_id, "Removing session");

        let row = sqlx::query("DELETE FROM edit_sessions WHERE user_id = $1 RETURNING session")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to delete session")?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("session")?;
                Ok(Some(decode_session(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn evict_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<EditSession>> {
        let rows = sqlx::query("DELETE FROM edit_sessions WHERE touched_at < $1 RETURNING session")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .context("Failed to evict idle sessions")?;

        let mut evicted = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("session")?;
            evicted.push(decode_session(&raw)?);
        }

        info!(count = evicted.len(), "Evicted idle sessions");
        Ok(evicted)
    }
}
