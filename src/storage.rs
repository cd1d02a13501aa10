use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{PersistedState, StoredValues, keys};
use crate::utils::error::Result;

/// Key-value storage with batch reads and merge-writes. Nothing is ever
/// deleted; a write overwrites only the keys it names.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the subset of `keys` that have a stored value.
    async fn get(&self, keys: &[&str]) -> Result<StoredValues>;
    async fn set(&self, values: StoredValues) -> Result<()>;
}

/// Reads every key the watcher uses and assembles the state.
pub async fn load_state(store: &dyn KeyValueStore) -> Result<PersistedState> {
    let values = store.get(&keys::ALL).await?;
    Ok(PersistedState::from_values(&values))
}

/// SQLite-backed store: one row per key holding JSON text.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        if let Some(parent) = options.clone().get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // A single connection keeps `sqlite::memory:` a single database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<StoredValues> {
        let mut values = HashMap::with_capacity(keys.len());

        for key in keys {
            let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
                .bind(*key)
                .fetch_optional(&self.pool)
                .await?;

            if let Some((raw,)) = row {
                values.insert(key.to_string(), serde_json::from_str(&raw)?);
            }
        }

        Ok(values)
    }

    async fn set(&self, values: StoredValues) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (key, value) in &values {
            sqlx::query(
                "INSERT INTO kv (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(serde_json::to_string(value)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Stored keys: {:?}", values.keys().collect::<Vec<_>>());
        Ok(())
    }
}

/// In-process store; nothing outlives the process.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<StoredValues>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: StoredValues) -> Self {
        Self {
            values: Arc::new(RwLock::new(values)),
        }
    }

    pub async fn snapshot(&self) -> StoredValues {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<StoredValues> {
        let values = self.values.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: StoredValues) -> Result<()> {
        self.values.write().await.extend(values);
        Ok(())
    }
}
