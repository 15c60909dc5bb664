// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage-facing traits.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use herald_config::model::StorageConfig;
use herald_core::{
    AdapterType, AudienceResolver, AudienceTag, BroadcastRecord, DeadRecipientSink, HealthStatus,
    HeraldError, PluginAdapter, RecipientId, RunJournal, Stats, StorageAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database.
    pub fn from_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::from(db),
        }
    }

    /// The open database, or an error before [`StorageAdapter::initialize`].
    pub fn db(&self) -> Result<&Database, HeraldError> {
        self.db.get().ok_or_else(|| HeraldError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Resolve an audience as of `now_ms` (epoch milliseconds).
    pub async fn resolve_at(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
        now_ms: i64,
    ) -> Result<HashSet<RecipientId>, HeraldError> {
        queries::audience::resolve_at(self.db()?, audience, cluster_name, now_ms).await
    }

    pub async fn is_blocked(&self, id: RecipientId) -> Result<bool, HeraldError> {
        queries::blocked::is_blocked(self.db()?, id).await
    }

    pub async fn blocked_count(&self) -> Result<u64, HeraldError> {
        queries::blocked::blocked_count(self.db()?).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        let probe = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match probe {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        if self.db.get().is_some() {
            self.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), HeraldError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| HeraldError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HeraldError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl AudienceResolver for SqliteStorage {
    async fn resolve(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
    ) -> Result<HashSet<RecipientId>, HeraldError> {
        queries::audience::resolve(self.db()?, audience, cluster_name).await
    }
}

#[async_trait]
impl DeadRecipientSink for SqliteStorage {
    async fn add_many(&self, ids: &HashSet<RecipientId>) -> Result<(), HeraldError> {
        queries::blocked::add_many(self.db()?, ids).await
    }
}

#[async_trait]
impl RunJournal for SqliteStorage {
    async fn record_run(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
        stats: &Stats,
    ) -> Result<i64, HeraldError> {
        queries::runs::record_run(self.db()?, audience, cluster_name, stats).await
    }

    async fn recent_runs(&self, limit: u32) -> Result<Vec<BroadcastRecord>, HeraldError> {
        queries::runs::recent_runs(self.db()?, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn sqlite_storage_identifies_itself() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn health_reflects_initialization() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap()));

        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn queries_before_initialize_fail() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert!(storage.resolve(AudienceTag::All, None).await.is_err());
    }
}
