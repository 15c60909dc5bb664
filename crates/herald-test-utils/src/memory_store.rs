// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage double.
//!
//! Audiences are fixed up front with [`MemoryStore::with_audience`]; resolution
//! subtracts whatever the dead-recipient sink has collected, mirroring the
//! SQLite resolver.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::HeraldError;
use herald_core::traits::{AudienceResolver, DeadRecipientSink, RunJournal};
use herald_core::types::{AudienceTag, BroadcastRecord, RecipientId, Stats};

#[derive(Default)]
pub struct MemoryStore {
    audiences: HashMap<(AudienceTag, Option<String>), HashSet<RecipientId>>,
    dead: Mutex<HashSet<RecipientId>>,
    runs: Mutex<Vec<BroadcastRecord>>,
    fail_sink: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the recipients of `audience`. Cluster audiences are keyed by
    /// cluster name as well.
    pub fn with_audience(
        mut self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
        ids: impl IntoIterator<Item = RecipientId>,
    ) -> Self {
        self.audiences.insert(
            (audience, cluster_name.map(str::to_string)),
            ids.into_iter().collect(),
        );
        self
    }

    /// Make every `add_many` call fail.
    pub fn with_failing_sink(mut self) -> Self {
        self.fail_sink = true;
        self
    }

    /// Recipients recorded as dead so far.
    pub async fn dead(&self) -> HashSet<RecipientId> {
        self.dead.lock().await.clone()
    }

    /// Journal entries in insertion order.
    pub async fn runs(&self) -> Vec<BroadcastRecord> {
        self.runs.lock().await.clone()
    }
}

#[async_trait]
impl AudienceResolver for MemoryStore {
    async fn resolve(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
    ) -> Result<HashSet<RecipientId>, HeraldError> {
        let key_cluster = if audience.requires_cluster() {
            match cluster_name.map(str::trim).filter(|name| !name.is_empty()) {
                Some(name) => Some(name.to_string()),
                None => {
                    return Err(HeraldError::InvalidRequest(
                        "Cluster name is required for cluster broadcast".into(),
                    ));
                }
            }
        } else {
            None
        };

        let dead = self.dead.lock().await;
        Ok(self
            .audiences
            .get(&(audience, key_cluster))
            .map(|ids| ids.difference(&dead).copied().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl DeadRecipientSink for MemoryStore {
    async fn add_many(&self, ids: &HashSet<RecipientId>) -> Result<(), HeraldError> {
        if self.fail_sink {
            return Err(HeraldError::Internal("dead-recipient sink unavailable".into()));
        }
        self.dead.lock().await.extend(ids.iter().copied());
        Ok(())
    }
}

#[async_trait]
impl RunJournal for MemoryStore {
    async fn record_run(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
        stats: &Stats,
    ) -> Result<i64, HeraldError> {
        let mut runs = self.runs.lock().await;
        let id = runs.len() as i64 + 1;
        runs.push(BroadcastRecord {
            id,
            audience,
            cluster_name: cluster_name.map(str::to_string),
            recipients: stats.total_messages,
            success_count: stats.success_count,
            failed_count: stats.failed_count,
            blocked_users: stats.blocked_users,
            duration_s: stats.total_duration_s,
            created_at: chrono::Utc::now().to_rfc3339(),
        });
        Ok(id)
    }

    async fn recent_runs(&self, limit: u32) -> Result<Vec<BroadcastRecord>, HeraldError> {
        Ok(self
            .runs
            .lock()
            .await
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dead_recipients_leave_the_audience() {
        let store = MemoryStore::new().with_audience(AudienceTag::All, None, [1, 2, 3]);
        store.add_many(&HashSet::from([2])).await.unwrap();
        let ids = store.resolve(AudienceTag::All, None).await.unwrap();
        assert_eq!(ids, HashSet::from([1, 3]));
    }

    #[tokio::test]
    async fn cluster_requires_a_name() {
        let store = MemoryStore::new().with_audience(AudienceTag::Cluster, Some("eu"), [1]);
        assert!(store.resolve(AudienceTag::Cluster, Some("  ")).await.is_err());
        let ids = store.resolve(AudienceTag::Cluster, Some("eu")).await.unwrap();
        assert_eq!(ids, HashSet::from([1]));
    }

    #[tokio::test]
    async fn journal_lists_newest_first() {
        let store = MemoryStore::new();
        store.record_run(AudienceTag::All, None, &Stats::empty()).await.unwrap();
        store.record_run(AudienceTag::Trial, None, &Stats::empty()).await.unwrap();
        let runs = store.recent_runs(1).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].audience, AudienceTag::Trial);
    }
}
