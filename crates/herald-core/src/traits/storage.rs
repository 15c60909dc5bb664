// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-facing traits: audience selection, dead-recipient persistence and
//! the broadcast run journal.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AudienceTag, BroadcastRecord, RecipientId, Stats};

/// Adapter for storage and persistence backends.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), HeraldError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), HeraldError>;
}

/// Translates an audience selector into a deduplicated set of recipients.
///
/// Implementations must never return a recipient recorded by a
/// [`DeadRecipientSink`], nor one under an active manual ban.
#[async_trait]
pub trait AudienceResolver: Send + Sync {
    async fn resolve(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
    ) -> Result<HashSet<RecipientId>, HeraldError>;
}

/// Durable, insertion-only set of recipients known to reject messages.
#[async_trait]
pub trait DeadRecipientSink: Send + Sync {
    /// Records every id in `ids`. Ids already present are left untouched.
    async fn add_many(&self, ids: &HashSet<RecipientId>) -> Result<(), HeraldError>;
}

/// Append-only log of completed broadcast runs.
#[async_trait]
pub trait RunJournal: Send + Sync {
    /// Persists the outcome of one run and returns its id.
    async fn record_run(
        &self,
        audience: AudienceTag,
        cluster_name: Option<&str>,
        stats: &Stats,
    ) -> Result<i64, HeraldError>;

    /// Most recent runs first.
    async fn recent_runs(&self, limit: u32) -> Result<Vec<BroadcastRecord>, HeraldError>;
}
