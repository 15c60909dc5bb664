// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead-recipient table. Insert-only; re-inserting an id is a no-op.

use std::collections::HashSet;

use herald_core::{HeraldError, RecipientId};
use rusqlite::params;

use crate::database::Database;

/// Record every id in `ids` inside a single transaction.
pub async fn add_many(db: &Database, ids: &HashSet<RecipientId>) -> Result<(), HeraldError> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids: Vec<RecipientId> = ids.iter().copied().collect();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare_cached("INSERT OR IGNORE INTO blocked_users (tg_id) VALUES (?1)")?;
                for id in &ids {
                    stmt.execute(params![id])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn is_blocked(db: &Database, id: RecipientId) -> Result<bool, HeraldError> {
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM blocked_users WHERE tg_id = ?1)",
                params![id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn blocked_count(db: &Database) -> Result<u64, HeraldError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM blocked_users", [], |row| row.get(0))
        })
        .await
        .map(|count| count as u64)
        .map_err(crate::database::map_tr_err)
}
