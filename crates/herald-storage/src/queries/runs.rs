// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Journal of completed broadcast runs.

use std::str::FromStr;

use herald_core::{AudienceTag, BroadcastRecord, HeraldError, Stats};
use rusqlite::params;

use crate::database::Database;

/// Insert a run summary. Returns the new row id.
pub async fn record_run(
    db: &Database,
    audience: AudienceTag,
    cluster_name: Option<&str>,
    stats: &Stats,
) -> Result<i64, HeraldError> {
    let audience = audience.to_string();
    let cluster_name = cluster_name.map(str::to_string);
    let stats = stats.clone();
    let created_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO broadcast_runs
                    (audience, cluster_name, recipients, success_count, failed_count,
                     blocked_users, duration_s, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    audience,
                    cluster_name,
                    stats.total_messages as i64,
                    stats.success_count as i64,
                    stats.failed_count as i64,
                    stats.blocked_users as i64,
                    stats.total_duration_s,
                    created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The `limit` most recent runs, newest first.
pub async fn recent_runs(db: &Database, limit: u32) -> Result<Vec<BroadcastRecord>, HeraldError> {
    db.connection()
        .call(move |conn| -> Result<Vec<BroadcastRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, audience, cluster_name, recipients, success_count, failed_count,
                        blocked_users, duration_s, created_at
                 FROM broadcast_runs
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let audience: String = row.get(1)?;
                let audience = AudienceTag::from_str(&audience).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(BroadcastRecord {
                    id: row.get(0)?,
                    audience,
                    cluster_name: row.get(2)?,
                    recipients: row.get::<_, i64>(3)? as u64,
                    success_count: row.get::<_, i64>(4)? as u64,
                    failed_count: row.get::<_, i64>(5)? as u64,
                    blocked_users: row.get::<_, i64>(6)? as u64,
                    duration_s: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(success: u64) -> Stats {
        Stats {
            total_duration_s: 1.5,
            total_sent_attempts: success,
            success_count: success,
            failed_count: 1,
            average_throughput: success as f64 / 1.5,
            total_messages: success + 2,
            blocked_users: 1,
        }
    }

    #[tokio::test]
    async fn runs_come_back_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        record_run(&db, AudienceTag::All, None, &stats(3)).await.unwrap();
        let id = record_run(&db, AudienceTag::Cluster, Some("eu"), &stats(7))
            .await
            .unwrap();

        let runs = recent_runs(&db, 10).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, id);
        assert_eq!(runs[0].audience, AudienceTag::Cluster);
        assert_eq!(runs[0].cluster_name.as_deref(), Some("eu"));
        assert_eq!(runs[0].success_count, 7);
        assert_eq!(runs[0].recipients, 9);
        assert_eq!(runs[1].audience, AudienceTag::All);

        assert_eq!(recent_runs(&db, 1).await.unwrap().len(), 1);
    }
}
