// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audience selection: one SELECT per broadcast, materialized into a set.

use std::collections::HashSet;

use herald_core::{AudienceTag, HeraldError, RecipientId};
use rusqlite::params;

use crate::database::Database;

/// Payment systems that move internal credit rather than real money.
const INTERNAL_PAYMENT_SYSTEMS: &str = "'balance', 'admin', 'coupon', 'gift', 'referral'";

/// Appended to every audience. `?1` is the current time in epoch milliseconds.
const REACHABLE: &str = "u.tg_id NOT IN (SELECT tg_id FROM blocked_users)
   AND u.tg_id NOT IN (SELECT tg_id FROM manual_bans WHERE until IS NULL OR until > ?1)";

const HAS_ACTIVE_KEY: &str =
    "EXISTS (SELECT 1 FROM keys k WHERE k.tg_id = u.tg_id AND k.expiry_time > ?1)";

fn predicate(audience: AudienceTag) -> String {
    match audience {
        AudienceTag::All => "1 = 1".to_string(),
        AudienceTag::Subscribed => HAS_ACTIVE_KEY.to_string(),
        AudienceTag::Unsubscribed => format!("NOT {HAS_ACTIVE_KEY}"),
        AudienceTag::Untrial => "u.trial IN (0, -1)
   AND NOT EXISTS (SELECT 1 FROM keys k WHERE k.tg_id = u.tg_id)"
            .to_string(),
        AudienceTag::Trial => "EXISTS (SELECT 1 FROM keys k
   JOIN tariffs t ON t.id = k.tariff_id
   WHERE k.tg_id = u.tg_id AND t.group_code = 'trial')"
            .to_string(),
        AudienceTag::Hotleads => format!(
            "EXISTS (SELECT 1 FROM payments p
   WHERE p.tg_id = u.tg_id
     AND p.status = 'success'
     AND p.amount > 0
     AND p.payment_system NOT IN ({INTERNAL_PAYMENT_SYSTEMS}))
   AND NOT {HAS_ACTIVE_KEY}"
        ),
        AudienceTag::Cluster => "EXISTS (SELECT 1 FROM keys k
   JOIN servers s ON s.server_name = k.server_id
   WHERE k.tg_id = u.tg_id AND s.cluster_name = ?2)"
            .to_string(),
    }
}

/// Full SELECT for `audience`.
pub fn audience_sql(audience: AudienceTag) -> String {
    format!(
        "SELECT DISTINCT u.tg_id FROM users u WHERE {} AND {REACHABLE}",
        predicate(audience)
    )
}

/// Resolve `audience` against the state of the database at `now_ms`.
///
/// `cluster_name` is required for [`AudienceTag::Cluster`] and ignored otherwise.
pub async fn resolve_at(
    db: &Database,
    audience: AudienceTag,
    cluster_name: Option<&str>,
    now_ms: i64,
) -> Result<HashSet<RecipientId>, HeraldError> {
    let cluster = match (audience.requires_cluster(), cluster_name) {
        (true, Some(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
        (true, _) => {
            return Err(HeraldError::InvalidRequest(
                "Cluster name is required for cluster broadcast".into(),
            ));
        }
        (false, _) => None,
    };
    let sql = audience_sql(audience);

    db.connection()
        .call(move |conn| -> Result<HashSet<RecipientId>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            match &cluster {
                Some(cluster) => stmt
                    .query_map(params![now_ms, cluster], |row| row.get(0))?
                    .collect(),
                None => stmt.query_map(params![now_ms], |row| row.get(0))?.collect(),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Resolve `audience` using the current wall-clock time.
pub async fn resolve(
    db: &Database,
    audience: AudienceTag,
    cluster_name: Option<&str>,
) -> Result<HashSet<RecipientId>, HeraldError> {
    resolve_at(db, audience, cluster_name, chrono::Utc::now().timestamp_millis()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_audience_excludes_unreachable_users() {
        for audience in [
            AudienceTag::All,
            AudienceTag::Subscribed,
            AudienceTag::Unsubscribed,
            AudienceTag::Untrial,
            AudienceTag::Trial,
            AudienceTag::Hotleads,
            AudienceTag::Cluster,
        ] {
            let sql = audience_sql(audience);
            assert!(sql.contains("blocked_users"), "{audience}");
            assert!(sql.contains("manual_bans"), "{audience}");
        }
    }

    #[test]
    fn only_cluster_binds_a_second_parameter() {
        assert!(audience_sql(AudienceTag::Cluster).contains("?2"));
        assert!(!audience_sql(AudienceTag::Hotleads).contains("?2"));
    }

    #[tokio::test]
    async fn cluster_without_name_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let err = resolve_at(&db, AudienceTag::Cluster, Some("  "), 0)
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());
    }
}
