// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Herald broadcaster.
//!
//! This crate provides the trait definitions, error types, and common types
//! shared by the transport, storage, dispatch and gateway crates.

pub mod error;
pub mod traits;
pub mod types;

pub use error::HeraldError;
pub use types::{
    AdapterType, AudienceTag, BroadcastRecord, ButtonAction, ButtonGrid, ButtonSpec,
    DeliveryOutcome, HealthStatus, Message, RecipientId, Stats,
};

pub use traits::{
    AudienceResolver, DeadRecipientSink, PluginAdapter, RunJournal, StorageAdapter,
    TransportAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn herald_error_has_all_variants() {
        let _config = HeraldError::Config("test".into());
        let _storage = HeraldError::storage(std::io::Error::other("test"));
        let _transport = HeraldError::Transport {
            message: "test".into(),
            source: None,
        };
        let _timeout = HeraldError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = HeraldError::Internal("test".into());
        let invalid = HeraldError::InvalidRequest("Text cannot be empty".into());
        assert!(invalid.is_invalid_request());
        assert_eq!(invalid.to_string(), "Text cannot be empty");
    }

    #[test]
    fn audience_tag_parses_lowercase_names() {
        let names = [
            ("all", AudienceTag::All),
            ("subscribed", AudienceTag::Subscribed),
            ("unsubscribed", AudienceTag::Unsubscribed),
            ("untrial", AudienceTag::Untrial),
            ("trial", AudienceTag::Trial),
            ("hotleads", AudienceTag::Hotleads),
            ("cluster", AudienceTag::Cluster),
        ];
        for (name, tag) in names {
            assert_eq!(AudienceTag::from_str(name).unwrap(), tag);
            assert_eq!(tag.to_string(), name);
        }
        assert!(AudienceTag::from_str("everyone").is_err());
    }

    #[test]
    fn only_cluster_requires_a_cluster_name() {
        assert!(AudienceTag::Cluster.requires_cluster());
        assert!(!AudienceTag::All.requires_cluster());
        assert!(!AudienceTag::Hotleads.requires_cluster());
    }

    #[test]
    fn stats_use_wire_field_names() {
        let stats = Stats {
            total_duration_s: 2.0,
            total_sent_attempts: 4,
            success_count: 4,
            failed_count: 1,
            average_throughput: 2.0,
            total_messages: 6,
            blocked_users: 1,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["total_sent"], 4);
        assert_eq!(json["avg_speed"], 2.0);
        assert!(json.get("total_sent_attempts").is_none());
        assert_eq!(stats.terminal_count(), 6);
    }

    #[test]
    fn new_message_starts_without_attempts() {
        let msg = Message::new(42, "hi", None, None);
        assert_eq!(msg.attempts, 0);
        assert!(msg.retry_after_seconds.is_none());
    }

    #[test]
    fn outcome_labels_are_distinct() {
        let labels = [
            DeliveryOutcome::Ok.label(),
            DeliveryOutcome::Throttled { cooldown_s: 1 }.label(),
            DeliveryOutcome::DeadRecipient.label(),
            DeliveryOutcome::TransientOther.label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transport_adapter<T: TransportAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_resolver<T: AudienceResolver>() {}
        fn _assert_sink<T: DeadRecipientSink>() {}
        fn _assert_journal<T: RunJournal>() {}
    }
}
