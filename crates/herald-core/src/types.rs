// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Herald broadcaster.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram chat identifier of a broadcast recipient.
pub type RecipientId = i64;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

/// Closed set of audience selectors a broadcast can target.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AudienceTag {
    /// Every known user.
    All,
    /// Users holding at least one unexpired key.
    Subscribed,
    /// Users with no key, or only expired keys.
    Unsubscribed,
    /// Users who never used a trial and never held a key.
    Untrial,
    /// Users holding a key on a trial tariff.
    Trial,
    /// Paying users without an active key.
    Hotleads,
    /// Users with a key on a server of a named cluster.
    Cluster,
}

impl AudienceTag {
    /// Whether this audience needs a cluster name parameter.
    pub fn requires_cluster(self) -> bool {
        matches!(self, AudienceTag::Cluster)
    }
}

/// Action attached to an inline button. Exactly one is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    /// Opaque callback token returned to the bot when pressed (at most 64 bytes).
    Callback(String),
    /// External link opened by the client.
    Url(String),
}

/// A single inline action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub label: String,
    pub action: ButtonAction,
}

/// Rows of inline buttons.
pub type ButtonGrid = Vec<Vec<ButtonSpec>>;

/// One in-flight delivery to a single recipient.
///
/// A `Message` is owned by exactly one queue or worker at a time; every
/// delivery attempt moves it rather than sharing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub recipient_id: RecipientId,
    /// Body in Telegram HTML.
    pub text: String,
    /// Telegram `file_id` of a pre-uploaded image; the text becomes its caption.
    pub image_ref: Option<String>,
    pub buttons: Option<ButtonGrid>,
    /// Cooldown requested by the transport on the last attempt.
    pub retry_after_seconds: Option<u32>,
    /// Delivery attempts already completed.
    pub attempts: u32,
}

impl Message {
    pub fn new(
        recipient_id: RecipientId,
        text: impl Into<String>,
        image_ref: Option<String>,
        buttons: Option<ButtonGrid>,
    ) -> Self {
        Self {
            recipient_id,
            text: text.into(),
            image_ref,
            buttons,
            retry_after_seconds: None,
            attempts: 0,
        }
    }
}

/// Classified result of one transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the message.
    Ok,
    /// Explicit wait-and-retry signal; `cooldown_s` is at least 1.
    Throttled { cooldown_s: u32 },
    /// The recipient can never be reached (blocked the bot, deleted account, ...).
    DeadRecipient,
    /// Any other failure. Terminal for the engine.
    TransientOther,
}

impl DeliveryOutcome {
    /// Short label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Ok => "ok",
            DeliveryOutcome::Throttled { .. } => "throttled",
            DeliveryOutcome::DeadRecipient => "dead",
            DeliveryOutcome::TransientOther => "failed",
        }
    }
}

/// Aggregate statistics for one broadcast run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_duration_s: f64,
    /// Successful sends.
    #[serde(rename = "total_sent")]
    pub total_sent_attempts: u64,
    pub success_count: u64,
    /// Terminal non-retry failures plus exhausted retries. Dead recipients are excluded.
    pub failed_count: u64,
    /// Successes per second of wall time.
    #[serde(rename = "avg_speed")]
    pub average_throughput: f64,
    pub total_messages: u64,
    /// Distinct recipients marked dead during the run.
    pub blocked_users: u64,
}

impl Stats {
    /// Stats for a run that had nothing to deliver.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Messages that reached a terminal state.
    pub fn terminal_count(&self) -> u64 {
        self.success_count + self.failed_count + self.blocked_users
    }
}

/// Persisted summary of a completed broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRecord {
    pub id: i64,
    pub audience: AudienceTag,
    pub cluster_name: Option<String>,
    pub recipients: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub blocked_users: u64,
    pub duration_s: f64,
    /// RFC 3339 timestamp.
    pub created_at: String,
}
