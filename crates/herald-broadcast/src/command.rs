// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The broadcast command: request validation, audience resolution and one
//! engine run per request.

use std::sync::Arc;
use std::time::Duration;

use herald_config::model::{BroadcastConfig, RATE_RANGE, WORKERS_RANGE};
use herald_core::{
    AudienceResolver, AudienceTag, DeadRecipientSink, HeraldError, Message, RunJournal, Stats,
    TransportAdapter,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::buttons::parse_message;
use crate::engine::{DispatchEngine, EngineConfig};
use crate::limiter::RateLimiter;
use crate::recording;

/// Longest plain message body, in characters.
pub const MAX_TEXT_CHARS: usize = 4096;

/// Longest photo caption, in characters.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// A validated-at-run-time broadcast request.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    pub audience: AudienceTag,
    pub cluster_name: Option<String>,
    /// Body in Telegram HTML, optionally ending in a `BUTTONS:` block.
    pub text: String,
    pub image_ref: Option<String>,
    /// Clamped into `WORKERS_RANGE`; `None` uses the configured default.
    pub workers: Option<i64>,
    /// Clamped into `RATE_RANGE`; `None` uses the configured default.
    pub rate: Option<i64>,
}

impl BroadcastRequest {
    pub fn new(audience: AudienceTag, text: impl Into<String>) -> Self {
        Self {
            audience,
            cluster_name: None,
            text: text.into(),
            image_ref: None,
            workers: None,
            rate: None,
        }
    }
}

/// Request as received over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBroadcastRequest {
    pub send_to: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub workers: Option<i64>,
    #[serde(default)]
    pub messages_per_second: Option<i64>,
}

impl TryFrom<RawBroadcastRequest> for BroadcastRequest {
    type Error = HeraldError;

    fn try_from(raw: RawBroadcastRequest) -> Result<Self, Self::Error> {
        let audience: AudienceTag = raw.send_to.trim().parse().map_err(|_| {
            HeraldError::InvalidRequest(format!("Invalid send_to value: {}", raw.send_to))
        })?;
        Ok(Self {
            audience,
            cluster_name: raw.cluster_name,
            text: raw.text,
            image_ref: raw.photo.filter(|photo| !photo.trim().is_empty()),
            workers: raw.workers,
            rate: raw.messages_per_second,
        })
    }
}

/// Values applied when a request leaves workers or rate unset.
#[derive(Debug, Clone)]
pub struct BroadcastDefaults {
    pub workers: usize,
    pub rate: u32,
    pub poll_interval: Duration,
}

impl Default for BroadcastDefaults {
    fn default() -> Self {
        Self::from(&BroadcastConfig::default())
    }
}

impl From<&BroadcastConfig> for BroadcastDefaults {
    fn from(config: &BroadcastConfig) -> Self {
        Self {
            workers: config.default_workers,
            rate: config.default_rate,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastResponse {
    /// The audience resolved to nobody; nothing was sent.
    NoRecipients,
    Completed { recipients: usize, stats: Stats },
}

impl BroadcastResponse {
    /// JSON body returned to HTTP callers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            BroadcastResponse::NoRecipients => json!({
                "success": false,
                "message": "No recipients found",
                "stats": { "total_messages": 0 },
            }),
            BroadcastResponse::Completed { recipients, stats } => json!({
                "success": true,
                "message": "Broadcast completed",
                "recipients": recipients,
                "stats": stats,
            }),
        }
    }

    pub fn stats(&self) -> Stats {
        match self {
            BroadcastResponse::NoRecipients => Stats::empty(),
            BroadcastResponse::Completed { stats, .. } => stats.clone(),
        }
    }
}

pub fn clamp_workers(requested: i64) -> usize {
    let (min, max) = WORKERS_RANGE;
    requested.clamp(min as i64, max as i64) as usize
}

pub fn clamp_rate(requested: i64) -> u32 {
    let (min, max) = RATE_RANGE;
    requested.clamp(i64::from(min), i64::from(max)) as u32
}

/// Runs broadcasts against one storage backend and one transport.
pub struct Broadcaster {
    resolver: Arc<dyn AudienceResolver>,
    sink: Arc<dyn DeadRecipientSink>,
    journal: Arc<dyn RunJournal>,
    transport: Arc<dyn TransportAdapter>,
    defaults: BroadcastDefaults,
    shutdown: CancellationToken,
}

impl Broadcaster {
    pub fn new(
        resolver: Arc<dyn AudienceResolver>,
        sink: Arc<dyn DeadRecipientSink>,
        journal: Arc<dyn RunJournal>,
        transport: Arc<dyn TransportAdapter>,
        defaults: BroadcastDefaults,
    ) -> Self {
        Self {
            resolver,
            sink,
            journal,
            transport,
            defaults,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancelling `token` stops every run in progress.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn journal(&self) -> &Arc<dyn RunJournal> {
        &self.journal
    }

    pub async fn run(&self, request: BroadcastRequest) -> Result<BroadcastResponse, HeraldError> {
        if request.text.trim().is_empty() {
            return Err(invalid("Text cannot be empty"));
        }

        let audience = request.audience;
        let cluster_name = request
            .cluster_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        match (audience.requires_cluster(), cluster_name) {
            (true, None) => {
                return Err(invalid("Cluster name is required for cluster broadcast"));
            }
            (false, Some(_)) => {
                return Err(invalid(
                    "Cluster name is only allowed for cluster broadcast",
                ));
            }
            _ => {}
        }

        let parsed = parse_message(&request.text);
        if parsed.text.is_empty() {
            return Err(invalid("Text cannot be empty"));
        }
        let limit = if request.image_ref.is_some() {
            MAX_CAPTION_CHARS
        } else {
            MAX_TEXT_CHARS
        };
        let length = parsed.text.chars().count();
        if length > limit {
            return Err(HeraldError::InvalidRequest(format!(
                "Message is too long: {length} characters, limit {limit}"
            )));
        }

        let workers = clamp_workers(request.workers.unwrap_or(self.defaults.workers as i64));
        let rate = clamp_rate(request.rate.unwrap_or(i64::from(self.defaults.rate)));

        let mut recipients: Vec<_> = self
            .resolver
            .resolve(audience, cluster_name)
            .await?
            .into_iter()
            .collect();
        if recipients.is_empty() {
            info!(%audience, cluster = cluster_name, "no recipients for broadcast");
            recording::record_broadcast(&audience.to_string(), "no_recipients");
            return Ok(BroadcastResponse::NoRecipients);
        }
        recipients.sort_unstable();

        let messages: Vec<Message> = recipients
            .iter()
            .map(|&id| {
                Message::new(
                    id,
                    parsed.text.clone(),
                    request.image_ref.clone(),
                    parsed.buttons.clone(),
                )
            })
            .collect();

        info!(
            %audience,
            cluster = cluster_name,
            recipients = messages.len(),
            workers,
            rate,
            buttons = parsed.buttons.as_ref().map_or(0, Vec::len),
            "dispatching broadcast"
        );

        let engine = DispatchEngine::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.sink),
            Arc::new(RateLimiter::new(rate)?),
            EngineConfig {
                poll_interval: self.defaults.poll_interval,
                ..EngineConfig::default()
            },
        );
        let stats = engine
            .broadcast_with_shutdown(messages, workers, self.shutdown.child_token())
            .await;

        if let Err(e) = self.journal.record_run(audience, cluster_name, &stats).await {
            warn!(error = %e, %audience, "failed to record broadcast run");
        }
        recording::record_broadcast(&audience.to_string(), "completed");

        Ok(BroadcastResponse::Completed {
            recipients: recipients.len(),
            stats,
        })
    }
}

fn invalid(message: &str) -> HeraldError {
    HeraldError::InvalidRequest(message.to_string())
}
