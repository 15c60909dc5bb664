// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` implements `TransportAdapter` with a caller-supplied script
//! deciding each outcome, and captures every attempt for assertion in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use herald_core::HeraldError;
use herald_core::traits::{PluginAdapter, TransportAdapter};
use herald_core::types::{AdapterType, DeliveryOutcome, HealthStatus, Message, RecipientId};

type Script = dyn Fn(&Message) -> DeliveryOutcome + Send + Sync;

/// One captured delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryCall {
    pub recipient_id: RecipientId,
    /// Attempts the message had completed before this one.
    pub attempts_before: u32,
    pub at: Instant,
}

/// A mock transport for testing.
///
/// The script sees the message as delivered, including `attempts`, so a test
/// can throttle the first attempt and accept the second.
pub struct MockTransport {
    script: Box<Script>,
    latency: Option<Duration>,
    calls: Arc<Mutex<Vec<DeliveryCall>>>,
}

impl MockTransport {
    /// A transport whose outcomes come from `script`.
    pub fn scripted<F>(script: F) -> Self
    where
        F: Fn(&Message) -> DeliveryOutcome + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            latency: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A transport that accepts every message.
    pub fn always_ok() -> Self {
        Self::scripted(|_| DeliveryOutcome::Ok)
    }

    /// Delay every delivery by `latency` before it resolves.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every attempt so far, in call order.
    pub async fn calls(&self) -> Vec<DeliveryCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Attempts made for one recipient.
    pub async fn calls_for(&self, recipient_id: RecipientId) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.recipient_id == recipient_id)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::always_ok()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, HeraldError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HeraldError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    async fn deliver(&self, message: &Message) -> DeliveryOutcome {
        self.calls.lock().await.push(DeliveryCall {
            recipient_id: message.recipient_id,
            attempts_before: message.attempts,
            at: Instant::now(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        (self.script)(message)
    }
}
