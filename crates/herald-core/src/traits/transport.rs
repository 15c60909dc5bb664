// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for chat delivery backends (Telegram Bot API).

use async_trait::async_trait;

use crate::traits::adapter::PluginAdapter;
use crate::types::{DeliveryOutcome, Message};

/// Adapter that delivers a single message to a single recipient.
///
/// Implementations never return raw transport errors from [`deliver`]: every
/// failure is classified into one of the [`DeliveryOutcome`] variants so the
/// dispatch engine can route it without knowing the wire protocol.
///
/// [`deliver`]: TransportAdapter::deliver
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// Sends `message` and classifies the result.
    async fn deliver(&self, message: &Message) -> DeliveryOutcome;
}
