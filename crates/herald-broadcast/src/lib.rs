// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk broadcast delivery for Herald.
//!
//! - [`limiter`]: global sliding-window rate limiter
//! - [`buttons`]: `BUTTONS:` block parser
//! - [`engine`]: worker pool with retry handling and dead-recipient collection
//! - [`command`]: request validation and the [`Broadcaster`] entry point
//! - [`recording`]: metric descriptions and helpers

pub mod buttons;
pub mod command;
pub mod engine;
pub mod limiter;
pub mod recording;

pub use buttons::{ParsedMessage, parse_message};
pub use command::{
    BroadcastDefaults, BroadcastRequest, BroadcastResponse, Broadcaster, RawBroadcastRequest,
};
pub use engine::{DispatchEngine, EngineConfig, MAX_ATTEMPTS};
pub use limiter::RateLimiter;
