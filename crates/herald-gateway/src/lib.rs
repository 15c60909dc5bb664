// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Herald broadcaster.
//!
//! Routes:
//! - `POST /broadcast` (bearer auth): run a broadcast and wait for its stats
//! - `GET /broadcasts?limit=N` (bearer auth): recent run records
//! - `GET /health`: adapter health
//! - `GET /metrics`: Prometheus text exposition

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};
