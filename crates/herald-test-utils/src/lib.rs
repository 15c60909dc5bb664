// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Herald integration tests.
//!
//! Provides in-memory adapters for fast, deterministic tests that never touch
//! Telegram or SQLite.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted transport that records every delivery attempt
//! - [`MemoryStore`] - Fixed audiences, dead-recipient set and run journal

pub mod memory_store;
pub mod mock_transport;

pub use memory_store::MemoryStore;
pub use mock_transport::{DeliveryCall, MockTransport};
