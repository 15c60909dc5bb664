// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Herald.
//!
//! Embedded refinery migrations, a single-writer `tokio-rusqlite`
//! connection, audience resolution queries, the dead-recipient table and the
//! broadcast run journal.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
