// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules. Each function takes `&Database` and runs on its connection thread.

pub mod audience;
pub mod blocked;
pub mod runs;
