// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of button grids into Telegram inline keyboards.

use herald_core::{ButtonAction, ButtonGrid, ButtonSpec};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

/// Build an inline keyboard, or `None` when no button survives conversion.
///
/// Buttons whose URL cannot be parsed are dropped; the rest of the grid is kept.
pub fn inline_keyboard(grid: &ButtonGrid) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = grid
        .iter()
        .map(|row| row.iter().filter_map(to_button).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();

    if rows.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(rows))
    }
}

fn to_button(spec: &ButtonSpec) -> Option<InlineKeyboardButton> {
    match &spec.action {
        ButtonAction::Callback(data) => {
            Some(InlineKeyboardButton::callback(spec.label.clone(), data.clone()))
        }
        ButtonAction::Url(raw) => match reqwest::Url::parse(raw) {
            Ok(url) => Some(InlineKeyboardButton::url(spec.label.clone(), url)),
            Err(e) => {
                warn!(label = %spec.label, url = %raw, error = %e, "dropping button with invalid url");
                None
            }
        },
    }
}
