// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of Bot API failures onto [`DeliveryOutcome`].

use herald_core::DeliveryOutcome;
use teloxide::{ApiError, RequestError};

/// Classify a failed request. Total: every error maps to some outcome.
pub fn classify_error(err: &RequestError) -> DeliveryOutcome {
    match err {
        RequestError::RetryAfter(wait) => DeliveryOutcome::Throttled {
            cooldown_s: wait.seconds().max(1),
        },
        RequestError::Api(api) => classify_api_error(api),
        // The old chat id no longer exists.
        RequestError::MigrateToChatId(_) => DeliveryOutcome::DeadRecipient,
        _ => DeliveryOutcome::TransientOther,
    }
}

pub fn classify_api_error(err: &ApiError) -> DeliveryOutcome {
    match err {
        ApiError::BotBlocked
        | ApiError::ChatNotFound
        | ApiError::UserNotFound
        | ApiError::UserDeactivated
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::CantInitiateConversation
        | ApiError::CantTalkWithBots => DeliveryOutcome::DeadRecipient,
        ApiError::Unknown(description) => classify_description(description),
        _ => DeliveryOutcome::TransientOther,
    }
}

/// Fallback for descriptions teloxide does not know as a typed variant.
pub fn classify_description(description: &str) -> DeliveryOutcome {
    let lower = description.to_ascii_lowercase();

    if let Some(cooldown_s) = retry_after_seconds(&lower) {
        return DeliveryOutcome::Throttled { cooldown_s };
    }

    const DEAD_MARKERS: &[&str] = &[
        "forbidden",
        "bot was blocked",
        "chat not found",
        "user is deactivated",
        "user not found",
        "bot was kicked",
        "can't initiate conversation",
    ];
    if DEAD_MARKERS.iter().any(|marker| lower.contains(marker)) {
        DeliveryOutcome::DeadRecipient
    } else {
        DeliveryOutcome::TransientOther
    }
}

/// Parses `... retry after N` as sent in 429 descriptions.
fn retry_after_seconds(lower: &str) -> Option<u32> {
    let (_, rest) = lower.split_once("retry after")?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<u32>().ok().map(|s| s.max(1))
}
