// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Button block DSL embedded in broadcast text.
//!
//! A message may end with a `BUTTONS:` sentinel (any case, optionally wrapped
//! in inline-format tags such as `<b>BUTTONS:</b>`), followed by one JSON
//! object per line:
//!
//! ```text
//! Renew your plan today!
//! <b>BUTTONS:</b>
//! {"text": "Renew", "callback": "renew_key"}
//! {"text": "Support", "url": "https://t.me/support"}
//! ```
//!
//! Each valid line becomes its own keyboard row. Invalid lines are dropped
//! without failing the broadcast.

use std::sync::LazyLock;

use herald_core::{ButtonAction, ButtonGrid, ButtonSpec};
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

/// Telegram limit on `callback_data`, in bytes.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Longest accepted button label, in characters.
pub const MAX_LABEL_CHARS: usize = 64;

const URL_SCHEMES: &[&str] = &["http://", "https://", "tg://"];

/// Inline-format tags that may wrap the sentinel.
const FORMAT_TAGS: &str = "b|strong|i|em|u|ins|s|strike|del|code|pre|span|tg-spoiler";

static SENTINEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:<\s*(?:{FORMAT_TAGS})\b[^>]*>\s*)*buttons:(?:\s*<\s*/\s*(?:{FORMAT_TAGS})\s*>)*"
    ))
    .expect("sentinel pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// Message body with the button block split off.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    pub text: String,
    pub buttons: Option<ButtonGrid>,
}

#[derive(Debug, Deserialize)]
struct RawButton {
    text: Option<String>,
    callback: Option<String>,
    url: Option<String>,
}

/// Split `raw` into clean text and an optional button grid.
pub fn parse_message(raw: &str) -> ParsedMessage {
    let Some(sentinel) = SENTINEL.find(raw) else {
        return ParsedMessage {
            text: raw.trim().to_string(),
            buttons: None,
        };
    };

    let text = raw[..sentinel.start()].trim().to_string();
    let grid: ButtonGrid = parse_block(&raw[sentinel.end()..])
        .into_iter()
        .map(|button| vec![button])
        .collect();

    ParsedMessage {
        text,
        buttons: (!grid.is_empty()).then_some(grid),
    }
}

fn parse_block(block: &str) -> Vec<ButtonSpec> {
    let stripped = TAG.replace_all(block, "");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

fn parse_line(line: &str) -> Option<ButtonSpec> {
    let raw: RawButton = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(line, error = %e, "skipping malformed button line");
            return None;
        }
    };

    let label = raw.text.map(|t| t.trim().to_string()).unwrap_or_default();
    if label.is_empty() {
        warn!(line, "discarding button without a label");
        return None;
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        warn!(label = %label, "discarding button: label longer than {MAX_LABEL_CHARS} characters");
        return None;
    }

    let action = match (raw.callback, raw.url) {
        (Some(callback), None) => {
            if callback.is_empty() {
                warn!(label = %label, "discarding button: callback data is empty");
                return None;
            }
            if callback.len() > MAX_CALLBACK_BYTES {
                warn!(
                    label = %label,
                    bytes = callback.len(),
                    "discarding button: callback data exceeds {MAX_CALLBACK_BYTES} bytes"
                );
                return None;
            }
            ButtonAction::Callback(callback)
        }
        (None, Some(url)) => {
            if !URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
                warn!(label = %label, url = %url, "discarding button: unsupported url scheme");
                return None;
            }
            ButtonAction::Url(url)
        }
        _ => {
            warn!(label = %label, "discarding button: exactly one of callback or url is required");
            return None;
        }
    };

    Some(ButtonSpec { label, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    fn callback(label: &str, data: &str) -> Vec<ButtonSpec> {
        vec![ButtonSpec {
            label: label.into(),
            action: ButtonAction::Callback(data.into()),
        }]
    }

    #[test]
    fn plain_text_has_no_buttons() {
        let parsed = parse_message("  Hello <b>world</b>  ");
        assert_eq!(parsed.text, "Hello <b>world</b>");
        assert!(parsed.buttons.is_none());
    }

    #[test]
    fn bad_line_is_dropped_from_two_valid_buttons() {
        let raw = "Hello BUTTONS:\n{\"text\":\"A\",\"callback\":\"go\"}\n{\"text\":\"B\",\"url\":\"https://x\"}\n{\"bad\":\"line\"}";
        let parsed = parse_message(raw);
        assert_eq!(parsed.text, "Hello");
        let grid = parsed.buttons.unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], callback("A", "go"));
        assert_eq!(grid[1][0].action, ButtonAction::Url("https://x".into()));
    }

    #[test]
    fn wrapped_sentinel_with_html_escaped_json() {
        let raw = "Hi<br><b>BUTTONS:</b>\n{&quot;text&quot;:&quot;A&quot;,&quot;callback&quot;:&quot;a&quot;}";
        let parsed = parse_message(raw);
        assert_eq!(parsed.text, "Hi<br>");
        assert_eq!(parsed.buttons, Some(vec![callback("A", "a")]));
    }

    #[test]
    fn bare_sentinel_is_case_insensitive() {
        let raw = "Promo\nbuttons:\n{\"text\":\"Open\",\"url\":\"https://example.com\"}\n{\"text\":\"Pay\",\"callback\":\"pay\"}";
        let parsed = parse_message(raw);
        assert_eq!(parsed.text, "Promo");
        let grid = parsed.buttons.unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(
            grid[0][0].action,
            ButtonAction::Url("https://example.com".into())
        );
        assert_eq!(grid[1], callback("Pay", "pay"));
    }

    #[test]
    fn lines_wrapped_in_tags_are_stripped() {
        let raw = "Body <b>BUTTONS:</b>\n<i>{\"text\":\"Go\",\"callback\":\"go\"}</i>";
        assert_eq!(parse_message(raw).buttons, Some(vec![callback("Go", "go")]));
    }

    #[traced_test]
    #[test]
    fn oversized_callback_is_discarded_with_warning() {
        let long = "x".repeat(MAX_CALLBACK_BYTES + 1);
        let raw = format!(
            "Text\nBUTTONS:\n{{\"text\":\"Too long\",\"callback\":\"{long}\"}}\n{{\"text\":\"Fine\",\"callback\":\"ok\"}}"
        );
        let parsed = parse_message(&raw);
        assert_eq!(parsed.buttons, Some(vec![callback("Fine", "ok")]));
        assert!(logs_contain("callback data exceeds"));
    }

    #[traced_test]
    #[test]
    fn empty_callback_is_discarded() {
        let parsed = parse_message(
            "Hi\nBUTTONS:\n{\"text\": \"Empty\", \"callback\": \"\"}\n{\"text\": \"Renew\", \"callback\": \"renew\"}",
        );
        assert_eq!(parsed.buttons, Some(vec![callback("Renew", "renew")]));
        assert!(logs_contain("callback data is empty"));
    }

    #[test]
    fn callback_limit_counts_bytes_not_chars() {
        // 22 three-byte characters: 22 chars, 66 bytes.
        let data = "€".repeat(22);
        let raw = format!("T BUTTONS:\n{{\"text\":\"E\",\"callback\":\"{data}\"}}");
        assert!(parse_message(&raw).buttons.is_none());
    }

    #[test]
    fn invalid_lines_are_skipped() {
        let raw = "Body\nBUTTONS:\nnot json\n{\"callback\":\"no label\"}\n{\"text\":\"\",\"callback\":\"x\"}\n{\"text\":\"Both\",\"callback\":\"c\",\"url\":\"https://a.b\"}\n{\"text\":\"Neither\"}\n{\"text\":\"Ftp\",\"url\":\"ftp://host\"}";
        let parsed = parse_message(raw);
        assert_eq!(parsed.text, "Body");
        assert!(parsed.buttons.is_none());
    }

    #[test]
    fn long_label_is_skipped() {
        let label = "L".repeat(MAX_LABEL_CHARS + 1);
        let raw = format!("T BUTTONS:\n{{\"text\":\"{label}\",\"callback\":\"c\"}}");
        assert!(parse_message(&raw).buttons.is_none());
    }

    #[test]
    fn tg_scheme_is_accepted() {
        let raw = "T BUTTONS:\n{\"text\":\"Chat\",\"url\":\"tg://resolve?domain=herald\"}";
        assert!(parse_message(raw).buttons.is_some());
    }

    #[test]
    fn sentinel_only_yields_empty_text() {
        let parsed = parse_message("<b>BUTTONS:</b>\n{\"text\":\"A\",\"callback\":\"a\"}");
        assert_eq!(parsed.text, "");
        assert!(parsed.buttons.is_some());
    }

    proptest! {
        #[test]
        fn text_without_sentinel_is_returned_trimmed(body in "[a-zA-Z0-9 .,!?\n]{0,200}") {
            prop_assume!(!body.to_lowercase().contains("buttons:"));
            let parsed = parse_message(&body);
            prop_assert_eq!(parsed.text, body.trim());
            prop_assert!(parsed.buttons.is_none());
        }

        #[test]
        fn two_valid_lines_give_two_rows(
            body in "[a-zA-Z0-9 ]{1,50}",
            wrap in prop::sample::select(vec!["", "<b>", "<i>", "<b><i>"]),
        ) {
            let closing = match wrap {
                "<b>" => "</b>",
                "<i>" => "</i>",
                "<b><i>" => "</i></b>",
                _ => "",
            };
            let raw = format!(
                "{body}{wrap}BUTTONS:{closing}\n{{\"text\":\"One\",\"callback\":\"1\"}}\n{{\"text\":\"Two\",\"url\":\"https://two.example\"}}"
            );
            let parsed = parse_message(&raw);
            prop_assert_eq!(parsed.text, body.trim());
            let grid = parsed.buttons.unwrap();
            prop_assert_eq!(grid.len(), 2);
            prop_assert!(grid.iter().all(|row| row.len() == 1));
        }
    }
}
