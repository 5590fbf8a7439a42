// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Serialized mention tokens.
//!
//! A reference is stored inline as `«Label|id»`. The id is whatever follows
//! the last `|`, so labels may contain `|` but ids may not. Neither part may
//! contain the trigger character, which keeps persisted tokens from reopening
//! the picker.

use std::ops::Range;

use crate::ReferenceId;
use crate::detector::TRIGGER;

pub const TOKEN_OPEN: char = '\u{ab}';
pub const TOKEN_CLOSE: char = '\u{bb}';
pub const TOKEN_SEPARATOR: char = '|';

pub fn is_delimiter(c: char) -> bool {
    c == TOKEN_OPEN || c == TOKEN_CLOSE
}

pub fn is_valid_reference_id(id: &str) -> bool {
    !id.is_empty()
        && id.chars().all(|c| {
            !is_delimiter(c) && c != TOKEN_SEPARATOR && c != TRIGGER && !c.is_whitespace()
        })
}

/// Label text as it will appear inside a token.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !is_delimiter(*c) && *c != TRIGGER)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Serializes a reference. An empty label falls back to the id.
pub fn format_token(label: &str, target: &ReferenceId) -> String {
    let label = sanitize_label(label);
    let shown = if label.is_empty() {
        target.as_str()
    } else {
        label.as_str()
    };
    format!("{TOKEN_OPEN}{shown}{TOKEN_SEPARATOR}{target}{TOKEN_CLOSE}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub range: Range<usize>,
    pub label: String,
    pub target: ReferenceId,
}

/// Every well-formed token in `text`, in order. Malformed fragments are
/// left alone and read as plain text.
pub fn parse_tokens(text: &str) -> Vec<TokenSpan> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(TOKEN_OPEN) {
        let start = cursor + found;
        let body_start = start + TOKEN_OPEN.len_utf8();
        let Some(delimiter) = text[body_start..].find(is_delimiter) else {
            break;
        };
        let body_end = body_start + delimiter;
        if !text[body_end..].starts_with(TOKEN_CLOSE) {
            // a second opener; restart the scan from it
            cursor = body_end;
            continue;
        }

        let end = body_end + TOKEN_CLOSE.len_utf8();
        if let Some(span) = parse_body(&text[body_start..body_end], start..end) {
            tokens.push(span);
        }
        cursor = end;
    }

    tokens
}

fn parse_body(body: &str, range: Range<usize>) -> Option<TokenSpan> {
    let (label, id) = body.rsplit_once(TOKEN_SEPARATOR)?;
    if !is_valid_reference_id(id) || label.contains(TRIGGER) {
        return None;
    }
    Some(TokenSpan {
        range,
        label: label.to_owned(),
        target: ReferenceId::new(id),
    })
}

#[cfg(test)]
mod tests {
    use super::{format_token, is_valid_reference_id, parse_tokens, sanitize_label};
    use crate::ReferenceId;

    #[test]
    fn token_wraps_label_and_id() {
        let token = format_token("John Doe", &ReferenceId::new("field_1"));
        assert_eq!(token, "«John Doe|field_1»");
    }

    #[test]
    fn empty_labels_fall_back_to_id() {
        let token = format_token("«»", &ReferenceId::new("title"));
        assert_eq!(token, "«title|title»");
    }

    #[test]
    fn labels_lose_delimiters_and_triggers() {
        assert_eq!(sanitize_label(" ping @ops\nnow "), "ping ops now");
    }

    #[test]
    fn reference_ids_reject_reserved_characters() {
        assert!(is_valid_reference_id("team:3f2a"));
        assert!(!is_valid_reference_id(""));
        assert!(!is_valid_reference_id("a b"));
        assert!(!is_valid_reference_id("a|b"));
        assert!(!is_valid_reference_id("a@b"));
    }

    #[test]
    fn parse_finds_tokens_with_byte_ranges() {
        let text = "Hi «John Doe|field_1» and «A|B|title»";
        let tokens = parse_tokens(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(&text[tokens[0].range.clone()], "«John Doe|field_1»");
        assert_eq!(tokens[0].label, "John Doe");
        assert_eq!(tokens[1].label, "A|B");
        assert_eq!(tokens[1].target.as_str(), "title");
    }

    #[test]
    fn parse_skips_malformed_fragments() {
        let text = "«open «Name|id» «no-id» «x|»";
        let tokens = parse_tokens(text);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].label, "Name");
    }
}
