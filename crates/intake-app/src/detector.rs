// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Trigger detection and picker anchoring.
//!
//! Both halves are pure: the controller re-runs [`detect`] after every edit
//! and only measures an anchor when the decision is to open.

use crate::graphemes::{display_width, floor_char_boundary, line_start};
use crate::token::{TOKEN_OPEN, is_delimiter};

pub const TRIGGER: char = '@';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Byte offset of the trigger character.
    pub position: usize,
    /// Lowercased text between the trigger and the caret.
    pub search_term: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Open(Trigger),
    Close,
}

/// Finds the live trigger for `caret`, if any.
///
/// The nearest `@` before the caret opens a search when it starts the text or
/// follows whitespace. Token delimiters end the scan, so a serialized token
/// between the trigger and the caret keeps the picker closed.
pub fn find_trigger(text: &str, caret: usize) -> Option<Trigger> {
    let caret = floor_char_boundary(text, caret);
    let before = &text[..caret];

    let (position, _) = before
        .char_indices()
        .rev()
        .find(|(_, c)| *c == TRIGGER || is_delimiter(*c))
        .filter(|(_, c)| *c == TRIGGER)?;

    let starts_word = before[..position]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace);
    if !starts_word {
        return None;
    }
    if text[position + TRIGGER.len_utf8()..].starts_with(TOKEN_OPEN) {
        return None;
    }

    Some(Trigger {
        position,
        search_term: before[position + TRIGGER.len_utf8()..].to_lowercase(),
    })
}

pub fn detect(text: &str, caret: usize) -> TriggerDecision {
    match find_trigger(text, caret) {
        Some(trigger) => TriggerDecision::Open(trigger),
        None => TriggerDecision::Close,
    }
}

/// Measures rendered text for anchor placement.
pub trait TextMetrics {
    fn text_width(&self, text: &str) -> u16;
    fn line_height(&self) -> u16;
}

/// Terminal metrics: one row per line, widths in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellMetrics;

impl TextMetrics for CellMetrics {
    fn text_width(&self, text: &str) -> u16 {
        u16::try_from(display_width(text)).unwrap_or(u16::MAX)
    }

    fn line_height(&self) -> u16 {
        1
    }
}

/// Screen rectangle of a text field, including its inner padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    pub padding_left: u16,
    pub padding_top: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub top: u16,
    pub left: u16,
}

/// Screen position of the trigger character inside `rect`.
///
/// `text` must be the text as displayed; callers rendering badges project
/// their text first (see [`crate::badge::project`]). The result is clamped
/// to the rectangle.
pub fn measure_caret_anchor(
    text: &str,
    trigger_pos: usize,
    metrics: &impl TextMetrics,
    rect: FieldRect,
) -> Point {
    let trigger_pos = floor_char_boundary(text, trigger_pos);
    let line_index = text[..trigger_pos].matches('\n').count();
    let line_from = line_start(text, trigger_pos);
    let through_trigger = text[trigger_pos..]
        .chars()
        .next()
        .map_or(trigger_pos, |c| trigger_pos + c.len_utf8());

    let line_index = u16::try_from(line_index).unwrap_or(u16::MAX);
    let top = rect
        .y
        .saturating_add(rect.padding_top)
        .saturating_add(line_index.saturating_mul(metrics.line_height()));
    let left = rect
        .x
        .saturating_add(rect.padding_left)
        .saturating_add(metrics.text_width(&text[line_from..through_trigger]));

    let bottom_edge = rect.y.saturating_add(rect.height.saturating_sub(1));
    let right_edge = rect.x.saturating_add(rect.width.saturating_sub(1));
    Point {
        top: top.min(bottom_edge),
        left: left.min(right_edge),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CellMetrics, FieldRect, Point, TextMetrics, Trigger, TriggerDecision, detect,
        find_trigger, measure_caret_anchor,
    };

    fn open(position: usize, term: &str) -> Option<Trigger> {
        Some(Trigger {
            position,
            search_term: term.to_owned(),
        })
    }

    #[test]
    fn trigger_at_start_opens_with_empty_term() {
        assert_eq!(find_trigger("@", 1), open(0, ""));
    }

    #[test]
    fn search_term_is_lowercased() {
        assert_eq!(find_trigger("ping @JoHn", 10), open(5, "john"));
    }

    #[test]
    fn search_term_may_span_words() {
        assert_eq!(find_trigger("@john d", 7), open(0, "john d"));
    }

    #[test]
    fn trigger_inside_a_word_stays_closed() {
        assert_eq!(find_trigger("mail me@example.com", 19), None);
    }

    #[test]
    fn trigger_after_newline_opens() {
        assert_eq!(find_trigger("line\n@a", 7), open(5, "a"));
    }

    #[test]
    fn caret_before_trigger_stays_closed() {
        assert_eq!(detect("abc @x", 3), TriggerDecision::Close);
    }

    #[test]
    fn deleting_the_trigger_closes() {
        assert_eq!(detect("hello jo", 8), TriggerDecision::Close);
    }

    #[test]
    fn token_between_trigger_and_caret_stays_closed() {
        let text = "@a «Ann|a» b";
        assert_eq!(find_trigger(text, text.len()), None);
    }

    #[test]
    fn trigger_followed_by_token_opener_stays_closed() {
        let text = "@«Ann|a»";
        assert_eq!(find_trigger(text, 1), None);
    }

    #[test]
    fn caret_inside_multibyte_char_is_floored() {
        let text = "@é";
        assert_eq!(find_trigger(text, 2), open(0, ""));
    }

    #[test]
    fn anchor_counts_lines_and_prefix_width() {
        let rect = FieldRect {
            x: 10,
            y: 4,
            width: 40,
            height: 6,
            padding_left: 1,
            padding_top: 1,
        };
        let text = "first line\nhi @jo";
        let anchor = measure_caret_anchor(text, 14, &CellMetrics, rect);
        assert_eq!(anchor, Point { top: 6, left: 15 });
    }

    #[test]
    fn anchor_is_clamped_to_field() {
        let rect = FieldRect {
            x: 0,
            y: 0,
            width: 5,
            height: 1,
            ..FieldRect::default()
        };
        let anchor = measure_caret_anchor("a long prefix @", 14, &CellMetrics, rect);
        assert_eq!(anchor, Point { top: 0, left: 4 });
    }

    struct Proportional;

    impl TextMetrics for Proportional {
        fn text_width(&self, text: &str) -> u16 {
            text.chars().map(|c| if c == 'm' { 3 } else { 2 }).sum()
        }

        fn line_height(&self) -> u16 {
            20
        }
    }

    #[test]
    fn anchor_uses_supplied_metrics() {
        let rect = FieldRect {
            width: 500,
            height: 200,
            padding_left: 8,
            ..FieldRect::default()
        };
        let anchor = measure_caret_anchor("m\nmm @", 5, &Proportional, rect);
        assert_eq!(anchor, Point { top: 20, left: 8 + 3 + 3 + 2 + 2 });
    }
}
