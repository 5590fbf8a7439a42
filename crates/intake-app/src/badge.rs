// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Screen layout of a mention-bearing text value.
//!
//! The underlying string keeps its real tokens; on screen each mention takes
//! `rendered_len` cells as `@Label ×`. These helpers translate between the
//! two so clicks and cursor drawing agree with what is shown.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::graphemes::display_width;
use crate::mention::{MentionSet, badge_text};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(Range<usize>),
    /// Index into the mention set.
    Badge(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeHit {
    Body,
    /// The trailing `×` cell.
    Remove,
}

/// Byte range of every line, excluding the newline.
pub fn line_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, _) in text.match_indices('\n') {
        ranges.push(start..i);
        start = i + 1;
    }
    ranges.push(start..text.len());
    ranges
}

/// Splits each line into plain runs and badges.
pub fn line_segments(text: &str, mentions: &MentionSet) -> Vec<Vec<Segment>> {
    line_ranges(text)
        .into_iter()
        .map(|line| {
            let mut segments = Vec::new();
            let mut cursor = line.start;
            for (index, mention) in mentions.iter().enumerate() {
                if mention.start < line.start || mention.end > line.end {
                    continue;
                }
                if mention.start > cursor {
                    segments.push(Segment::Text(cursor..mention.start));
                }
                segments.push(Segment::Badge(index));
                cursor = mention.end;
            }
            if cursor < line.end {
                segments.push(Segment::Text(cursor..line.end));
            }
            segments
        })
        .collect()
}

/// Row and display column of byte offset `pos`.
pub fn visual_position(text: &str, mentions: &MentionSet, pos: usize) -> (usize, usize) {
    let lines = line_ranges(text);
    let row = lines
        .iter()
        .position(|line| pos <= line.end)
        .unwrap_or(lines.len() - 1);
    let segments = line_segments(text, mentions);

    let mut col = 0;
    for segment in &segments[row] {
        match segment {
            Segment::Text(range) => {
                if pos <= range.start {
                    break;
                }
                col += display_width(&text[range.start..pos.min(range.end)]);
            }
            Segment::Badge(index) => {
                let mention = &mentions.as_slice()[*index];
                if pos < mention.end {
                    break;
                }
                col += mention.rendered_len;
            }
        }
    }
    (row, col)
}

/// Caret offset for a click at `row`/`col`. A click anywhere on a badge
/// lands after it; past the end of a line lands at the line end.
pub fn caret_from_visual(text: &str, mentions: &MentionSet, row: usize, col: usize) -> usize {
    let lines = line_ranges(text);
    let row = row.min(lines.len() - 1);
    let segments = line_segments(text, mentions);

    let mut acc = 0;
    for segment in &segments[row] {
        match segment {
            Segment::Text(range) => {
                for (i, grapheme) in text[range.clone()].grapheme_indices(true) {
                    let width = display_width(grapheme);
                    if col < acc + width {
                        return range.start + i;
                    }
                    acc += width;
                }
            }
            Segment::Badge(index) => {
                let mention = &mentions.as_slice()[*index];
                if col < acc + mention.rendered_len {
                    return mention.end;
                }
                acc += mention.rendered_len;
            }
        }
    }
    lines[row].end
}

/// Mention under a click, and which part of the badge was hit.
pub fn badge_at_visual(
    text: &str,
    mentions: &MentionSet,
    row: usize,
    col: usize,
) -> Option<(usize, BadgeHit)> {
    let segments = line_segments(text, mentions);
    let mut acc = 0;
    for segment in segments.get(row)? {
        match segment {
            Segment::Text(range) => acc += display_width(&text[range.clone()]),
            Segment::Badge(index) => {
                let width = mentions.as_slice()[*index].rendered_len;
                if col < acc + width {
                    let hit = if col + 1 == acc + width {
                        BadgeHit::Remove
                    } else {
                        BadgeHit::Body
                    };
                    return Some((*index, hit));
                }
                acc += width;
            }
        }
        if col < acc {
            return None;
        }
    }
    None
}

/// The text as displayed, with `pos` mapped into it. Used to measure the
/// picker anchor against what the user actually sees.
pub fn project(text: &str, mentions: &MentionSet, pos: usize) -> (String, usize) {
    let mut shown = String::with_capacity(text.len());
    let mut mapped = None;
    let mut cursor = 0;

    for mention in mentions {
        if mapped.is_none() && pos <= mention.start {
            mapped = Some(shown.len() + pos.saturating_sub(cursor));
        }
        shown.push_str(&text[cursor..mention.start]);
        shown.push_str(&badge_text(&mention.label));
        cursor = mention.end;
    }
    let mapped = mapped.unwrap_or(shown.len() + pos.saturating_sub(cursor));
    shown.push_str(&text[cursor..]);
    (shown, mapped)
}

#[cfg(test)]
mod tests {
    use super::{
        BadgeHit, Segment, badge_at_visual, caret_from_visual, line_segments, project,
        visual_position,
    };
    use crate::mention::MentionSet;

    const TEXT: &str = "Hi «Ann|a» x\n«Bo|b»";

    fn mentions() -> MentionSet {
        MentionSet::from_text(TEXT)
    }

    #[test]
    fn segments_split_lines_and_badges() {
        let segments = line_segments(TEXT, &mentions());
        assert_eq!(
            segments,
            vec![
                vec![
                    Segment::Text(0..3),
                    Segment::Badge(0),
                    Segment::Text(12..14)
                ],
                vec![Segment::Badge(1)],
            ]
        );
    }

    #[test]
    fn positions_count_badge_width() {
        let set = mentions();
        // "Hi " + "@Ann ×" is 9 cells
        assert_eq!(visual_position(TEXT, &set, 12), (0, 9));
        assert_eq!(visual_position(TEXT, &set, 3), (0, 3));
        assert_eq!(visual_position(TEXT, &set, TEXT.len()), (1, 5));
    }

    #[test]
    fn clicking_a_badge_lands_after_it() {
        let set = mentions();
        assert_eq!(caret_from_visual(TEXT, &set, 0, 4), 12);
        assert_eq!(caret_from_visual(TEXT, &set, 0, 1), 1);
        assert_eq!(caret_from_visual(TEXT, &set, 0, 99), 14);
        assert_eq!(caret_from_visual(TEXT, &set, 7, 0), TEXT.len());
    }

    #[test]
    fn badge_hits_distinguish_remove_cell() {
        let set = mentions();
        assert_eq!(badge_at_visual(TEXT, &set, 0, 3), Some((0, BadgeHit::Body)));
        assert_eq!(badge_at_visual(TEXT, &set, 0, 8), Some((0, BadgeHit::Remove)));
        assert_eq!(badge_at_visual(TEXT, &set, 0, 10), None);
        assert_eq!(badge_at_visual(TEXT, &set, 1, 0), Some((1, BadgeHit::Body)));
    }

    #[test]
    fn projection_substitutes_badges() {
        let set = mentions();
        let (shown, pos) = project(TEXT, &set, 13);
        assert_eq!(shown, "Hi @Ann × x\n@Bo ×");
        assert_eq!(&shown[..pos], "Hi @Ann × ");
    }
}
