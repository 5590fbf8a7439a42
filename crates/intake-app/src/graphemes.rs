// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let width = UnicodeWidthStr::width(part);
            if i > 0 { width + 4 } else { width }
        })
        .sum()
}

/// Next grapheme boundary after `offset`, or `None` at the end.
pub fn next_grapheme_boundary(s: &str, offset: usize) -> Option<usize> {
    if offset >= s.len() {
        return None;
    }
    match s[offset..].grapheme_indices(true).nth(1) {
        Some((i, _)) => Some(offset + i),
        None => Some(s.len()),
    }
}

/// Previous grapheme boundary before `offset`, or `None` at the start.
pub fn prev_grapheme_boundary(s: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return None;
    }
    s[..offset].grapheme_indices(true).last().map(|(i, _)| i)
}

/// Largest char boundary at or below `offset`, clamped to the string.
pub fn floor_char_boundary(s: &str, offset: usize) -> usize {
    let mut offset = offset.min(s.len());
    while !s.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

pub fn line_start(s: &str, offset: usize) -> usize {
    s[..offset].rfind('\n').map_or(0, |i| i + 1)
}

pub fn line_end(s: &str, offset: usize) -> usize {
    s[offset..].find('\n').map_or(s.len(), |i| offset + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_counts_wide_and_tabs() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(display_width("a\tb"), 6);
    }

    #[test]
    fn grapheme_steps_keep_clusters_whole() {
        let s = "e\u{301}x";
        assert_eq!(next_grapheme_boundary(s, 0), Some(3));
        assert_eq!(prev_grapheme_boundary(s, 3), Some(0));
        assert_eq!(next_grapheme_boundary(s, 4), None);
        assert_eq!(prev_grapheme_boundary(s, 0), None);
    }

    #[test]
    fn floor_boundary_backs_out_of_multibyte_chars() {
        let s = "a«b";
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 99), s.len());
    }

    #[test]
    fn line_bounds() {
        let s = "one\ntwo\nthree";
        assert_eq!(line_start(s, 5), 4);
        assert_eq!(line_end(s, 5), 7);
        assert_eq!(line_start(s, 2), 0);
        assert_eq!(line_end(s, 9), s.len());
    }
}
