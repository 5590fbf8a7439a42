// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ReferenceId;
use crate::graphemes::display_width;
use crate::token::{format_token, parse_tokens, sanitize_label};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MentionError {
    #[error("no trigger found before caret at {caret}")]
    TriggerNotFound { caret: usize },
    #[error("mention index out of range: {0}")]
    IndexOutOfRange(usize),
    #[error("offset {offset} is not a char boundary in a {len}-byte text")]
    InvalidOffset { offset: usize, len: usize },
    #[error("edit at {start}..{end} would split a mention")]
    SplitsMention { start: usize, end: usize },
    #[error("invalid reference id {0:?}")]
    InvalidReference(String),
}

/// One inline reference. Offsets are byte offsets into the owning text and
/// always cover exactly the serialized token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub target: ReferenceId,
    pub label: String,
    pub start: usize,
    pub end: usize,
    /// Cells the badge occupies on screen.
    pub rendered_len: usize,
}

impl Mention {
    pub fn new(target: ReferenceId, label: &str, start: usize) -> Self {
        let token = format_token(label, &target);
        let label = match sanitize_label(label) {
            clean if clean.is_empty() => target.as_str().to_owned(),
            clean => clean,
        };
        Self {
            rendered_len: display_width(&badge_text(&label)),
            end: start + token.len(),
            target,
            label,
            start,
        }
    }

    pub fn token(&self) -> String {
        format_token(&self.label, &self.target)
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

pub fn badge_text(label: &str) -> String {
    format!("@{label} \u{d7}")
}

/// Mentions of one text value, sorted by start and never overlapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSet {
    mentions: Vec<Mention>,
}

impl MentionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds mentions from the tokens already present in `text`.
    pub fn from_text(text: &str) -> Self {
        let mentions = parse_tokens(text)
            .into_iter()
            .map(|token| Mention::new(token.target, &token.label, token.range.start))
            .collect::<Vec<_>>();
        let mut set = Self { mentions };
        // a label that sanitizes differently would no longer match its span
        set.retain_matching(text);
        set
    }

    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Mention> {
        self.mentions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mention> {
        self.mentions.iter()
    }

    pub fn as_slice(&self) -> &[Mention] {
        &self.mentions
    }

    pub fn mention_ending_at(&self, pos: usize) -> Option<usize> {
        self.mentions.iter().position(|mention| mention.end == pos)
    }

    pub fn mention_starting_at(&self, pos: usize) -> Option<usize> {
        self.mentions.iter().position(|mention| mention.start == pos)
    }

    /// Mention whose interior (excluding both edges) holds `pos`.
    pub fn mention_containing(&self, pos: usize) -> Option<usize> {
        self.mentions
            .iter()
            .position(|mention| mention.start < pos && pos < mention.end)
    }

    pub fn insert(&mut self, mention: Mention) -> Result<usize, MentionError> {
        if let Some(existing) = self
            .mentions
            .iter()
            .find(|existing| existing.start < mention.end && mention.start < existing.end)
        {
            return Err(MentionError::SplitsMention {
                start: existing.start,
                end: existing.end,
            });
        }
        let index = self
            .mentions
            .partition_point(|existing| existing.start < mention.start);
        self.mentions.insert(index, mention);
        Ok(index)
    }

    /// Keeps offsets in step with a text edit that replaced `range` with
    /// `inserted_len` bytes. Mentions touched by the edit are dropped whole
    /// and returned.
    pub fn apply_edit(&mut self, range: Range<usize>, inserted_len: usize) -> Vec<Mention> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.mentions.len());

        for mut mention in self.mentions.drain(..) {
            if mention.end <= range.start {
                kept.push(mention);
            } else if mention.start >= range.end {
                let offset = mention.start - range.end;
                let len = mention.len();
                mention.start = range.start + inserted_len + offset;
                mention.end = mention.start + len;
                kept.push(mention);
            } else {
                removed.push(mention);
            }
        }

        self.mentions = kept;
        removed
    }

    /// Drops every mention that no longer covers its own token in `text`.
    /// Each drop is an offset bug upstream, so it is logged loudly.
    pub fn retain_valid(&mut self, text: &str) -> Vec<Mention> {
        let dropped = self.retain_matching(text);
        for mention in &dropped {
            tracing::error!(
                reference = %mention.target,
                start = mention.start,
                end = mention.end,
                text_len = text.len(),
                "dropping mention with stale offsets"
            );
        }
        dropped
    }

    pub fn is_consistent(&self, text: &str) -> bool {
        let mut prev_end = 0;
        self.mentions.iter().all(|mention| {
            let ok = mention_matches(mention, text) && mention.start >= prev_end;
            prev_end = mention.end;
            ok
        })
    }

    fn retain_matching(&mut self, text: &str) -> Vec<Mention> {
        let mut dropped = Vec::new();
        let mut prev_end = 0;
        self.mentions.retain(|mention| {
            if mention.start >= prev_end && mention_matches(mention, text) {
                prev_end = mention.end;
                true
            } else {
                dropped.push(mention.clone());
                false
            }
        });
        dropped
    }
}

fn mention_matches(mention: &Mention, text: &str) -> bool {
    mention.start < mention.end
        && mention.end <= text.len()
        && text.is_char_boundary(mention.start)
        && text.is_char_boundary(mention.end)
        && text[mention.start..mention.end] == mention.token()
}

impl<'a> IntoIterator for &'a MentionSet {
    type Item = &'a Mention;
    type IntoIter = std::slice::Iter<'a, Mention>;

    fn into_iter(self) -> Self::IntoIter {
        self.mentions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{Mention, MentionError, MentionSet, badge_text};
    use crate::ReferenceId;

    fn mention(id: &str, label: &str, start: usize) -> Mention {
        Mention::new(ReferenceId::new(id), label, start)
    }

    fn sample() -> (String, MentionSet) {
        let text = "Hi «Ann|a» and «Bo|b» ".to_owned();
        (text.clone(), MentionSet::from_text(&text))
    }

    #[test]
    fn new_mentions_span_their_token() {
        let mention = mention("field_1", "John Doe", 3);
        assert_eq!(mention.len(), "«John Doe|field_1»".len());
        assert_eq!(mention.rendered_len, badge_text("John Doe").chars().count());
    }

    #[test]
    fn from_text_rebuilds_in_order() {
        let (text, set) = sample();
        assert_eq!(set.len(), 2);
        let first = set.get(0).expect("first mention");
        assert_eq!(&text[first.range()], "«Ann|a»");
        assert!(set.is_consistent(&text));
    }

    #[test]
    fn boundary_queries() {
        let (_, set) = sample();
        let first = set.get(0).expect("first mention").clone();
        assert_eq!(set.mention_starting_at(first.start), Some(0));
        assert_eq!(set.mention_ending_at(first.end), Some(0));
        assert_eq!(set.mention_containing(first.start + 2), Some(0));
        assert_eq!(set.mention_containing(first.start), None);
        assert_eq!(set.mention_ending_at(0), None);
    }

    #[test]
    fn edits_before_a_mention_shift_it() {
        let (mut text, mut set) = sample();
        text.insert_str(0, "Oh, ");
        let removed = set.apply_edit(0..0, 4);
        assert!(removed.is_empty());
        assert!(set.is_consistent(&text));
    }

    #[test]
    fn edits_after_a_mention_leave_it() {
        let (mut text, mut set) = sample();
        let before = set.get(0).expect("first mention").clone();
        text.push_str("tail");
        let len = text.len();
        set.apply_edit(len - 4..len - 4, 4);
        assert_eq!(set.get(0), Some(&before));
        assert!(set.is_consistent(&text));
    }

    #[test]
    fn edits_inside_a_mention_remove_it() {
        let (mut text, mut set) = sample();
        let first = set.get(0).expect("first mention").clone();
        text.replace_range(first.start + 2..first.start + 3, "");
        let removed = set.apply_edit(first.start + 2..first.start + 3, 0);
        assert_eq!(removed, vec![first]);
        assert_eq!(set.len(), 1);
        assert!(set.is_consistent(&text));
    }

    #[test]
    fn insert_rejects_overlap() {
        let (_, mut set) = sample();
        let start = set.get(0).expect("first mention").start + 1;
        let err = set.insert(mention("c", "C", start)).expect_err("overlap");
        assert!(matches!(err, MentionError::SplitsMention { .. }));
    }

    #[test]
    fn retain_valid_drops_stale_offsets() {
        let (text, mut set) = sample();
        let truncated = &text[..8];
        let dropped = set.retain_valid(truncated);
        assert_eq!(dropped.len(), 2);
        assert!(set.is_empty());
    }
}
