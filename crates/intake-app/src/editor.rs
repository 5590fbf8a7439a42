// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::ops::Range;

use crate::detector::{Trigger, find_trigger};
use crate::badge::{caret_from_visual, line_ranges, visual_position};
use crate::graphemes::{
    floor_char_boundary, line_end, line_start, next_grapheme_boundary, prev_grapheme_boundary,
};
use crate::mention::{Mention, MentionError, MentionSet};
use crate::picker::Candidate;
use crate::ReferenceId;
use crate::token::{format_token, is_valid_reference_id};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Edited,
    MentionRemoved(Mention),
}

/// An editable text value with inline mentions and a caret.
///
/// Every mutation goes through [`MentionText::replace_range`], which keeps
/// mention offsets aligned with the text. The caret never rests inside a
/// mention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionText {
    text: String,
    caret: usize,
    mentions: MentionSet,
    multiline: bool,
}

impl MentionText {
    pub fn new(multiline: bool) -> Self {
        Self {
            multiline,
            ..Self::default()
        }
    }

    /// Loads persisted text, rebuilding mentions from its tokens. The caret
    /// lands at the end.
    pub fn from_text(text: &str, multiline: bool) -> Self {
        let mut value = Self::new(multiline);
        value.set_text(text);
        value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn mentions(&self) -> &MentionSet {
        &self.mentions
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub fn trigger(&self) -> Option<Trigger> {
        find_trigger(&self.text, self.caret)
    }

    /// Replaces the whole value from outside the editor.
    pub fn set_text(&mut self, text: &str) {
        self.text = self.normalize(text);
        self.mentions = MentionSet::from_text(&self.text);
        self.caret = self.text.len();
    }

    pub fn insert_str(&mut self, inserted: &str) -> EditOutcome {
        if inserted.is_empty() {
            return EditOutcome::Unchanged;
        }
        let inserted = self.normalize(inserted);
        let at = self.caret;
        match self.replace_range(at..at, &inserted) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(error = %err, "insert rejected");
                EditOutcome::Unchanged
            }
        }
    }

    pub fn insert_char(&mut self, c: char) -> EditOutcome {
        let mut buf = [0; 4];
        self.insert_str(c.encode_utf8(&mut buf))
    }

    /// Replaces `range` with `replacement` and parks the caret after it.
    ///
    /// Mentions touched by the range are removed whole; later mentions shift.
    /// Ranges must sit on char boundaries.
    pub fn replace_range(
        &mut self,
        range: Range<usize>,
        replacement: &str,
    ) -> Result<EditOutcome, MentionError> {
        for offset in [range.start, range.end] {
            if offset > self.text.len() || !self.text.is_char_boundary(offset) {
                return Err(MentionError::InvalidOffset {
                    offset,
                    len: self.text.len(),
                });
            }
        }
        if range.start > range.end {
            return Err(MentionError::InvalidOffset {
                offset: range.start,
                len: self.text.len(),
            });
        }

        self.text.replace_range(range.clone(), replacement);
        let mut removed = self.mentions.apply_edit(range.clone(), replacement.len());
        self.caret = range.start + replacement.len();
        self.resync_mentions();
        // an edit inside a token that still parses keeps the mention
        removed.retain(|gone| {
            !self
                .mentions
                .iter()
                .any(|kept| kept.start == gone.start && kept.target == gone.target)
        });

        Ok(match removed.pop() {
            Some(mention) if removed.is_empty() => EditOutcome::MentionRemoved(mention),
            _ => EditOutcome::Edited,
        })
    }

    /// Deletes one grapheme, or the whole mention ending at the caret.
    pub fn backspace(&mut self) -> EditOutcome {
        if let Some(index) = self.mentions.mention_ending_at(self.caret) {
            return self
                .remove_mention(index)
                .map_or(EditOutcome::Unchanged, EditOutcome::MentionRemoved);
        }
        let Some(prev) = prev_grapheme_boundary(&self.text, self.caret) else {
            return EditOutcome::Unchanged;
        };
        self.replace_range(prev..self.caret, "")
            .unwrap_or(EditOutcome::Unchanged)
    }

    /// Deletes one grapheme, or the whole mention starting at the caret.
    pub fn delete_forward(&mut self) -> EditOutcome {
        if let Some(index) = self.mentions.mention_starting_at(self.caret) {
            return self
                .remove_mention(index)
                .map_or(EditOutcome::Unchanged, EditOutcome::MentionRemoved);
        }
        let Some(next) = next_grapheme_boundary(&self.text, self.caret) else {
            return EditOutcome::Unchanged;
        };
        let caret = self.caret;
        self.replace_range(caret..next, "")
            .unwrap_or(EditOutcome::Unchanged)
    }

    pub fn move_left(&mut self) {
        if let Some(index) = self.mentions.mention_ending_at(self.caret) {
            self.caret = self.mentions.as_slice()[index].start;
        } else if let Some(prev) = prev_grapheme_boundary(&self.text, self.caret) {
            self.caret = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(index) = self.mentions.mention_starting_at(self.caret) {
            self.caret = self.mentions.as_slice()[index].end;
        } else if let Some(next) = next_grapheme_boundary(&self.text, self.caret) {
            self.caret = next;
        }
    }

    pub fn move_home(&mut self) {
        self.caret = if self.multiline {
            line_start(&self.text, self.caret)
        } else {
            0
        };
    }

    pub fn move_end(&mut self) {
        self.caret = if self.multiline {
            line_end(&self.text, self.caret)
        } else {
            self.text.len()
        };
    }

    /// Moves to the previous line at the same screen column. Returns false
    /// on the first line.
    pub fn move_up(&mut self) -> bool {
        let (row, col) = visual_position(&self.text, &self.mentions, self.caret);
        if row == 0 {
            return false;
        }
        self.caret = caret_from_visual(&self.text, &self.mentions, row - 1, col);
        true
    }

    /// Moves to the next line at the same screen column. Returns false on
    /// the last line.
    pub fn move_down(&mut self) -> bool {
        let (row, col) = visual_position(&self.text, &self.mentions, self.caret);
        if row + 1 >= line_ranges(&self.text).len() {
            return false;
        }
        self.caret = caret_from_visual(&self.text, &self.mentions, row + 1, col);
        true
    }

    /// Places the caret, snapping out of a mention to its end.
    pub fn set_caret(&mut self, pos: usize) {
        let pos = floor_char_boundary(&self.text, pos);
        self.caret = match self.mentions.mention_containing(pos) {
            Some(index) => self.mentions.as_slice()[index].end,
            None => pos,
        };
    }

    /// Turns the live `@search` before the caret into a mention of
    /// `candidate`, followed by one space.
    ///
    /// Fails closed: without a trigger nothing is modified.
    pub fn commit_reference(&mut self, candidate: &Candidate) -> Result<usize, MentionError> {
        if !is_valid_reference_id(candidate.id.as_str()) {
            return Err(MentionError::InvalidReference(
                candidate.id.as_str().to_owned(),
            ));
        }
        let trigger = self
            .trigger()
            .ok_or(MentionError::TriggerNotFound { caret: self.caret })?;

        let token = format_token(&candidate.label, &candidate.id);
        let caret = self.caret;
        self.text
            .replace_range(trigger.position..caret, &format!("{token} "));
        self.mentions
            .apply_edit(trigger.position..caret, token.len() + 1);

        let mention = Mention::new(candidate.id.clone(), &candidate.label, trigger.position);
        self.mentions.insert(mention)?;
        self.caret = trigger.position + token.len() + 1;
        self.resync_mentions();
        self.mentions
            .mention_starting_at(trigger.position)
            .ok_or(MentionError::IndexOutOfRange(trigger.position))
    }

    /// Inserts a mention token at `pos` with no trailing space.
    pub fn insert_mention_at(
        &mut self,
        pos: usize,
        target: &ReferenceId,
        label: &str,
    ) -> Result<usize, MentionError> {
        if !is_valid_reference_id(target.as_str()) {
            return Err(MentionError::InvalidReference(target.as_str().to_owned()));
        }
        if pos > self.text.len() || !self.text.is_char_boundary(pos) {
            return Err(MentionError::InvalidOffset {
                offset: pos,
                len: self.text.len(),
            });
        }
        if let Some(index) = self.mentions.mention_containing(pos) {
            let existing = &self.mentions.as_slice()[index];
            return Err(MentionError::SplitsMention {
                start: existing.start,
                end: existing.end,
            });
        }

        let token = format_token(label, target);
        self.text.insert_str(pos, &token);
        self.mentions.apply_edit(pos..pos, token.len());
        self.mentions.insert(Mention::new(target.clone(), label, pos))?;
        self.caret = pos + token.len();
        self.resync_mentions();
        self.mentions
            .mention_starting_at(pos)
            .ok_or(MentionError::IndexOutOfRange(pos))
    }

    /// Removes a mention and its token atomically, the same way backspace at
    /// its end would.
    pub fn remove_mention(&mut self, index: usize) -> Result<Mention, MentionError> {
        let mention = self
            .mentions
            .get(index)
            .cloned()
            .ok_or(MentionError::IndexOutOfRange(index))?;

        let caret = self.caret;
        self.text.replace_range(mention.range(), "");
        self.mentions.apply_edit(mention.range(), 0);
        self.caret = if caret >= mention.end {
            caret - mention.len()
        } else {
            caret.min(mention.start)
        };
        self.resync_mentions();
        Ok(mention)
    }

    fn normalize(&self, text: &str) -> String {
        if self.multiline {
            text.replace("\r\n", "\n").replace('\r', "\n")
        } else {
            text.replace("\r\n", " ").replace(['\r', '\n'], " ")
        }
    }

    /// Checks the tracked offsets, then adopts exactly the mentions that
    /// reloading the text would produce. Plain edits can complete or break a
    /// token, so the two must never disagree.
    fn resync_mentions(&mut self) {
        let dropped = self.mentions.retain_valid(&self.text);
        debug_assert!(dropped.is_empty(), "mention offsets drifted: {dropped:?}");

        let parsed = MentionSet::from_text(&self.text);
        if parsed != self.mentions {
            tracing::debug!(
                tracked = self.mentions.len(),
                parsed = parsed.len(),
                "mentions follow the edited tokens"
            );
            self.mentions = parsed;
        }
        if let Some(index) = self.mentions.mention_containing(self.caret) {
            self.caret = self.mentions.as_slice()[index].end;
        }
    }
}
