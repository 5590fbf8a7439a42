// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FieldType, FormField, ReferenceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalKind {
    Team,
    Project,
    WorkflowState,
    Label,
    Member,
}

impl ExternalKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Project => "project",
            Self::WorkflowState => "state",
            Self::Label => "label",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "team" => Some(Self::Team),
            "project" => Some(Self::Project),
            "state" => Some(Self::WorkflowState),
            "label" => Some(Self::Label),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Kind and raw tracker id of a prefixed reference such as `team:abc`.
    pub fn split_reference(reference: &ReferenceId) -> Option<(Self, &str)> {
        let (kind, raw) = reference.as_str().split_once(':')?;
        Some((Self::parse(kind)?, raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Field(FieldType),
    External(ExternalKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ReferenceId,
    pub label: String,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn field(field: &FormField) -> Self {
        Self {
            id: ReferenceId::from(&field.id),
            label: field.label.clone(),
            kind: CandidateKind::Field(field.field_type),
        }
    }

    pub fn external(kind: ExternalKind, raw_id: &str, label: impl Into<String>) -> Self {
        Self {
            id: ReferenceId::new(format!("{}:{raw_id}", kind.as_str())),
            label: label.into(),
            kind: CandidateKind::External(kind),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            CandidateKind::Field(field_type) => field_type.as_str(),
            CandidateKind::External(kind) => kind.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerOptions {
    /// Give the picker's search box focus on open. When off, arrow keys work
    /// immediately and typing keeps flowing into the host field.
    pub auto_focus_search: bool,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            auto_focus_search: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Moved(usize),
    Commit(Candidate),
    Close,
    /// Nothing to act on, e.g. Enter over an empty result list.
    Ignored,
}

/// Case-insensitive substring filter over labels, keeping list order and
/// leaving out the owning field.
pub fn filter_candidates<'a>(
    candidates: &'a [Candidate],
    owner: Option<&ReferenceId>,
    search_term: &str,
) -> Vec<&'a Candidate> {
    let needle = search_term.to_lowercase();
    candidates
        .iter()
        .filter(|candidate| Some(&candidate.id) != owner)
        .filter(|candidate| candidate.label.to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    candidates: Vec<Candidate>,
    owner: Option<ReferenceId>,
    search_term: String,
    visible: Vec<usize>,
    focused: Option<usize>,
    options: PickerOptions,
}

impl Picker {
    pub fn new(
        candidates: Vec<Candidate>,
        owner: Option<ReferenceId>,
        search_term: &str,
        options: PickerOptions,
    ) -> Self {
        let mut picker = Self {
            candidates,
            owner,
            search_term: String::new(),
            visible: Vec::new(),
            focused: None,
            options,
        };
        picker.set_search(search_term);
        picker
    }

    pub fn set_search(&mut self, search_term: &str) {
        let term = search_term.to_lowercase();
        if term == self.search_term && !self.visible.is_empty() {
            return;
        }
        self.search_term = term;
        self.focused = None;
        self.refilter();
    }

    /// Swaps the candidate list, keeping focus on the same id when it survives.
    pub fn set_candidates(&mut self, candidates: Vec<Candidate>) {
        let focused_id = self.focused_candidate().map(|candidate| candidate.id.clone());
        self.candidates = candidates;
        self.refilter();
        self.focused = focused_id.and_then(|id| {
            self.visible
                .iter()
                .position(|&index| self.candidates[index].id == id)
        });
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn options(&self) -> PickerOptions {
        self.options
    }

    pub fn search_has_focus(&self) -> bool {
        self.options.auto_focus_search
    }

    pub fn visible(&self) -> Vec<&Candidate> {
        self.visible
            .iter()
            .map(|&index| &self.candidates[index])
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn has_results(&self) -> bool {
        !self.visible.is_empty()
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn focused_candidate(&self) -> Option<&Candidate> {
        self.focused
            .and_then(|row| self.visible.get(row))
            .map(|&index| &self.candidates[index])
    }

    pub fn handle_key(&mut self, key: PickerKey) -> PickerOutcome {
        match key {
            PickerKey::Escape => PickerOutcome::Close,
            PickerKey::Up => self.step(-1),
            PickerKey::Down => self.step(1),
            PickerKey::Enter => {
                let row = self.focused.unwrap_or(0);
                match self.visible.get(row) {
                    Some(&index) => PickerOutcome::Commit(self.candidates[index].clone()),
                    None => PickerOutcome::Ignored,
                }
            }
        }
    }

    pub fn hover(&mut self, row: usize) {
        if row < self.visible.len() {
            self.focused = Some(row);
        }
    }

    /// Commits the row under the pointer. Acting on pointer-down rather than
    /// click means the host field never sees a blur and keeps its caret.
    pub fn pointer_down(&mut self, row: usize) -> PickerOutcome {
        match self.visible.get(row) {
            Some(&index) => {
                self.focused = Some(row);
                PickerOutcome::Commit(self.candidates[index].clone())
            }
            None => PickerOutcome::Ignored,
        }
    }

    fn step(&mut self, delta: isize) -> PickerOutcome {
        let len = self.visible.len();
        if len == 0 {
            return PickerOutcome::Ignored;
        }
        let next = match self.focused {
            None if delta > 0 => 0,
            None => len - 1,
            Some(current) => (current as isize + delta).rem_euclid(len as isize) as usize,
        };
        self.focused = Some(next);
        PickerOutcome::Moved(next)
    }

    fn refilter(&mut self) {
        let needle = &self.search_term;
        self.visible = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| Some(&candidate.id) != self.owner.as_ref())
            .filter(|(_, candidate)| candidate.label.to_lowercase().contains(needle.as_str()))
            .map(|(index, _)| index)
            .collect();
        if self.focused.is_some_and(|row| row >= self.visible.len()) {
            self.focused = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Candidate, CandidateKind, ExternalKind, Picker, PickerKey, PickerOptions, PickerOutcome,
        filter_candidates,
    };
    use crate::{FieldType, ReferenceId};

    fn candidates() -> Vec<Candidate> {
        ["John Doe", "Jane Roe", "Email", "Description"]
            .iter()
            .enumerate()
            .map(|(i, label)| Candidate {
                id: ReferenceId::new(format!("field_{i}")),
                label: (*label).to_owned(),
                kind: CandidateKind::Field(FieldType::Text),
            })
            .collect()
    }

    fn picker(term: &str) -> Picker {
        Picker::new(
            candidates(),
            Some(ReferenceId::new("field_3")),
            term,
            PickerOptions::default(),
        )
    }

    #[test]
    fn filter_is_case_insensitive_and_excludes_owner() {
        let all = candidates();
        let owner = ReferenceId::new("field_0");
        let labels = filter_candidates(&all, Some(&owner), "E")
            .into_iter()
            .map(|candidate| candidate.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["Jane Roe", "Email", "Description"]);
    }

    #[test]
    fn empty_term_lists_everything_but_owner() {
        let picker = picker("");
        assert_eq!(picker.visible_len(), 3);
        assert_eq!(picker.focused(), None);
    }

    #[test]
    fn arrows_wrap_both_ways() {
        let mut picker = picker("");
        assert_eq!(picker.handle_key(PickerKey::Up), PickerOutcome::Moved(2));
        assert_eq!(picker.handle_key(PickerKey::Down), PickerOutcome::Moved(0));
        assert_eq!(picker.handle_key(PickerKey::Up), PickerOutcome::Moved(2));
    }

    #[test]
    fn enter_commits_first_row_when_unfocused() {
        let mut picker = picker("jo");
        match picker.handle_key(PickerKey::Enter) {
            PickerOutcome::Commit(candidate) => assert_eq!(candidate.label, "John Doe"),
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn enter_without_results_is_ignored() {
        let mut picker = picker("zzz");
        assert!(!picker.has_results());
        assert_eq!(picker.handle_key(PickerKey::Enter), PickerOutcome::Ignored);
        assert_eq!(picker.handle_key(PickerKey::Escape), PickerOutcome::Close);
    }

    #[test]
    fn pointer_down_commits_row() {
        let mut picker = picker("");
        match picker.pointer_down(1) {
            PickerOutcome::Commit(candidate) => assert_eq!(candidate.label, "Jane Roe"),
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(picker.pointer_down(9), PickerOutcome::Ignored);
    }

    #[test]
    fn narrowing_search_resets_focus() {
        let mut picker = picker("");
        picker.handle_key(PickerKey::Down);
        picker.set_search("Ja");
        assert_eq!(picker.focused(), None);
        assert_eq!(picker.visible_len(), 1);
    }

    #[test]
    fn new_candidates_keep_focus_by_id() {
        let mut picker = picker("");
        picker.hover(1);
        let mut reordered = candidates();
        reordered.reverse();
        picker.set_candidates(reordered);
        let focused = picker.focused_candidate().expect("focus survives");
        assert_eq!(focused.label, "Jane Roe");
    }

    #[test]
    fn external_candidates_carry_kind_prefix() {
        let candidate = Candidate::external(ExternalKind::Team, "abc", "Platform");
        assert_eq!(candidate.id.as_str(), "team:abc");
        assert_eq!(
            ExternalKind::split_reference(&candidate.id),
            Some((ExternalKind::Team, "abc"))
        );
    }
}
