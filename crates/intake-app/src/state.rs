// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, HashMap};

use crate::badge::{BadgeHit, badge_at_visual, caret_from_visual, project};
use crate::detector::{CellMetrics, FieldRect, Point, TriggerDecision, detect, measure_caret_anchor};
use crate::editor::{EditOutcome, MentionText};
use crate::forms::{FieldPatch, FormDefinition};
use crate::picker::{Candidate, ExternalKind, Picker, PickerKey, PickerOptions, PickerOutcome};
use crate::{FieldId, FieldType, IssueKind, ReferenceId, TrackerSettings};

/// A text value that can hold mentions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextTarget {
    DefaultTitle,
    ResponseMessage,
    Placeholder(FieldId),
}

impl TextTarget {
    /// The field a target belongs to, which its own picker leaves out.
    pub fn owner_reference(&self) -> Option<ReferenceId> {
        match self {
            Self::Placeholder(id) => Some(ReferenceId::from(id)),
            Self::DefaultTitle | Self::ResponseMessage => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::DefaultTitle => "default title".to_owned(),
            Self::ResponseMessage => "response message".to_owned(),
            Self::Placeholder(id) => format!("{id} placeholder"),
        }
    }

    fn accepts_external(&self) -> bool {
        matches!(self, Self::DefaultTitle | Self::ResponseMessage)
    }
}

/// The open reference picker. At most one exists across all targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionMenuState {
    pub owner: TextTarget,
    pub anchor: Point,
    pub trigger_pos: usize,
    pub picker: Picker,
}

impl MentionMenuState {
    pub fn search_term(&self) -> &str {
        self.picker.search_term()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKey {
    Char(char),
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Enter,
    Escape,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Committed,
    Escaped,
    ClickedOutside,
    TriggerRemoved,
    FocusMoved,
    Aborted,
    OwnerRemoved,
    TextReplaced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub issue_kind: Option<IssueKind>,
    pub team_id: Option<Option<String>>,
    pub project_id: Option<Option<String>>,
    pub state_id: Option<Option<String>>,
    pub label_ids: Option<Vec<String>>,
    pub assignee_id: Option<Option<String>>,
    pub include_customer_info: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderCommand {
    AddField(FieldType),
    RemoveField(FieldId),
    UpdateField { id: FieldId, patch: FieldPatch },
    MoveField { id: FieldId, to: usize },
    SelectField(FieldId),
    AddOption(FieldId),
    RemoveOption { id: FieldId, index: usize },
    UpdateOption { id: FieldId, index: usize, value: String },
    Focus(TextTarget),
    Blur,
    Key(EditorKey),
    Paste(String),
    ClickText { target: TextTarget, row: usize, col: usize },
    HoverCandidate(usize),
    PointerDownCandidate(usize),
    ClickOutside,
    RemoveMention { target: TextTarget, index: usize },
    SetPickerSearch(String),
    SetFieldRect { target: TextTarget, rect: FieldRect },
    RequestCandidates,
    SetExternalCandidates { request_id: u64, candidates: Vec<Candidate> },
    CandidatesFailed { request_id: u64, message: String },
    UpdateSettings(SettingsPatch),
    MarkSaved,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderEvent {
    FieldAdded(FieldId),
    FieldRemoved(FieldId),
    FieldUpdated(FieldId),
    FieldMoved { id: FieldId, to: usize },
    FieldSelected(FieldId),
    FocusChanged(Option<TextTarget>),
    TextChanged(TextTarget),
    CaretMoved(TextTarget),
    MenuOpened { owner: TextTarget, anchor: Point, search_term: String },
    MenuUpdated { anchor: Point, search_term: String },
    PickerMoved(usize),
    MenuClosed(CloseReason),
    MentionInserted { target: TextTarget, reference: ReferenceId },
    MentionRemoved { target: TextTarget, reference: ReferenceId },
    MentionAborted { target: TextTarget, reason: String },
    DanglingMentions { removed: FieldId, holders: Vec<TextTarget> },
    CandidatesRequested { request_id: u64, team_id: Option<String> },
    CandidatesUpdated(usize),
    SettingsUpdated,
    Saved,
    StatusUpdated(String),
    StatusCleared,
    Rejected(String),
}

/// Single owner of the form designer's state. Every change, including the
/// picker's open/closed state, goes through [`BuilderState::dispatch`].
#[derive(Debug, Clone)]
pub struct BuilderState {
    form: FormDefinition,
    settings: TrackerSettings,
    editors: BTreeMap<TextTarget, MentionText>,
    rects: HashMap<TextTarget, FieldRect>,
    focus: Option<TextTarget>,
    selected: Option<FieldId>,
    menu: Option<MentionMenuState>,
    external: Vec<Candidate>,
    latest_request: u64,
    picker_options: PickerOptions,
    pub status_line: Option<String>,
    pub dirty: bool,
}

impl Default for BuilderState {
    fn default() -> Self {
        Self::new(
            FormDefinition::default(),
            TrackerSettings::default(),
            PickerOptions::default(),
        )
    }
}

impl BuilderState {
    pub fn new(
        form: FormDefinition,
        settings: TrackerSettings,
        picker_options: PickerOptions,
    ) -> Self {
        let mut editors = BTreeMap::new();
        editors.insert(
            TextTarget::DefaultTitle,
            MentionText::from_text(&settings.default_title, false),
        );
        editors.insert(
            TextTarget::ResponseMessage,
            MentionText::from_text(&settings.response_message, true),
        );
        for field in form.fields() {
            editors.insert(
                TextTarget::Placeholder(field.id.clone()),
                MentionText::from_text(&field.placeholder, field.field_type.is_multiline()),
            );
        }
        let selected = form.fields().first().map(|field| field.id.clone());

        Self {
            form,
            settings,
            editors,
            rects: HashMap::new(),
            focus: None,
            selected,
            menu: None,
            external: Vec::new(),
            latest_request: 0,
            picker_options,
            status_line: None,
            dirty: false,
        }
    }

    pub fn form(&self) -> &FormDefinition {
        &self.form
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn editor(&self, target: &TextTarget) -> Option<&MentionText> {
        self.editors.get(target)
    }

    pub fn focus(&self) -> Option<&TextTarget> {
        self.focus.as_ref()
    }

    pub fn selected(&self) -> Option<&FieldId> {
        self.selected.as_ref()
    }

    pub fn menu(&self) -> Option<&MentionMenuState> {
        self.menu.as_ref()
    }

    pub fn external_candidates(&self) -> &[Candidate] {
        &self.external
    }

    /// Text targets in display order: templates first, then one placeholder
    /// per field.
    pub fn text_targets(&self) -> Vec<TextTarget> {
        let mut targets = vec![TextTarget::DefaultTitle, TextTarget::ResponseMessage];
        targets.extend(
            self.form
                .fields()
                .iter()
                .map(|field| TextTarget::Placeholder(field.id.clone())),
        );
        targets
    }

    /// True when a mention points at a field that no longer exists.
    pub fn is_dangling(&self, reference: &ReferenceId) -> bool {
        if ExternalKind::split_reference(reference).is_some() {
            return false;
        }
        reference
            .as_field_id()
            .is_none_or(|id| self.form.field(&id).is_none())
    }

    pub fn dispatch(&mut self, command: BuilderCommand) -> Vec<BuilderEvent> {
        match command {
            BuilderCommand::AddField(field_type) => self.add_field(field_type),
            BuilderCommand::RemoveField(id) => self.remove_field(id),
            BuilderCommand::UpdateField { id, patch } => self.update_field(id, patch),
            BuilderCommand::MoveField { id, to } => match self.form.move_field(&id, to) {
                Ok(to) => {
                    self.dirty = true;
                    vec![BuilderEvent::FieldMoved { id, to }]
                }
                Err(err) => self.reject(err),
            },
            BuilderCommand::SelectField(id) => {
                if self.form.field(&id).is_none() {
                    return self.reject(format!("field {id} not found"));
                }
                self.selected = Some(id.clone());
                vec![BuilderEvent::FieldSelected(id)]
            }
            BuilderCommand::AddOption(id) => {
                let result = self.form.add_option(&id).map(|_| ());
                self.field_changed(id, result)
            }
            BuilderCommand::RemoveOption { id, index } => {
                let result = self.form.remove_option(&id, index).map(|_| ());
                self.field_changed(id, result)
            }
            BuilderCommand::UpdateOption { id, index, value } => {
                let result = self.form.update_option(&id, index, &value);
                self.field_changed(id, result)
            }
            BuilderCommand::Focus(target) => self.focus_target(target),
            BuilderCommand::Blur => {
                let mut events = self.close_menu(CloseReason::FocusMoved);
                if self.focus.take().is_some() {
                    events.push(BuilderEvent::FocusChanged(None));
                }
                events
            }
            BuilderCommand::Key(key) => self.handle_key(key),
            BuilderCommand::Paste(text) => {
                let Some(target) = self.focus.clone() else {
                    return Vec::new();
                };
                let outcome = self.with_editor(&target, |editor| editor.insert_str(&text));
                self.after_edit(target, outcome)
            }
            BuilderCommand::ClickText { target, row, col } => self.click_text(target, row, col),
            BuilderCommand::HoverCandidate(row) => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.picker.hover(row);
                }
                Vec::new()
            }
            BuilderCommand::PointerDownCandidate(row) => {
                // focus stays on the host field; only the picker reacts
                let Some(menu) = self.menu.as_mut() else {
                    return Vec::new();
                };
                let outcome = menu.picker.pointer_down(row);
                self.picker_outcome(outcome)
            }
            BuilderCommand::ClickOutside => self.close_menu(CloseReason::ClickedOutside),
            BuilderCommand::RemoveMention { target, index } => self.remove_mention(target, index),
            BuilderCommand::SetPickerSearch(term) => {
                let Some(menu) = self.menu.as_mut() else {
                    return Vec::new();
                };
                menu.picker.set_search(&term);
                vec![BuilderEvent::MenuUpdated {
                    anchor: menu.anchor,
                    search_term: menu.picker.search_term().to_owned(),
                }]
            }
            BuilderCommand::SetFieldRect { target, rect } => {
                self.rects.insert(target, rect);
                Vec::new()
            }
            BuilderCommand::RequestCandidates => {
                self.latest_request += 1;
                vec![BuilderEvent::CandidatesRequested {
                    request_id: self.latest_request,
                    team_id: self.settings.team_id.clone(),
                }]
            }
            BuilderCommand::SetExternalCandidates {
                request_id,
                candidates,
            } => self.set_external(request_id, Ok(candidates)),
            BuilderCommand::CandidatesFailed {
                request_id,
                message,
            } => self.set_external(request_id, Err(message)),
            BuilderCommand::UpdateSettings(patch) => self.update_settings(patch),
            BuilderCommand::MarkSaved => {
                self.dirty = false;
                vec![BuilderEvent::Saved, self.set_status("saved")]
            }
            BuilderCommand::SetStatus(message) => vec![self.set_status(&message)],
            BuilderCommand::ClearStatus => {
                self.status_line = None;
                vec![BuilderEvent::StatusCleared]
            }
        }
    }

    fn add_field(&mut self, field_type: FieldType) -> Vec<BuilderEvent> {
        let id = self.form.add_field(field_type);
        let placeholder = self
            .form
            .field(&id)
            .map(|field| field.placeholder.clone())
            .unwrap_or_default();
        self.editors.insert(
            TextTarget::Placeholder(id.clone()),
            MentionText::from_text(&placeholder, field_type.is_multiline()),
        );
        self.selected = Some(id.clone());
        self.dirty = true;
        vec![
            BuilderEvent::FieldAdded(id.clone()),
            BuilderEvent::FieldSelected(id),
            self.set_status(&format!("added {} field", field_type.as_str())),
        ]
    }

    fn remove_field(&mut self, id: FieldId) -> Vec<BuilderEvent> {
        let removed = match self.form.remove_field(&id) {
            Ok(removed) => removed,
            Err(err) => return self.reject(err),
        };
        let own_target = TextTarget::Placeholder(id.clone());
        let mut events = Vec::new();

        if self.menu.as_ref().is_some_and(|menu| menu.owner == own_target) {
            events.extend(self.close_menu(CloseReason::OwnerRemoved));
        }
        if self.focus.as_ref() == Some(&own_target) {
            self.focus = None;
            events.push(BuilderEvent::FocusChanged(None));
        }
        self.editors.remove(&own_target);
        self.rects.remove(&own_target);
        if self.selected.as_ref() == Some(&id) {
            self.selected = self.form.fields().first().map(|field| field.id.clone());
        }
        self.dirty = true;
        events.push(BuilderEvent::FieldRemoved(id.clone()));

        // mentions of the removed field stay put and render as dangling
        let reference = ReferenceId::from(&id);
        let holders = self
            .editors
            .iter()
            .filter(|(_, editor)| {
                editor
                    .mentions()
                    .iter()
                    .any(|mention| mention.target == reference)
            })
            .map(|(target, _)| target.clone())
            .collect::<Vec<_>>();
        if !holders.is_empty() {
            tracing::warn!(
                field = %id,
                holders = holders.len(),
                "removed field is still mentioned"
            );
            events.push(BuilderEvent::DanglingMentions {
                removed: id,
                holders,
            });
        }
        events.push(self.set_status(&format!("removed {}", removed.label)));
        events
    }

    fn update_field(&mut self, id: FieldId, patch: FieldPatch) -> Vec<BuilderEvent> {
        let placeholder = patch.placeholder.clone();
        let result = self.form.update_field(&id, patch);
        let mut events = Vec::new();
        if result.is_ok()
            && let Some(text) = placeholder
        {
            let target = TextTarget::Placeholder(id.clone());
            if self.menu.as_ref().is_some_and(|menu| menu.owner == target) {
                events.extend(self.close_menu(CloseReason::TextReplaced));
            }
            if let Some(editor) = self.editors.get_mut(&target) {
                editor.set_text(&text);
                // the form keeps the editor's normalized copy
                self.sync_target(&target);
            }
        }
        events.extend(self.field_changed(id, result));
        events
    }

    fn field_changed(&mut self, id: FieldId, result: anyhow::Result<()>) -> Vec<BuilderEvent> {
        match result {
            Ok(()) => {
                self.dirty = true;
                vec![BuilderEvent::FieldUpdated(id)]
            }
            Err(err) => self.reject(err),
        }
    }

    fn focus_target(&mut self, target: TextTarget) -> Vec<BuilderEvent> {
        if !self.editors.contains_key(&target) {
            return self.reject(format!("{} is not editable", target.describe()));
        }
        if self.focus.as_ref() == Some(&target) {
            return Vec::new();
        }
        let mut events = self.close_menu(CloseReason::FocusMoved);
        if let TextTarget::Placeholder(id) = &target {
            self.selected = Some(id.clone());
        }
        self.focus = Some(target.clone());
        events.push(BuilderEvent::FocusChanged(Some(target)));
        events
    }

    fn handle_key(&mut self, key: EditorKey) -> Vec<BuilderEvent> {
        let Some(target) = self.focus.clone() else {
            return Vec::new();
        };

        if let Some(menu) = self.menu.as_mut().filter(|menu| menu.owner == target) {
            let picker_key = match key {
                EditorKey::Up => Some(PickerKey::Up),
                EditorKey::Down => Some(PickerKey::Down),
                EditorKey::Enter => Some(PickerKey::Enter),
                EditorKey::Escape => Some(PickerKey::Escape),
                _ => None,
            };
            if let Some(picker_key) = picker_key {
                let outcome = menu.picker.handle_key(picker_key);
                return self.picker_outcome(outcome);
            }
            if menu.picker.search_has_focus() {
                match key {
                    EditorKey::Char(c) => {
                        let mut term = menu.picker.search_term().to_owned();
                        term.push(c);
                        return self.dispatch(BuilderCommand::SetPickerSearch(term));
                    }
                    EditorKey::Backspace if !menu.picker.search_term().is_empty() => {
                        let mut term = menu.picker.search_term().to_owned();
                        term.pop();
                        return self.dispatch(BuilderCommand::SetPickerSearch(term));
                    }
                    _ => {}
                }
            }
        }

        match key {
            EditorKey::Char(c) => {
                let outcome = self.with_editor(&target, |editor| editor.insert_char(c));
                self.after_edit(target, outcome)
            }
            EditorKey::Enter => {
                let outcome = self.with_editor(&target, |editor| {
                    if editor.is_multiline() {
                        editor.insert_char('\n')
                    } else {
                        EditOutcome::Unchanged
                    }
                });
                self.after_edit(target, outcome)
            }
            EditorKey::Backspace => {
                let outcome = self.with_editor(&target, MentionText::backspace);
                self.after_edit(target, outcome)
            }
            EditorKey::Delete => {
                let outcome = self.with_editor(&target, MentionText::delete_forward);
                self.after_edit(target, outcome)
            }
            EditorKey::Escape => {
                self.focus = None;
                vec![BuilderEvent::FocusChanged(None)]
            }
            EditorKey::Left => self.move_caret(target, MentionText::move_left),
            EditorKey::Right => self.move_caret(target, MentionText::move_right),
            EditorKey::Home => self.move_caret(target, MentionText::move_home),
            EditorKey::End => self.move_caret(target, MentionText::move_end),
            EditorKey::Up => self.move_caret(target, |editor| {
                editor.move_up();
            }),
            EditorKey::Down => self.move_caret(target, |editor| {
                editor.move_down();
            }),
        }
    }

    fn click_text(&mut self, target: TextTarget, row: usize, col: usize) -> Vec<BuilderEvent> {
        let mut events = self.focus_target(target.clone());
        let Some(editor) = self.editors.get(&target) else {
            return events;
        };
        let hit = badge_at_visual(editor.text(), editor.mentions(), row, col);
        if let Some((index, BadgeHit::Remove)) = hit {
            events.extend(self.remove_mention(target, index));
            return events;
        }
        let caret = caret_from_visual(editor.text(), editor.mentions(), row, col);
        events.extend(self.move_caret(target, |editor| editor.set_caret(caret)));
        events
    }

    fn remove_mention(&mut self, target: TextTarget, index: usize) -> Vec<BuilderEvent> {
        let Some(editor) = self.editors.get_mut(&target) else {
            return self.reject(format!("{} is not editable", target.describe()));
        };
        match editor.remove_mention(index) {
            Ok(mention) => {
                let mut events = vec![BuilderEvent::MentionRemoved {
                    target: target.clone(),
                    reference: mention.target.clone(),
                }];
                events.extend(self.after_edit(target, EditOutcome::MentionRemoved(mention)));
                events
            }
            Err(err) => self.reject(err),
        }
    }

    fn with_editor(
        &mut self,
        target: &TextTarget,
        edit: impl FnOnce(&mut MentionText) -> EditOutcome,
    ) -> EditOutcome {
        self.editors
            .get_mut(target)
            .map_or(EditOutcome::Unchanged, edit)
    }

    fn move_caret(
        &mut self,
        target: TextTarget,
        step: impl FnOnce(&mut MentionText),
    ) -> Vec<BuilderEvent> {
        let Some(editor) = self.editors.get_mut(&target) else {
            return Vec::new();
        };
        let before = editor.caret();
        step(editor);
        if editor.caret() == before {
            return Vec::new();
        }
        let mut events = vec![BuilderEvent::CaretMoved(target.clone())];
        events.extend(self.refresh_menu(&target));
        events
    }

    fn after_edit(&mut self, target: TextTarget, outcome: EditOutcome) -> Vec<BuilderEvent> {
        if outcome == EditOutcome::Unchanged {
            return Vec::new();
        }
        self.sync_target(&target);
        let mut events = Vec::new();
        if let EditOutcome::MentionRemoved(mention) = &outcome {
            tracing::debug!(reference = %mention.target, "mention removed");
        }
        events.push(BuilderEvent::TextChanged(target.clone()));
        events.extend(self.refresh_menu(&target));
        events
    }

    /// Writes an editor's text back into the form or settings it mirrors.
    fn sync_target(&mut self, target: &TextTarget) {
        let Some(editor) = self.editors.get(target) else {
            return;
        };
        let text = editor.text().to_owned();
        match target {
            TextTarget::DefaultTitle => self.settings.default_title = text,
            TextTarget::ResponseMessage => self.settings.response_message = text,
            TextTarget::Placeholder(id) => {
                if let Err(err) = self.form.set_placeholder(id, &text) {
                    tracing::error!(field = %id, error = %err, "placeholder sync failed");
                }
            }
        }
        self.dirty = true;
    }

    /// Re-runs trigger detection for `target` and opens, updates, or closes
    /// the picker to match.
    fn refresh_menu(&mut self, target: &TextTarget) -> Vec<BuilderEvent> {
        let Some(editor) = self.editors.get(target) else {
            return Vec::new();
        };
        let trigger = match detect(editor.text(), editor.caret()) {
            TriggerDecision::Open(trigger) => trigger,
            TriggerDecision::Close => {
                if self.menu.as_ref().is_some_and(|menu| &menu.owner == target) {
                    return self.close_menu(CloseReason::TriggerRemoved);
                }
                return Vec::new();
            }
        };
        let anchor = self.anchor_for(target, trigger.position);

        if let Some(menu) = self.menu.as_mut()
            && &menu.owner == target
            && menu.trigger_pos == trigger.position
        {
            menu.anchor = anchor;
            if !menu.picker.search_has_focus() {
                menu.picker.set_search(&trigger.search_term);
            }
            return vec![BuilderEvent::MenuUpdated {
                anchor,
                search_term: menu.picker.search_term().to_owned(),
            }];
        }

        let mut events = self.close_menu(CloseReason::FocusMoved);
        let picker = Picker::new(
            self.candidates_for(target),
            target.owner_reference(),
            &trigger.search_term,
            self.picker_options,
        );
        tracing::debug!(owner = %target.describe(), search = %trigger.search_term, "picker opened");
        self.menu = Some(MentionMenuState {
            owner: target.clone(),
            anchor,
            trigger_pos: trigger.position,
            picker,
        });
        events.push(BuilderEvent::MenuOpened {
            owner: target.clone(),
            anchor,
            search_term: trigger.search_term,
        });
        events
    }

    fn picker_outcome(&mut self, outcome: PickerOutcome) -> Vec<BuilderEvent> {
        match outcome {
            PickerOutcome::Moved(row) => vec![BuilderEvent::PickerMoved(row)],
            PickerOutcome::Commit(candidate) => self.commit(candidate),
            PickerOutcome::Close => self.close_menu(CloseReason::Escaped),
            PickerOutcome::Ignored => Vec::new(),
        }
    }

    fn commit(&mut self, candidate: Candidate) -> Vec<BuilderEvent> {
        let Some(menu) = self.menu.take() else {
            return Vec::new();
        };
        let owner = menu.owner;
        let result = match self.editors.get_mut(&owner) {
            Some(editor) => editor.commit_reference(&candidate).map_err(|err| err.to_string()),
            None => Err(format!("{} is gone", owner.describe())),
        };

        match result {
            Ok(_) => {
                self.sync_target(&owner);
                tracing::debug!(owner = %owner.describe(), reference = %candidate.id, "mention inserted");
                vec![
                    BuilderEvent::TextChanged(owner.clone()),
                    BuilderEvent::MentionInserted {
                        target: owner,
                        reference: candidate.id,
                    },
                    BuilderEvent::MenuClosed(CloseReason::Committed),
                ]
            }
            Err(reason) => {
                tracing::warn!(owner = %owner.describe(), %reason, "mention commit aborted");
                vec![
                    BuilderEvent::MentionAborted {
                        target: owner,
                        reason,
                    },
                    BuilderEvent::MenuClosed(CloseReason::Aborted),
                ]
            }
        }
    }

    fn close_menu(&mut self, reason: CloseReason) -> Vec<BuilderEvent> {
        match self.menu.take() {
            Some(_) => vec![BuilderEvent::MenuClosed(reason)],
            None => Vec::new(),
        }
    }

    fn anchor_for(&self, target: &TextTarget, trigger_pos: usize) -> Point {
        let rect = self.rects.get(target).copied().unwrap_or_default();
        let Some(editor) = self.editors.get(target) else {
            return Point::default();
        };
        let (shown, pos) = project(editor.text(), editor.mentions(), trigger_pos);
        measure_caret_anchor(&shown, pos, &CellMetrics, rect)
    }

    fn candidates_for(&self, target: &TextTarget) -> Vec<Candidate> {
        let mut candidates = self
            .form
            .fields()
            .iter()
            .map(Candidate::field)
            .collect::<Vec<_>>();
        if target.accepts_external() {
            candidates.extend(self.external.iter().cloned());
        }
        candidates
    }

    fn set_external(
        &mut self,
        request_id: u64,
        result: Result<Vec<Candidate>, String>,
    ) -> Vec<BuilderEvent> {
        if request_id != self.latest_request {
            tracing::debug!(
                request_id,
                latest = self.latest_request,
                "ignoring stale candidate response"
            );
            return Vec::new();
        }

        let mut events = Vec::new();
        match result {
            Ok(candidates) => self.external = candidates,
            Err(message) => {
                tracing::warn!(%message, "tracker candidates unavailable");
                self.external.clear();
                events.push(self.set_status(&format!("tracker records unavailable: {message}")));
            }
        }

        if let Some(owner) = self.menu.as_ref().map(|menu| menu.owner.clone()) {
            let candidates = self.candidates_for(&owner);
            if let Some(menu) = self.menu.as_mut() {
                menu.picker.set_candidates(candidates);
            }
        }
        events.insert(0, BuilderEvent::CandidatesUpdated(self.external.len()));
        events
    }

    fn update_settings(&mut self, patch: SettingsPatch) -> Vec<BuilderEvent> {
        let settings = &mut self.settings;
        if let Some(kind) = patch.issue_kind {
            settings.issue_kind = kind;
        }
        let team_changed = patch
            .team_id
            .as_ref()
            .is_some_and(|team| *team != settings.team_id);
        if let Some(team) = patch.team_id {
            settings.team_id = team;
        }
        if let Some(project) = patch.project_id {
            settings.project_id = project;
        }
        if let Some(state) = patch.state_id {
            settings.state_id = state;
        }
        if let Some(labels) = patch.label_ids {
            settings.label_ids = labels;
        }
        if let Some(assignee) = patch.assignee_id {
            settings.assignee_id = assignee;
        }
        if let Some(include) = patch.include_customer_info {
            settings.include_customer_info = include;
        }
        self.dirty = true;

        let mut events = vec![BuilderEvent::SettingsUpdated];
        if team_changed {
            // team-scoped records from the old team no longer apply
            self.settings.project_id = None;
            self.settings.state_id = None;
            self.settings.label_ids.clear();
            self.settings.assignee_id = None;
            events.extend(self.dispatch(BuilderCommand::RequestCandidates));
        }
        events
    }

    fn reject(&mut self, err: impl std::fmt::Display) -> Vec<BuilderEvent> {
        let message = err.to_string();
        self.status_line = Some(message.clone());
        vec![BuilderEvent::Rejected(message)]
    }

    fn set_status(&mut self, message: &str) -> BuilderEvent {
        self.status_line = Some(message.to_owned());
        BuilderEvent::StatusUpdated(message.to_owned())
    }
}
