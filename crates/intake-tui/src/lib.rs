// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use intake_app::badge::{Segment, line_segments, visual_position};
use intake_app::mention::badge_text;
use intake_app::template::render_template;
use intake_app::{
    BuilderCommand, BuilderEvent, BuilderState, Candidate, CandidateKind, EditorKey, ExternalKind,
    FieldId, FieldPatch, FieldRect, FieldType, FormDefinition, FormId, IssueKind,
    MentionMenuState, SettingsPatch, TextTarget, TrackerSettings,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::io;
use std::ops::Range;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

const MAX_VISIBLE_ROWS: usize = 8;
const FOCUS_MARKER: &str = "▸ ";
const MIN_POPUP_WIDTH: u16 = 18;

pub trait AppRuntime {
    fn save_form(&mut self, form: &FormDefinition, settings: &TrackerSettings) -> Result<FormId>;
    /// Tracker records the templates may mention, scoped to `team_id` when set.
    fn load_candidates(&mut self, team_id: Option<&str>) -> Result<Vec<Candidate>>;
    fn spawn_candidate_load(
        &mut self,
        request_id: u64,
        team_id: Option<String>,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .load_candidates(team_id.as_deref())
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::Candidates { request_id, result })
            .map_err(|_| anyhow::anyhow!("candidate event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Candidates {
        request_id: u64,
        result: Result<Vec<Candidate>, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListAction {
    Select(isize),
    Move(isize),
    Add(FieldType),
    Remove,
    ToggleRequired,
    Rename,
    EditPlaceholder,
    EditTitle,
    EditResponse,
    CycleTeam,
    ToggleIssueKind,
    ToggleCustomerInfo,
    FetchTracker,
    TogglePreview,
    ToggleHelp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelEdit {
    id: FieldId,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    help_visible: bool,
    preview_visible: bool,
    label_edit: Option<LabelEdit>,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ScreenLayout {
    header: Rect,
    fields: Rect,
    settings: Rect,
    editors: Vec<(TextTarget, Rect)>,
    status: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PopupLayout {
    area: Rect,
    rows: Range<usize>,
}

pub fn run_app<R: AppRuntime>(state: &mut BuilderState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    dispatch(
        state,
        runtime,
        &mut view_data,
        &internal_tx,
        BuilderCommand::RequestCandidates,
    );

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        let area = match terminal.size() {
            Ok(size) => Rect::new(0, 0, size.width, size.height),
            Err(error) => {
                result = Err(error).context("read terminal size");
                break;
            }
        };
        let layout = screen_layout(area, state);
        sync_field_rects(state, &layout);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse_event(state, runtime, &mut view_data, &internal_tx, mouse, area);
                }
                Event::Paste(text) if state.focus().is_some() => {
                    dispatch(
                        state,
                        runtime,
                        &mut view_data,
                        &internal_tx,
                        BuilderCommand::Paste(text),
                    );
                }
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), DisableMouseCapture, terminal::LeaveAlternateScreen)
        .context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(BuilderCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Candidates { request_id, result } => {
                let command = match result {
                    Ok(candidates) => BuilderCommand::SetExternalCandidates {
                        request_id,
                        candidates,
                    },
                    Err(message) => BuilderCommand::CandidatesFailed {
                        request_id,
                        message,
                    },
                };
                dispatch(state, runtime, view_data, tx, command);
            }
        }
    }
}

fn dispatch<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: BuilderCommand,
) {
    let events = state.dispatch(command);
    for event in events {
        match event {
            BuilderEvent::CandidatesRequested {
                request_id,
                team_id,
            } => {
                if let Err(error) = runtime.spawn_candidate_load(request_id, team_id, tx.clone()) {
                    dispatch(
                        state,
                        runtime,
                        view_data,
                        tx,
                        BuilderCommand::CandidatesFailed {
                            request_id,
                            message: error.to_string(),
                        },
                    );
                }
            }
            BuilderEvent::StatusUpdated(_) | BuilderEvent::Rejected(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(tx, view_data.status_token);
            }
            BuilderEvent::DanglingMentions { removed, holders } => {
                tracing::debug!(field = %removed, holders = holders.len(), "dangling mentions kept");
            }
            _ => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn sync_field_rects(state: &mut BuilderState, layout: &ScreenLayout) {
    for (target, rect) in &layout.editors {
        state.dispatch(BuilderCommand::SetFieldRect {
            target: target.clone(),
            rect: field_rect(*rect),
        });
    }
}

fn field_rect(rect: Rect) -> FieldRect {
    FieldRect {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        padding_left: 1,
        padding_top: 1,
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') => return true,
            KeyCode::Char('s') => {
                save_form(state, runtime, view_data, internal_tx);
                return false;
            }
            _ => {}
        }
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }
    if view_data.preview_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('p')) {
            view_data.preview_visible = false;
        }
        return false;
    }
    if view_data.label_edit.is_some() {
        handle_label_edit_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if state.focus().is_some() {
        if key.code == KeyCode::Tab {
            let command = match next_focus(state) {
                Some(target) => BuilderCommand::Focus(target),
                None => BuilderCommand::Blur,
            };
            dispatch(state, runtime, view_data, internal_tx, command);
        } else if let Some(editor_key) = editor_key_for(key) {
            dispatch(
                state,
                runtime,
                view_data,
                internal_tx,
                BuilderCommand::Key(editor_key),
            );
        }
        return false;
    }

    if let Some(action) = list_action_for_key(key) {
        apply_list_action(state, runtime, view_data, internal_tx, action);
    }
    false
}

fn editor_key_for(key: KeyEvent) -> Option<EditorKey> {
    let key = match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            EditorKey::Char(c)
        }
        KeyCode::Backspace => EditorKey::Backspace,
        KeyCode::Delete => EditorKey::Delete,
        KeyCode::Left => EditorKey::Left,
        KeyCode::Right => EditorKey::Right,
        KeyCode::Up => EditorKey::Up,
        KeyCode::Down => EditorKey::Down,
        KeyCode::Enter => EditorKey::Enter,
        KeyCode::Esc => EditorKey::Escape,
        KeyCode::Home => EditorKey::Home,
        KeyCode::End => EditorKey::End,
        _ => return None,
    };
    Some(key)
}

fn list_action_for_key(key: KeyEvent) -> Option<ListAction> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    let action = match key.code {
        KeyCode::Char('j') | KeyCode::Down => ListAction::Select(1),
        KeyCode::Char('k') | KeyCode::Up => ListAction::Select(-1),
        KeyCode::Char('J') => ListAction::Move(1),
        KeyCode::Char('K') => ListAction::Move(-1),
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit.to_digit(10).map_or(0, |d| d as usize - 1);
            ListAction::Add(*FieldType::ALL.get(index)?)
        }
        KeyCode::Char('x') => ListAction::Remove,
        KeyCode::Char('r') => ListAction::ToggleRequired,
        KeyCode::Char('e') => ListAction::Rename,
        KeyCode::Enter => ListAction::EditPlaceholder,
        KeyCode::Tab => ListAction::EditTitle,
        KeyCode::Char('m') => ListAction::EditResponse,
        KeyCode::Char('t') => ListAction::CycleTeam,
        KeyCode::Char('i') => ListAction::ToggleIssueKind,
        KeyCode::Char('c') => ListAction::ToggleCustomerInfo,
        KeyCode::Char('f') => ListAction::FetchTracker,
        KeyCode::Char('p') => ListAction::TogglePreview,
        KeyCode::Char('?') => ListAction::ToggleHelp,
        _ => return None,
    };
    Some(action)
}

fn apply_list_action<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    action: ListAction,
) {
    let selected = state.selected().cloned();
    let position = selected
        .as_ref()
        .and_then(|id| state.form().position(id))
        .unwrap_or(0);

    let command = match action {
        ListAction::Select(delta) => {
            let last = state.form().fields().len().saturating_sub(1);
            let next = position.saturating_add_signed(delta).min(last);
            state
                .form()
                .fields()
                .get(next)
                .map(|field| BuilderCommand::SelectField(field.id.clone()))
        }
        ListAction::Move(delta) => selected.map(|id| BuilderCommand::MoveField {
            id,
            to: position.saturating_add_signed(delta),
        }),
        ListAction::Add(field_type) => Some(BuilderCommand::AddField(field_type)),
        ListAction::Remove => selected.map(BuilderCommand::RemoveField),
        ListAction::ToggleRequired => selected.and_then(|id| {
            let field = state.form().field(&id)?;
            if field.is_reserved() {
                return Some(BuilderCommand::SetStatus(
                    "reserved fields are always required".to_owned(),
                ));
            }
            let required = !field.required;
            Some(BuilderCommand::UpdateField {
                id,
                patch: FieldPatch {
                    required: Some(required),
                    ..FieldPatch::default()
                },
            })
        }),
        ListAction::Rename => {
            if let Some(id) = selected
                && let Some(field) = state.form().field(&id)
            {
                view_data.label_edit = Some(LabelEdit {
                    buffer: field.label.clone(),
                    id,
                });
            }
            None
        }
        ListAction::EditPlaceholder => {
            selected.map(|id| BuilderCommand::Focus(TextTarget::Placeholder(id)))
        }
        ListAction::EditTitle => Some(BuilderCommand::Focus(TextTarget::DefaultTitle)),
        ListAction::EditResponse => Some(BuilderCommand::Focus(TextTarget::ResponseMessage)),
        ListAction::CycleTeam => Some(match next_team(state) {
            Some(team) => BuilderCommand::UpdateSettings(SettingsPatch {
                team_id: Some(Some(team)),
                ..SettingsPatch::default()
            }),
            None => BuilderCommand::SetStatus(
                "no teams loaded -- press f to fetch tracker records".to_owned(),
            ),
        }),
        ListAction::ToggleIssueKind => {
            let kind = match state.settings().issue_kind {
                IssueKind::CustomerRequest => IssueKind::Issue,
                IssueKind::Issue => IssueKind::CustomerRequest,
            };
            Some(BuilderCommand::UpdateSettings(SettingsPatch {
                issue_kind: Some(kind),
                ..SettingsPatch::default()
            }))
        }
        ListAction::ToggleCustomerInfo => Some(BuilderCommand::UpdateSettings(SettingsPatch {
            include_customer_info: Some(!state.settings().include_customer_info),
            ..SettingsPatch::default()
        })),
        ListAction::FetchTracker => Some(BuilderCommand::RequestCandidates),
        ListAction::TogglePreview => {
            view_data.preview_visible = !view_data.preview_visible;
            None
        }
        ListAction::ToggleHelp => {
            view_data.help_visible = !view_data.help_visible;
            None
        }
    };

    if let Some(command) = command {
        dispatch(state, runtime, view_data, tx, command);
    }
}

fn handle_label_edit_key<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(edit) = view_data.label_edit.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.label_edit = None,
        KeyCode::Enter => {
            if let Some(edit) = view_data.label_edit.take() {
                dispatch(
                    state,
                    runtime,
                    view_data,
                    tx,
                    BuilderCommand::UpdateField {
                        id: edit.id,
                        patch: FieldPatch {
                            label: Some(edit.buffer),
                            ..FieldPatch::default()
                        },
                    },
                );
            }
        }
        KeyCode::Backspace => {
            edit.buffer.pop();
        }
        KeyCode::Char(c) => edit.buffer.push(c),
        _ => {}
    }
}

fn save_form<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let command = match runtime.save_form(state.form(), state.settings()) {
        Ok(id) => {
            tracing::info!(form = id.get(), "form saved");
            BuilderCommand::MarkSaved
        }
        Err(error) => {
            tracing::warn!(error = %error, "form save failed");
            BuilderCommand::SetStatus(format!("save failed: {error:#}"))
        }
    };
    dispatch(state, runtime, view_data, tx, command);
}

/// Tab order: default title, response message, the selected field's
/// placeholder, then back to the field list.
fn next_focus(state: &BuilderState) -> Option<TextTarget> {
    match state.focus() {
        None => Some(TextTarget::DefaultTitle),
        Some(TextTarget::DefaultTitle) => Some(TextTarget::ResponseMessage),
        Some(TextTarget::ResponseMessage) => state
            .selected()
            .map(|id| TextTarget::Placeholder(id.clone())),
        Some(TextTarget::Placeholder(_)) => None,
    }
}

fn loaded_teams(state: &BuilderState) -> Vec<(String, String)> {
    state
        .external_candidates()
        .iter()
        .filter(|candidate| candidate.kind == CandidateKind::External(ExternalKind::Team))
        .filter_map(|candidate| {
            let (_, raw) = ExternalKind::split_reference(&candidate.id)?;
            Some((raw.to_owned(), candidate.label.clone()))
        })
        .collect()
}

fn next_team(state: &BuilderState) -> Option<String> {
    let teams = loaded_teams(state);
    if teams.is_empty() {
        return None;
    }
    let current = state.settings().team_id.as_deref();
    let next = teams
        .iter()
        .position(|(id, _)| Some(id.as_str()) == current)
        .map_or(0, |index| (index + 1) % teams.len());
    teams.into_iter().nth(next).map(|(id, _)| id)
}

fn team_label(state: &BuilderState) -> String {
    let Some(team_id) = state.settings().team_id.as_deref() else {
        return "none".to_owned();
    };
    loaded_teams(state)
        .into_iter()
        .find(|(id, _)| id == team_id)
        .map_or_else(|| team_id.to_owned(), |(_, label)| label)
}

fn handle_mouse_event<R: AppRuntime>(
    state: &mut BuilderState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
    area: Rect,
) {
    let point = Position::new(mouse.column, mouse.row);
    let pressed = matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left));

    if let Some(menu) = state.menu() {
        let popup = popup_layout(menu, area);
        let inner = popup.area.inner(Margin::new(1, 1));
        if inner.contains(point) {
            let row = popup.rows.start + usize::from(point.y - inner.y);
            let command = match mouse.kind {
                MouseEventKind::Down(MouseButton::Left) => BuilderCommand::PointerDownCandidate(row),
                MouseEventKind::Moved => BuilderCommand::HoverCandidate(row),
                _ => return,
            };
            dispatch(state, runtime, view_data, tx, command);
            return;
        }
    }
    if !pressed {
        return;
    }

    let layout = screen_layout(area, state);
    let clicked_editor = layout
        .editors
        .iter()
        .map(|(target, rect)| (target, rect.inner(Margin::new(1, 1))))
        .find(|(_, inner)| inner.contains(point))
        .map(|(target, inner)| BuilderCommand::ClickText {
            target: target.clone(),
            row: usize::from(point.y - inner.y),
            col: usize::from(point.x - inner.x),
        });

    if state.menu().is_some() {
        let owner_clicked = matches!(
            &clicked_editor,
            Some(BuilderCommand::ClickText { target, .. })
                if state.menu().is_some_and(|menu| &menu.owner == target)
        );
        if !owner_clicked {
            dispatch(state, runtime, view_data, tx, BuilderCommand::ClickOutside);
        }
    }

    if let Some(command) = clicked_editor {
        dispatch(state, runtime, view_data, tx, command);
        return;
    }

    let fields = layout.fields.inner(Margin::new(1, 1));
    if fields.contains(point) {
        let index = usize::from(point.y - fields.y);
        if let Some(field) = state.form().fields().get(index) {
            let id = field.id.clone();
            dispatch(state, runtime, view_data, tx, BuilderCommand::Blur);
            dispatch(state, runtime, view_data, tx, BuilderCommand::SelectField(id));
        }
        return;
    }
    if state.focus().is_some() {
        dispatch(state, runtime, view_data, tx, BuilderCommand::Blur);
    }
}

fn screen_layout(area: Rect, state: &BuilderState) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(area);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(rows[1]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(body[1]);

    let mut editors = vec![
        (TextTarget::DefaultTitle, right[0]),
        (TextTarget::ResponseMessage, right[1]),
    ];
    if let Some(id) = state.selected() {
        editors.push((TextTarget::Placeholder(id.clone()), right[3]));
    }

    ScreenLayout {
        header: rows[0],
        fields: body[0],
        settings: right[2],
        editors,
        status: rows[2],
    }
}

/// Rows of the picker's visible list that fit in the popup, scrolled so the
/// focused row is always shown.
fn picker_window(len: usize, focused: Option<usize>) -> Range<usize> {
    let start = focused.map_or(0, |row| (row + 1).saturating_sub(MAX_VISIBLE_ROWS));
    start..len.min(start + MAX_VISIBLE_ROWS)
}

/// The popup sits one line below the trigger, flipping above it when the
/// screen runs out, and shifts left to stay on screen.
fn popup_layout(menu: &MentionMenuState, screen: Rect) -> PopupLayout {
    let rows = picker_window(menu.picker.visible_len(), menu.picker.focused());
    let content = menu
        .picker
        .visible()
        .iter()
        .map(|candidate| {
            FOCUS_MARKER.width() + candidate.label.width() + 2 + candidate.kind_label().width()
        })
        .chain(std::iter::once(menu.search_term().width() + 3))
        .max()
        .unwrap_or_default();
    let width = u16::try_from(content + 2)
        .unwrap_or(u16::MAX)
        .max(MIN_POPUP_WIDTH)
        .min(screen.width);
    let height = u16::try_from(rows.len().max(1) + 2).unwrap_or(u16::MAX);

    let mut x = menu.anchor.left.saturating_sub(1);
    if x.saturating_add(width) > screen.right() {
        x = screen.right().saturating_sub(width);
    }
    let mut y = menu.anchor.top.saturating_add(1);
    if y.saturating_add(height) > screen.bottom() {
        y = menu.anchor.top.saturating_sub(height);
    }

    PopupLayout {
        area: Rect::new(x, y, width, height.min(screen.height)),
        rows,
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &BuilderState, view_data: &ViewData) {
    let layout = screen_layout(frame.area(), state);

    let header = Paragraph::new(render_header_text(state))
        .block(Block::default().title("intake").borders(Borders::ALL));
    frame.render_widget(header, layout.header);

    let fields = Paragraph::new(render_field_list_text(state, view_data).join("\n")).block(
        Block::default()
            .title("fields")
            .borders(Borders::ALL)
            .border_style(border_style(state.focus().is_none())),
    );
    frame.render_widget(fields, layout.fields);

    let settings = Paragraph::new(render_settings_text(state))
        .block(Block::default().title("tracker").borders(Borders::ALL));
    frame.render_widget(settings, layout.settings);

    for (target, rect) in &layout.editors {
        let focused = state.focus() == Some(target);
        let editor = Paragraph::new(editor_lines(state, target)).block(
            Block::default()
                .title(editor_title(state, target))
                .borders(Borders::ALL)
                .border_style(border_style(focused)),
        );
        frame.render_widget(editor, *rect);
    }
    if let Some(position) = cursor_position(state, &layout) {
        frame.set_cursor_position(position);
    }

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout.status);

    if let Some(menu) = state.menu() {
        let popup = popup_layout(menu, frame.area());
        frame.render_widget(Clear, popup.area);
        let picker = Paragraph::new(render_picker_lines(menu).join("\n")).block(
            Block::default()
                .title(format!("@{}", menu.search_term()))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(picker, popup.area);
    }

    if view_data.preview_visible {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let preview = Paragraph::new(render_preview_text(state))
            .block(Block::default().title("preview").borders(Borders::ALL));
        frame.render_widget(preview, area);
    }

    if view_data.help_visible {
        let area = centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}

fn badge_style(dangling: bool) -> Style {
    if dangling {
        Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    }
}

fn editor_title(state: &BuilderState, target: &TextTarget) -> String {
    match target {
        TextTarget::Placeholder(id) => state
            .form()
            .field(id)
            .map_or_else(|| target.describe(), |field| format!("{} placeholder", field.label)),
        _ => target.describe(),
    }
}

/// One line per text line, with every mention drawn as a badge.
fn editor_lines(state: &BuilderState, target: &TextTarget) -> Vec<Line<'static>> {
    let Some(editor) = state.editor(target) else {
        return Vec::new();
    };
    let text = editor.text();
    let mentions = editor.mentions();
    line_segments(text, mentions)
        .into_iter()
        .map(|segments| {
            let spans = segments
                .into_iter()
                .filter_map(|segment| match segment {
                    Segment::Text(range) => Some(Span::raw(text[range].to_owned())),
                    Segment::Badge(index) => {
                        let mention = mentions.get(index)?;
                        Some(Span::styled(
                            badge_text(&mention.label),
                            badge_style(state.is_dangling(&mention.target)),
                        ))
                    }
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}

fn cursor_position(state: &BuilderState, layout: &ScreenLayout) -> Option<Position> {
    let target = state.focus()?;
    if state
        .menu()
        .is_some_and(|menu| menu.picker.search_has_focus())
    {
        return None;
    }
    let (_, rect) = layout.editors.iter().find(|(t, _)| t == target)?;
    let inner = rect.inner(Margin::new(1, 1));
    let editor = state.editor(target)?;
    let (row, col) = visual_position(editor.text(), editor.mentions(), editor.caret());
    let x = inner
        .x
        .saturating_add(u16::try_from(col).unwrap_or(u16::MAX))
        .min(inner.right().saturating_sub(1));
    let y = inner
        .y
        .saturating_add(u16::try_from(row).unwrap_or(u16::MAX))
        .min(inner.bottom().saturating_sub(1));
    Some(Position::new(x, y))
}

fn render_header_text(state: &BuilderState) -> String {
    let modified = if state.dirty { " [modified]" } else { "" };
    format!(
        "{}{modified} | {} fields",
        state.form().name,
        state.form().fields().len()
    )
}

fn render_field_list_text(state: &BuilderState, view_data: &ViewData) -> Vec<String> {
    state
        .form()
        .fields()
        .iter()
        .map(|field| {
            let selected = state.selected() == Some(&field.id);
            let marker = if selected { FOCUS_MARKER } else { "  " };
            let label = match &view_data.label_edit {
                Some(edit) if edit.id == field.id => format!("{}_", edit.buffer),
                _ => field.label.clone(),
            };
            let required = if field.required { " *" } else { "" };
            format!("{marker}{label} ({}){required}", field.field_type.as_str())
        })
        .collect()
}

fn render_settings_text(state: &BuilderState) -> String {
    let settings = state.settings();
    format!(
        "kind: {} | team: {} | customer info: {} | records: {}",
        settings.issue_kind.label(),
        team_label(state),
        if settings.include_customer_info {
            "on"
        } else {
            "off"
        },
        state.external_candidates().len()
    )
}

fn render_picker_lines(menu: &MentionMenuState) -> Vec<String> {
    let visible = menu.picker.visible();
    if visible.is_empty() {
        return vec!["no matches".to_owned()];
    }
    picker_window(visible.len(), menu.picker.focused())
        .map(|row| {
            let candidate = visible[row];
            let marker = if menu.picker.focused() == Some(row) {
                FOCUS_MARKER
            } else {
                "  "
            };
            format!("{marker}{}  {}", candidate.label, candidate.kind_label())
        })
        .collect()
}

/// Templates as a respondent would see them before any answers arrive:
/// mentions read as their labels.
fn render_preview_text(state: &BuilderState) -> String {
    let settings = state.settings();
    let mut lines = vec![
        format!(
            "title: {}",
            render_template(&settings.default_title, |_| None)
        ),
        format!(
            "kind: {} | team: {}",
            settings.issue_kind.label(),
            team_label(state)
        ),
        String::new(),
        "response:".to_owned(),
        render_template(&settings.response_message, |_| None),
        String::new(),
        "placeholders:".to_owned(),
    ];
    lines.extend(state.form().fields().iter().map(|field| {
        format!(
            "  {}: {}",
            field.label,
            render_template(&field.placeholder, |_| None)
        )
    }));

    let dangling = state
        .text_targets()
        .iter()
        .filter_map(|target| state.editor(target))
        .flat_map(|editor| editor.mentions().iter())
        .filter(|mention| state.is_dangling(&mention.target))
        .count();
    if dangling > 0 {
        lines.push(String::new());
        lines.push(format!(
            "{dangling} mention(s) point at removed fields and show their label"
        ));
    }
    lines.join("\n")
}

fn status_text(state: &BuilderState, view_data: &ViewData) -> String {
    if view_data.help_visible || view_data.preview_visible {
        return String::new();
    }
    let (mode, hints) = if view_data.label_edit.is_some() {
        ("LABEL", "enter save | esc cancel")
    } else if state.menu().is_some() {
        ("PICK", "up/down move | enter insert | esc close")
    } else if state.focus().is_some() {
        ("EDIT", "@ mention | tab next | esc done | ctrl+s save")
    } else {
        ("LIST", "j/k J/K | 1-9 add x r e | enter tab m | t i c f | p ? | ctrl+s ctrl+q")
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> String {
    let mut lines = vec![
        "fields".to_owned(),
        "  j/k         select field".to_owned(),
        "  J/K         move field down/up".to_owned(),
        "  x           remove field".to_owned(),
        "  r           toggle required".to_owned(),
        "  e           rename field".to_owned(),
        "  enter       edit placeholder".to_owned(),
        "  tab         edit default title, then cycle editors".to_owned(),
        "  m           edit response message".to_owned(),
        String::new(),
        "tracker".to_owned(),
        "  t           next team".to_owned(),
        "  i           toggle issue kind".to_owned(),
        "  c           toggle customer info".to_owned(),
        "  f           fetch tracker records".to_owned(),
        String::new(),
        "editing".to_owned(),
        "  @           mention a field or tracker record".to_owned(),
        "  click ×     remove a mention".to_owned(),
        "  p           preview templates".to_owned(),
        "  ctrl+s      save, ctrl+q quit".to_owned(),
        String::new(),
        "add field".to_owned(),
    ];
    lines.extend(
        FieldType::ALL
            .iter()
            .enumerate()
            .map(|(index, field_type)| format!("  {}           {}", index + 1, field_type.label())),
    );
    lines.join("\n")
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
