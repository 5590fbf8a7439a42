// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use intake_app::picker::{Candidate, ExternalKind};
use intake_app::{
    FieldPatch, FieldType, FormDefinition, FormField, IssueKind, Submission, SubmissionValue,
    TrackerSettings, UploadedFile,
};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::macros::datetime;

const TEXT_LABELS: [&str; 8] = [
    "Company",
    "Use Case",
    "Current Workaround",
    "Team Size",
    "Job Title",
    "Affected Workflow",
    "Integration",
    "Deadline",
];

const CHOICE_LABELS: [&str; 5] = ["Priority", "Platform", "Plan", "Region", "Frequency"];

const CHOICE_OPTIONS: [&str; 10] = [
    "Low", "Medium", "High", "Web", "Desktop", "Mobile", "Starter", "Business", "Daily", "Weekly",
];

const TEAMS: [(&str, &str); 4] = [
    ("team-plat", "Platform"),
    ("team-grow", "Growth"),
    ("team-mob", "Mobile"),
    ("team-sup", "Support"),
];

const LABELS: [(&str, &str); 5] = [
    ("lbl-bug", "Bug"),
    ("lbl-feat", "Feature"),
    ("lbl-ux", "UX"),
    ("lbl-perf", "Performance"),
    ("lbl-cust", "Customer"),
];

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Rowan",
];
const LAST_NAMES: [&str; 12] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Turner", "Brooks",
];

const WORDS: [&str; 24] = [
    "export", "import", "dashboard", "report", "filter", "search", "sync", "calendar", "invoice",
    "mobile", "offline", "dark", "mode", "keyboard", "shortcut", "bulk", "edit", "audit", "log",
    "webhook", "api", "csv", "notification", "archive",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of forms, answers, and tracker records. The same seed
/// always yields the same data.
#[derive(Debug, Clone)]
pub struct IntakeFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl IntakeFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// A valid form holding the reserved fields plus `extra` generated ones.
    pub fn form(&mut self, extra: usize) -> FormDefinition {
        let mut form = FormDefinition::new(format!("{} Requests", self.pick(&CHOICE_LABELS)));
        for _ in 0..extra {
            let field_type = FieldType::ALL[self.rng.int_n(FieldType::ALL.len())];
            let id = form.add_field(field_type);
            let patch = FieldPatch {
                label: Some(self.label_for(field_type)),
                required: Some(self.rng.bool()),
                ..FieldPatch::default()
            };
            if form.update_field(&id, patch).is_err() {
                continue;
            }
            if field_type.has_options() {
                for index in 0..2 {
                    let option = self.pick(&CHOICE_OPTIONS);
                    let _ = form.update_option(&id, index, &format!("{option} {}", index + 1));
                }
            }
        }
        form
    }

    pub fn settings(&mut self) -> TrackerSettings {
        let (team_id, _) = TEAMS[self.rng.int_n(TEAMS.len())];
        let (label_id, _) = LABELS[self.rng.int_n(LABELS.len())];
        TrackerSettings {
            issue_kind: if self.rng.bool() {
                IssueKind::CustomerRequest
            } else {
                IssueKind::Issue
            },
            team_id: Some(team_id.to_owned()),
            label_ids: vec![label_id.to_owned()],
            ..TrackerSettings::default()
        }
    }

    /// Answers every field of `form` with a value that passes validation.
    pub fn submission(&mut self, form: &FormDefinition) -> Submission {
        let mut submission = Submission::new();
        for field in form.fields() {
            let value = self.answer(field);
            submission.set(field.id.clone(), value);
        }
        submission
    }

    pub fn team_candidates(&mut self) -> Vec<Candidate> {
        TEAMS
            .iter()
            .map(|(id, name)| Candidate::external(ExternalKind::Team, id, *name))
            .collect()
    }

    pub fn tracker_candidates(&mut self) -> Vec<Candidate> {
        let mut candidates = self.team_candidates();
        candidates.extend(
            LABELS
                .iter()
                .map(|(id, name)| Candidate::external(ExternalKind::Label, id, *name)),
        );
        for index in 0..3 {
            let name = self.person_name();
            candidates.push(Candidate::external(
                ExternalKind::Member,
                &format!("user-{index}"),
                name,
            ));
        }
        candidates
    }

    pub fn person_name(&mut self) -> String {
        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES))
    }

    pub fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let span = max_words.saturating_sub(min_words) + 1;
        let count = min_words + self.rng.int_n(span);
        let mut sentence = (0..count.max(1))
            .map(|_| self.pick(&WORDS))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence
    }

    fn answer(&mut self, field: &FormField) -> SubmissionValue {
        match field.field_type {
            FieldType::Text | FieldType::Textarea => {
                SubmissionValue::Text(self.sentence(2, 8))
            }
            FieldType::Email => {
                let first = self.pick(&FIRST_NAMES).to_ascii_lowercase();
                let last = self.pick(&LAST_NAMES).to_ascii_lowercase();
                SubmissionValue::Text(format!("{first}.{last}@example.com"))
            }
            FieldType::Phone => SubmissionValue::Text(format!(
                "555 {:03} {:04}",
                self.rng.int_n(1_000),
                self.rng.int_n(10_000)
            )),
            FieldType::Select | FieldType::Radio | FieldType::Checkbox => {
                let option = field.options[self.rng.int_n(field.options.len())].clone();
                if field.field_type == FieldType::Checkbox {
                    SubmissionValue::Choices(vec![option])
                } else {
                    SubmissionValue::Text(option)
                }
            }
            FieldType::File => SubmissionValue::Files(vec![UploadedFile {
                name: format!("{}.pdf", self.pick(&WORDS)),
                mime_type: "application/pdf".to_owned(),
                size_bytes: 2_048,
            }]),
            FieldType::Image => SubmissionValue::Files(vec![UploadedFile {
                name: format!("{}.png", self.pick(&WORDS)),
                mime_type: "image/png".to_owned(),
                size_bytes: 4_096,
            }]),
        }
    }

    fn label_for(&mut self, field_type: FieldType) -> String {
        match field_type {
            FieldType::Text | FieldType::Textarea => self.pick(&TEXT_LABELS).to_owned(),
            FieldType::Select | FieldType::Checkbox | FieldType::Radio => {
                self.pick(&CHOICE_LABELS).to_owned()
            }
            FieldType::Email => "Contact Email".to_owned(),
            FieldType::Phone => "Contact Phone".to_owned(),
            FieldType::File => "Attachments".to_owned(),
            FieldType::Image => "Screenshots".to_owned(),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("intake.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}
