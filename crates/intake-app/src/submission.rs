// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use anyhow::{Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::forms::FormDefinition;
use crate::{FieldId, FieldType, FormField};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SubmissionValue {
    Text(String),
    Choices(Vec<String>),
    Files(Vec<UploadedFile>),
}

impl SubmissionValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Choices(choices) => choices.is_empty(),
            Self::Files(files) => files.is_empty(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.trim().to_owned(),
            Self::Choices(choices) => choices.join(", "),
            Self::Files(files) => files
                .iter()
                .map(|file| file.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// One respondent's answers, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub values: BTreeMap<FieldId, SubmissionValue>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, id: &str, value: &str) -> Self {
        self.set(FieldId::new(id), SubmissionValue::Text(value.to_owned()));
        self
    }

    pub fn set(&mut self, id: FieldId, value: SubmissionValue) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: &FieldId) -> Option<&SubmissionValue> {
        self.values.get(id)
    }

    /// Display text of a non-blank answer.
    pub fn answer(&self, id: &FieldId) -> Option<String> {
        self.get(id)
            .filter(|value| !value.is_blank())
            .map(SubmissionValue::display)
    }
}

pub fn validate_submission(form: &FormDefinition, submission: &Submission) -> Result<()> {
    for id in submission.values.keys() {
        if form.field(id).is_none() {
            bail!("answer for unknown field {id} -- the form may have changed, reload it");
        }
    }

    for field in form.fields() {
        match submission.get(&field.id).filter(|value| !value.is_blank()) {
            None if field.required => {
                bail!("{} is required -- fill it in and retry", field.label);
            }
            None => {}
            Some(value) => validate_value(field, value)?,
        }
    }
    Ok(())
}

fn validate_value(field: &FormField, value: &SubmissionValue) -> Result<()> {
    let label = &field.label;
    match (field.field_type, value) {
        (FieldType::Text | FieldType::Textarea, SubmissionValue::Text(_)) => Ok(()),
        (FieldType::Email, SubmissionValue::Text(text)) => {
            if !EMAIL.is_match(text.trim()) {
                bail!("{label} must be an email address like name@example.com");
            }
            Ok(())
        }
        (FieldType::Phone, SubmissionValue::Text(text)) => validate_phone(label, text),
        (FieldType::Select | FieldType::Radio, SubmissionValue::Text(choice)) => {
            validate_choices(field, std::slice::from_ref(choice))
        }
        (FieldType::Select | FieldType::Radio, SubmissionValue::Choices(choices)) => {
            if choices.len() != 1 {
                bail!("{label} takes exactly one choice");
            }
            validate_choices(field, choices)
        }
        (FieldType::Checkbox, SubmissionValue::Choices(choices)) => {
            validate_choices(field, choices)
        }
        (FieldType::File | FieldType::Image, SubmissionValue::Files(files)) => {
            validate_files(field, files)
        }
        (field_type, _) => bail!(
            "{label} expects a {} answer",
            field_type.label().to_lowercase()
        ),
    }
}

fn validate_phone(label: &str, text: &str) -> Result<()> {
    let text = text.trim();
    if let Some(bad) = text
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(*c, ' ' | '-' | '(' | ')' | '+' | '.')))
    {
        bail!("{label} contains {bad:?} -- use digits, spaces, and dashes");
    }
    let digits = text.chars().filter(char::is_ascii_digit).count();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        bail!("{label} must have {MIN_PHONE_DIGITS} to {MAX_PHONE_DIGITS} digits");
    }
    Ok(())
}

fn validate_choices(field: &FormField, choices: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for choice in choices {
        if !field.options.contains(choice) {
            bail!("{choice:?} is not an option for {}", field.label);
        }
        if !seen.insert(choice) {
            bail!("{choice:?} was chosen twice for {}", field.label);
        }
    }
    Ok(())
}

fn validate_files(field: &FormField, files: &[UploadedFile]) -> Result<()> {
    let label = &field.label;
    if files.len() > 1 && !field.multiple {
        bail!("{label} accepts a single file");
    }
    for file in files {
        if let Some(max_mb) = field.max_file_size_mb
            && file.size_bytes > u64::from(max_mb) * 1024 * 1024
        {
            bail!("{} is larger than {max_mb} MB -- {label} has a size limit", file.name);
        }
        if let Some(accepted) = &field.accepted_file_types
            && !accepts(accepted, file)
        {
            bail!("{} is not an accepted type for {label} ({accepted})", file.name);
        }
    }
    Ok(())
}

/// Matches a file against `.ext`, `type/*`, or exact MIME entries.
fn accepts(accepted: &str, file: &UploadedFile) -> bool {
    let name = file.name.to_lowercase();
    let mime = file.mime_type.to_lowercase();
    accepted
        .split(',')
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry.starts_with('.') {
                name.ends_with(&entry)
            } else if let Some(prefix) = entry.strip_suffix("/*") {
                mime.split_once('/')
                    .is_some_and(|(major, _)| major == prefix)
            } else {
                mime == entry
            }
        })
}

#[cfg(test)]
mod tests {
    use super::{Submission, SubmissionValue, UploadedFile, validate_submission};
    use crate::forms::FormDefinition;
    use crate::{FieldId, FieldPatch, FieldType};

    fn base() -> Submission {
        Submission::new()
            .with_text("title", "Dark mode")
            .with_text("description", "Please add it")
    }

    fn file(name: &str, mime: &str, size_bytes: u64) -> UploadedFile {
        UploadedFile {
            name: name.to_owned(),
            mime_type: mime.to_owned(),
            size_bytes,
        }
    }

    #[test]
    fn required_fields_must_be_answered() {
        let form = FormDefinition::default();
        let submission = Submission::new().with_text("title", "  ");
        let err = validate_submission(&form, &submission).expect_err("missing title");
        assert!(err.to_string().contains("Feature Title is required"));
        assert!(validate_submission(&form, &base()).is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let form = FormDefinition::default();
        let submission = base().with_text("field_42", "x");
        assert!(validate_submission(&form, &submission).is_err());
    }

    #[test]
    fn email_and_phone_are_checked() {
        let mut form = FormDefinition::default();
        let email = form.add_field(FieldType::Email);
        let phone = form.add_field(FieldType::Phone);

        let good = base()
            .with_text(email.as_str(), "ann@example.com")
            .with_text(phone.as_str(), "+1 (555) 010-2000");
        assert!(validate_submission(&form, &good).is_ok());

        let bad_email = base().with_text(email.as_str(), "ann at example");
        assert!(validate_submission(&form, &bad_email).is_err());

        let bad_phone = base().with_text(phone.as_str(), "555-CALL");
        assert!(validate_submission(&form, &bad_phone).is_err());
    }

    #[test]
    fn choices_must_come_from_options() {
        let mut form = FormDefinition::default();
        let pick = form.add_field(FieldType::Checkbox);
        let mut submission = base();
        submission.set(
            pick.clone(),
            SubmissionValue::Choices(vec!["Option 2".to_owned(), "Option 1".to_owned()]),
        );
        assert!(validate_submission(&form, &submission).is_ok());

        submission.set(pick, SubmissionValue::Choices(vec!["Option 9".to_owned()]));
        assert!(validate_submission(&form, &submission).is_err());
    }

    #[test]
    fn uploads_respect_multiplicity_size_and_type() {
        let mut form = FormDefinition::default();
        let upload = form.add_field(FieldType::Image);
        let mut submission = base();

        submission.set(
            upload.clone(),
            SubmissionValue::Files(vec![file("shot.png", "image/png", 1024)]),
        );
        assert!(validate_submission(&form, &submission).is_ok());

        submission.set(
            upload.clone(),
            SubmissionValue::Files(vec![file("notes.pdf", "application/pdf", 1024)]),
        );
        assert!(validate_submission(&form, &submission).is_err());

        submission.set(
            upload.clone(),
            SubmissionValue::Files(vec![file("big.png", "image/png", 6 * 1024 * 1024)]),
        );
        assert!(validate_submission(&form, &submission).is_err());

        submission.set(
            upload.clone(),
            SubmissionValue::Files(vec![
                file("a.png", "image/png", 1),
                file("b.png", "image/png", 1),
            ]),
        );
        assert!(validate_submission(&form, &submission).is_err());
        form.update_field(
            &upload,
            FieldPatch {
                multiple: Some(true),
                ..FieldPatch::default()
            },
        )
        .expect("enable multiple");
        assert!(validate_submission(&form, &submission).is_ok());
    }

    #[test]
    fn wrong_value_shape_is_rejected() {
        let form = FormDefinition::default();
        let mut submission = base();
        submission.set(
            FieldId::new("title"),
            SubmissionValue::Choices(vec!["x".to_owned()]),
        );
        let err = validate_submission(&form, &submission).expect_err("shape");
        assert!(err.to_string().contains("expects a text answer"));
    }
}
