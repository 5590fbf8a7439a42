// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::forms::FormDefinition;
use crate::picker::ExternalKind;
use crate::submission::{Submission, validate_submission};
use crate::template::render_template;
use crate::{FieldType, IssueKind, ReferenceId, TITLE_FIELD_ID, TrackerSettings};

/// What gets sent to the tracker for one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub kind: IssueKind,
    pub title: String,
    pub description: String,
    pub team_id: String,
    pub project_id: Option<String>,
    pub state_id: Option<String>,
    pub label_ids: Vec<String>,
    pub assignee_id: Option<String>,
}

/// Resolves a mention target against a submission: form fields become the
/// respondent's answer, tracker records keep their label.
pub fn answer_resolver<'a>(
    form: &'a FormDefinition,
    submission: &'a Submission,
) -> impl Fn(&ReferenceId) -> Option<String> + 'a {
    move |target| {
        if ExternalKind::split_reference(target).is_some() {
            return None;
        }
        let id = target.as_field_id()?;
        form.field(&id)?;
        submission.answer(&id)
    }
}

pub fn build_issue_draft(
    form: &FormDefinition,
    settings: &TrackerSettings,
    submission: &Submission,
) -> Result<IssueDraft> {
    let Some(team_id) = settings.team_id.clone() else {
        bail!("no tracker team selected -- choose a team in the tracker settings");
    };
    validate_submission(form, submission)?;

    let resolve = answer_resolver(form, submission);
    let rendered = render_template(&settings.default_title, &resolve);
    let title = if rendered.trim().is_empty() {
        submission
            .answer(&TITLE_FIELD_ID.into())
            .unwrap_or_default()
    } else {
        rendered.trim().to_owned()
    };
    if title.is_empty() {
        bail!("issue title rendered empty -- check the default title template");
    }

    Ok(IssueDraft {
        kind: settings.issue_kind,
        title,
        description: describe(form, settings, submission),
        team_id,
        project_id: settings.project_id.clone(),
        state_id: settings.state_id.clone(),
        label_ids: settings.label_ids.clone(),
        assignee_id: settings.assignee_id.clone(),
    })
}

/// Confirmation shown to the respondent after submitting.
pub fn render_response(
    form: &FormDefinition,
    settings: &TrackerSettings,
    submission: &Submission,
) -> String {
    render_template(&settings.response_message, answer_resolver(form, submission))
}

fn describe(form: &FormDefinition, settings: &TrackerSettings, submission: &Submission) -> String {
    let mut lines = form
        .fields()
        .iter()
        .filter(|field| field.id.as_str() != TITLE_FIELD_ID)
        .filter(|field| {
            settings.include_customer_info
                || !matches!(field.field_type, FieldType::Email | FieldType::Phone)
        })
        .filter_map(|field| {
            let answer = submission.answer(&field.id)?;
            let answer = match (&field.field_type, &field.country_code) {
                (FieldType::Phone, Some(code)) if !answer.starts_with('+') => {
                    format!("{code} {answer}")
                }
                _ => answer,
            };
            Some(format!("**{}**: {answer}", field.label))
        })
        .collect::<Vec<_>>();

    if settings.issue_kind == IssueKind::CustomerRequest {
        lines.push(String::new());
        lines.push("_Submitted through the intake form as a customer request._".to_owned());
    }
    lines.join("\n")
}
