// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::*;

pub const TITLE_FIELD_ID: &str = "title";
pub const DESCRIPTION_FIELD_ID: &str = "description";

pub const DEFAULT_MAX_FILE_SIZE_MB: u32 = 5;
pub const DEFAULT_DOCUMENT_TYPES: &str = ".pdf,.doc,.docx,.txt,.zip";
pub const DEFAULT_IMAGE_TYPES: &str = "image/*";
pub const DEFAULT_DIAL_CODE: &str = "+1";

pub const DEFAULT_TITLE_TEMPLATE: &str = "Customer Request: {title}";
pub const DEFAULT_RESPONSE_MESSAGE: &str = "Thank you for your request! We will review it shortly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialCode {
    pub code: &'static str,
    pub country: &'static str,
}

pub const DIAL_CODES: [DialCode; 10] = [
    DialCode {
        code: "+1",
        country: "United States",
    },
    DialCode {
        code: "+44",
        country: "United Kingdom",
    },
    DialCode {
        code: "+61",
        country: "Australia",
    },
    DialCode {
        code: "+91",
        country: "India",
    },
    DialCode {
        code: "+86",
        country: "China",
    },
    DialCode {
        code: "+49",
        country: "Germany",
    },
    DialCode {
        code: "+33",
        country: "France",
    },
    DialCode {
        code: "+81",
        country: "Japan",
    },
    DialCode {
        code: "+55",
        country: "Brazil",
    },
    DialCode {
        code: "+7",
        country: "Russia",
    },
];

pub fn dial_code_country(code: &str) -> Option<&'static str> {
    DIAL_CODES
        .iter()
        .find(|dial| dial.code == code)
        .map(|dial| dial.country)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Email,
    Phone,
    File,
    Image,
}

impl FieldType {
    pub const ALL: [Self; 9] = [
        Self::Text,
        Self::Textarea,
        Self::Select,
        Self::Checkbox,
        Self::Radio,
        Self::Email,
        Self::Phone,
        Self::File,
        Self::Image,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::File => "file",
            Self::Image => "image",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "select" => Some(Self::Select),
            "checkbox" => Some(Self::Checkbox),
            "radio" => Some(Self::Radio),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            "file" => Some(Self::File),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Textarea => "Textarea",
            Self::Select => "Select",
            Self::Checkbox => "Checkbox",
            Self::Radio => "Radio",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::File => "File",
            Self::Image => "Image",
        }
    }

    pub const fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::Checkbox | Self::Radio)
    }

    pub const fn is_upload(self) -> bool {
        matches!(self, Self::File | Self::Image)
    }

    /// Multi-line editing is only offered for text areas.
    pub const fn is_multiline(self) -> bool {
        matches!(self, Self::Textarea)
    }

    pub const fn default_placeholder(self) -> &'static str {
        match self {
            Self::Email => "email@example.com",
            Self::Phone => "Phone number",
            Self::Text => "Enter text",
            Self::Textarea => "Enter details here",
            Self::File => "Select a file",
            Self::Image => "Select an image",
            Self::Select | Self::Checkbox | Self::Radio => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub id: FieldId,
    pub field_type: FieldType,
    pub label: String,
    /// Placeholder text; may carry mention tokens referencing other fields.
    pub placeholder: String,
    pub required: bool,
    pub options: Vec<String>,
    pub country_code: Option<String>,
    /// Comma-separated extensions or MIME patterns, e.g. `.pdf,.docx` or `image/*`.
    pub accepted_file_types: Option<String>,
    pub multiple: bool,
    pub max_file_size_mb: Option<u32>,
}

impl FormField {
    pub fn with_defaults(id: FieldId, field_type: FieldType) -> Self {
        let options = if field_type.has_options() {
            vec!["Option 1".to_owned(), "Option 2".to_owned()]
        } else {
            Vec::new()
        };
        let accepted_file_types = match field_type {
            FieldType::File => Some(DEFAULT_DOCUMENT_TYPES.to_owned()),
            FieldType::Image => Some(DEFAULT_IMAGE_TYPES.to_owned()),
            _ => None,
        };
        Self {
            id,
            field_type,
            label: format!("New {} Field", field_type.label()),
            placeholder: field_type.default_placeholder().to_owned(),
            required: false,
            options,
            country_code: (field_type == FieldType::Phone).then(|| DEFAULT_DIAL_CODE.to_owned()),
            accepted_file_types,
            multiple: false,
            max_file_size_mb: field_type.is_upload().then_some(DEFAULT_MAX_FILE_SIZE_MB),
        }
    }

    pub fn title() -> Self {
        Self {
            label: "Feature Title".to_owned(),
            placeholder: "Enter a title for your feature request".to_owned(),
            required: true,
            ..Self::with_defaults(FieldId::new(TITLE_FIELD_ID), FieldType::Text)
        }
    }

    pub fn description() -> Self {
        Self {
            label: "Description".to_owned(),
            placeholder: "Describe the feature you'd like to see".to_owned(),
            required: true,
            ..Self::with_defaults(FieldId::new(DESCRIPTION_FIELD_ID), FieldType::Textarea)
        }
    }

    pub fn is_reserved(&self) -> bool {
        is_reserved_field(&self.id)
    }
}

pub fn is_reserved_field(id: &FieldId) -> bool {
    id.as_str() == TITLE_FIELD_ID || id.as_str() == DESCRIPTION_FIELD_ID
}

/// Human description of an accepted-types filter, e.g. "PDF, Word, and ZIP".
pub fn file_type_description(accepted: &str) -> String {
    match accepted {
        DEFAULT_IMAGE_TYPES => return "Images".to_owned(),
        DEFAULT_DOCUMENT_TYPES => return "Documents".to_owned(),
        _ => {}
    }

    let names = accepted
        .split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(|kind| match kind {
            ".pdf" => "PDF".to_owned(),
            ".doc" | ".docx" => "Word".to_owned(),
            ".txt" => "Text".to_owned(),
            ".zip" => "ZIP".to_owned(),
            ".jpg" | ".jpeg" => "JPEG".to_owned(),
            ".png" => "PNG".to_owned(),
            ".gif" => "GIF".to_owned(),
            other => other.replacen('.', "", 1).to_uppercase(),
        })
        .collect::<Vec<_>>();

    match names.as_slice() {
        [] => "Any file".to_owned(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CustomerRequest,
    Issue,
}

impl IssueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CustomerRequest => "customer_request",
            Self::Issue => "issue",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer_request" => Some(Self::CustomerRequest),
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::CustomerRequest => "customer request",
            Self::Issue => "issue",
        }
    }
}

/// Where submissions land in the tracker and how the issue is worded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerSettings {
    pub issue_kind: IssueKind,
    pub team_id: Option<String>,
    pub project_id: Option<String>,
    pub state_id: Option<String>,
    pub label_ids: Vec<String>,
    pub assignee_id: Option<String>,
    pub include_customer_info: bool,
    pub default_title: String,
    pub response_message: String,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            issue_kind: IssueKind::CustomerRequest,
            team_id: None,
            project_id: None,
            state_id: None,
            label_ids: Vec::new(),
            assignee_id: None,
            include_customer_info: true,
            default_title: DEFAULT_TITLE_TEMPLATE.to_owned(),
            response_message: DEFAULT_RESPONSE_MESSAGE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSummary {
    pub id: FormId,
    pub name: String,
    pub field_count: usize,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub form_id: FormId,
    pub issue_title: String,
    pub issue_identifier: Option<String>,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_DIAL_CODE, FieldType, FormField, IssueKind, dial_code_country,
        file_type_description,
    };
    use crate::FieldId;

    #[test]
    fn field_type_names_round_trip() {
        for kind in FieldType::ALL {
            assert_eq!(FieldType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(FieldType::parse("slider"), None);
    }

    #[test]
    fn choice_fields_start_with_two_options() {
        let field = FormField::with_defaults(FieldId::new("field_1"), FieldType::Radio);
        assert_eq!(field.options, vec!["Option 1", "Option 2"]);
        assert_eq!(field.label, "New Radio Field");
        assert!(field.max_file_size_mb.is_none());
    }

    #[test]
    fn upload_fields_get_size_and_type_defaults() {
        let image = FormField::with_defaults(FieldId::new("field_2"), FieldType::Image);
        assert_eq!(image.accepted_file_types.as_deref(), Some("image/*"));
        assert_eq!(image.max_file_size_mb, Some(5));
        assert!(!image.multiple);
        assert_eq!(image.placeholder, "Select an image");
    }

    #[test]
    fn phone_fields_default_to_us_dial_code() {
        let phone = FormField::with_defaults(FieldId::new("field_3"), FieldType::Phone);
        assert_eq!(phone.country_code.as_deref(), Some(DEFAULT_DIAL_CODE));
        assert_eq!(dial_code_country("+1"), Some("United States"));
        assert_eq!(dial_code_country("+999"), None);
    }

    #[test]
    fn reserved_fields_are_required() {
        assert!(FormField::title().required);
        assert!(FormField::title().is_reserved());
        assert_eq!(FormField::description().field_type, FieldType::Textarea);
    }

    #[test]
    fn file_type_descriptions_join_names() {
        assert_eq!(file_type_description("image/*"), "Images");
        assert_eq!(file_type_description(".pdf, .png"), "PDF and PNG");
        assert_eq!(file_type_description(".pdf,.png,.webp"), "PDF, PNG, and WEBP");
        assert_eq!(file_type_description(""), "Any file");
    }

    #[test]
    fn issue_kind_parse() {
        assert_eq!(
            IssueKind::parse("customer_request"),
            Some(IssueKind::CustomerRequest)
        );
        assert_eq!(IssueKind::parse("bug"), None);
    }
}
