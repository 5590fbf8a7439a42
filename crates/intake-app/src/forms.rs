// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashSet;

use anyhow::{Result, anyhow, bail};

use crate::token::is_valid_reference_id;
use crate::{
    DESCRIPTION_FIELD_ID, FieldId, FieldType, FormField, TITLE_FIELD_ID, dial_code_country,
    is_reserved_field,
};

pub const DEFAULT_FORM_NAME: &str = "Feature Request";

/// Partial update of a field's editable properties. The id and type are
/// fixed once the field exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPatch {
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: Option<bool>,
    pub country_code: Option<String>,
    pub accepted_file_types: Option<String>,
    pub multiple: Option<bool>,
    pub max_file_size_mb: Option<u32>,
}

/// An ordered list of questions. Position in the list is the display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormDefinition {
    pub name: String,
    fields: Vec<FormField>,
    next_field_seq: u64,
}

impl Default for FormDefinition {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_NAME)
    }
}

impl FormDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![FormField::title(), FormField::description()],
            next_field_seq: 1,
        }
    }

    /// Rebuilds a stored form; the id counter resumes past the highest
    /// generated id.
    pub fn from_fields(name: impl Into<String>, fields: Vec<FormField>) -> Result<Self> {
        let next_field_seq = fields
            .iter()
            .filter_map(|field| field.id.as_str().strip_prefix("field_"))
            .filter_map(|suffix| suffix.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        let form = Self {
            name: name.into(),
            fields,
            next_field_seq,
        };
        form.validate()?;
        Ok(form)
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, id: &FieldId) -> Option<&FormField> {
        self.fields.iter().find(|field| &field.id == id)
    }

    pub fn position(&self, id: &FieldId) -> Option<usize> {
        self.fields.iter().position(|field| &field.id == id)
    }

    pub fn add_field(&mut self, field_type: FieldType) -> FieldId {
        let id = loop {
            let candidate = FieldId::new(format!("field_{}", self.next_field_seq));
            self.next_field_seq += 1;
            if self.field(&candidate).is_none() {
                break candidate;
            }
        };
        self.fields
            .push(FormField::with_defaults(id.clone(), field_type));
        id
    }

    pub fn remove_field(&mut self, id: &FieldId) -> Result<FormField> {
        if is_reserved_field(id) {
            bail!("field {id} is reserved -- title and description cannot be removed");
        }
        let index = self.require_position(id)?;
        Ok(self.fields.remove(index))
    }

    pub fn update_field(&mut self, id: &FieldId, patch: FieldPatch) -> Result<()> {
        if patch.required == Some(false) && is_reserved_field(id) {
            bail!("field {id} is reserved -- reserved fields are always required");
        }
        let field = self.field_mut(id)?;
        if let Some(label) = patch.label {
            if label.trim().is_empty() {
                bail!("field label is required -- enter a label and retry");
            }
            field.label = label;
        }
        if let Some(placeholder) = patch.placeholder {
            field.placeholder = placeholder;
        }
        if let Some(required) = patch.required {
            field.required = required;
        }
        if let Some(code) = patch.country_code {
            if field.field_type != FieldType::Phone {
                bail!("country code only applies to phone fields");
            }
            if dial_code_country(&code).is_none() {
                bail!("unsupported country code {code} -- pick one of the listed dial codes");
            }
            field.country_code = Some(code);
        }
        if let Some(types) = patch.accepted_file_types {
            if !field.field_type.is_upload() {
                bail!("accepted file types only apply to file and image fields");
            }
            field.accepted_file_types = (!types.trim().is_empty()).then_some(types);
        }
        if let Some(multiple) = patch.multiple {
            if !field.field_type.is_upload() {
                bail!("multiple uploads only apply to file and image fields");
            }
            field.multiple = multiple;
        }
        if let Some(size) = patch.max_file_size_mb {
            if !field.field_type.is_upload() {
                bail!("max file size only applies to file and image fields");
            }
            if size == 0 {
                bail!("max file size must be at least 1 MB");
            }
            field.max_file_size_mb = Some(size);
        }
        Ok(())
    }

    pub fn set_placeholder(&mut self, id: &FieldId, text: &str) -> Result<()> {
        let field = self.field_mut(id)?;
        if field.placeholder != text {
            field.placeholder = text.to_owned();
        }
        Ok(())
    }

    /// Moves a field to index `to`, clamped to the end of the list.
    pub fn move_field(&mut self, id: &FieldId, to: usize) -> Result<usize> {
        let from = self.require_position(id)?;
        let field = self.fields.remove(from);
        let to = to.min(self.fields.len());
        self.fields.insert(to, field);
        Ok(to)
    }

    pub fn add_option(&mut self, id: &FieldId) -> Result<usize> {
        let field = self.choice_field_mut(id)?;
        let next = field.options.len() + 1;
        field.options.push(format!("Option {next}"));
        Ok(field.options.len() - 1)
    }

    /// Removes an option, always leaving at least one.
    pub fn remove_option(&mut self, id: &FieldId, index: usize) -> Result<String> {
        let field = self.choice_field_mut(id)?;
        if index >= field.options.len() {
            bail!("option {index} does not exist on field {}", field.id);
        }
        if field.options.len() == 1 {
            bail!("choice fields need at least one option -- add another before removing this one");
        }
        Ok(field.options.remove(index))
    }

    pub fn update_option(&mut self, id: &FieldId, index: usize, value: &str) -> Result<()> {
        let field = self.choice_field_mut(id)?;
        if index >= field.options.len() {
            bail!("option {index} does not exist on field {}", field.id);
        }
        field.options[index] = value.to_owned();
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("form name is required -- enter a name and retry");
        }
        for reserved in [TITLE_FIELD_ID, DESCRIPTION_FIELD_ID] {
            if self.field(&FieldId::new(reserved)).is_none() {
                bail!("form is missing the reserved {reserved} field");
            }
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            let id = field.id.as_str();
            if !is_valid_reference_id(id) || id.contains(':') {
                bail!("field id {id:?} is invalid -- use letters, digits, and underscores");
            }
            if !seen.insert(id) {
                bail!("field id {id} is used twice");
            }
            if field.label.trim().is_empty() {
                bail!("field {id} needs a label -- enter a label and retry");
            }
            if is_reserved_field(&field.id) && !field.required {
                bail!("field {id} is reserved and must stay required");
            }
            if field.field_type.has_options() {
                if field.options.is_empty() {
                    bail!("field {id} needs at least one option");
                }
                if field.options.iter().any(|option| option.trim().is_empty()) {
                    bail!("field {id} has a blank option -- fill it in or remove it");
                }
            }
            if field.max_file_size_mb == Some(0) {
                bail!("field {id} max file size must be at least 1 MB");
            }
            if let Some(code) = &field.country_code
                && dial_code_country(code).is_none()
            {
                bail!("field {id} has unsupported country code {code}");
            }
        }
        Ok(())
    }

    fn require_position(&self, id: &FieldId) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| anyhow!("field {id} not found -- it may have been removed"))
    }

    fn field_mut(&mut self, id: &FieldId) -> Result<&mut FormField> {
        let index = self.require_position(id)?;
        Ok(&mut self.fields[index])
    }

    fn choice_field_mut(&mut self, id: &FieldId) -> Result<&mut FormField> {
        let field = self.field_mut(id)?;
        if !field.field_type.has_options() {
            bail!("field {id} is not a choice field");
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldPatch, FormDefinition};
    use crate::{FieldId, FieldType, FormField};

    #[test]
    fn new_forms_hold_reserved_fields() {
        let form = FormDefinition::default();
        let ids = form
            .fields()
            .iter()
            .map(|field| field.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["title", "description"]);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn added_fields_get_sequential_ids() {
        let mut form = FormDefinition::default();
        assert_eq!(form.add_field(FieldType::Email).as_str(), "field_1");
        assert_eq!(form.add_field(FieldType::Select).as_str(), "field_2");
        assert_eq!(form.fields().len(), 4);
    }

    #[test]
    fn reserved_fields_cannot_be_removed() {
        let mut form = FormDefinition::default();
        let err = form
            .remove_field(&FieldId::new("title"))
            .expect_err("reserved");
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn remove_returns_the_field() {
        let mut form = FormDefinition::default();
        let id = form.add_field(FieldType::Phone);
        let removed = form.remove_field(&id).expect("remove");
        assert_eq!(removed.field_type, FieldType::Phone);
        assert!(form.field(&id).is_none());
    }

    #[test]
    fn move_field_reorders() {
        let mut form = FormDefinition::default();
        let id = form.add_field(FieldType::Text);
        assert_eq!(form.move_field(&id, 0).expect("move"), 0);
        assert_eq!(form.fields()[0].id, id);
        assert_eq!(form.move_field(&id, 99).expect("move"), 2);
    }

    #[test]
    fn patch_rejects_properties_for_wrong_type() {
        let mut form = FormDefinition::default();
        let id = form.add_field(FieldType::Text);
        let patch = FieldPatch {
            max_file_size_mb: Some(10),
            ..FieldPatch::default()
        };
        assert!(form.update_field(&id, patch).is_err());
    }

    #[test]
    fn patch_updates_phone_dial_code() {
        let mut form = FormDefinition::default();
        let id = form.add_field(FieldType::Phone);
        let patch = FieldPatch {
            country_code: Some("+44".to_owned()),
            required: Some(true),
            ..FieldPatch::default()
        };
        form.update_field(&id, patch).expect("update");
        let field = form.field(&id).expect("field");
        assert_eq!(field.country_code.as_deref(), Some("+44"));
        assert!(field.required);
    }

    #[test]
    fn options_keep_at_least_one() {
        let mut form = FormDefinition::default();
        let id = form.add_field(FieldType::Checkbox);
        assert_eq!(form.add_option(&id).expect("add"), 2);
        assert_eq!(form.field(&id).expect("field").options[2], "Option 3");
        form.remove_option(&id, 0).expect("remove");
        form.remove_option(&id, 0).expect("remove");
        assert!(form.remove_option(&id, 0).is_err());
        form.update_option(&id, 0, "Yes").expect("update");
        assert_eq!(form.field(&id).expect("field").options, vec!["Yes"]);
    }

    #[test]
    fn from_fields_resumes_id_counter() {
        let fields = vec![
            FormField::title(),
            FormField::description(),
            FormField::with_defaults(FieldId::new("field_7"), FieldType::Text),
        ];
        let mut form = FormDefinition::from_fields("Bugs", fields).expect("valid");
        assert_eq!(form.add_field(FieldType::Text).as_str(), "field_8");
    }

    #[test]
    fn validation_catches_duplicates_and_missing_reserved() {
        let duplicate = vec![
            FormField::title(),
            FormField::description(),
            FormField::title(),
        ];
        assert!(FormDefinition::from_fields("Dup", duplicate).is_err());
        assert!(FormDefinition::from_fields("Bare", vec![FormField::title()]).is_err());
    }

    #[test]
    fn reserved_fields_stay_required() {
        let mut form = FormDefinition::default();
        let optional = FieldPatch {
            label: Some("Summary".to_owned()),
            required: Some(false),
            ..FieldPatch::default()
        };
        let err = form
            .update_field(&FieldId::new("title"), optional)
            .expect_err("reserved");
        assert!(err.to_string().contains("always required"));
        let title = form.field(&FieldId::new("title")).expect("title");
        assert!(title.required);
        assert_eq!(title.label, "Feature Title");

        let renamed = FieldPatch {
            label: Some("Summary".to_owned()),
            required: Some(true),
            ..FieldPatch::default()
        };
        form.update_field(&FieldId::new("description"), renamed)
            .expect("rename keeps required");
    }

    #[test]
    fn validation_rejects_optional_reserved_fields() {
        let mut description = FormField::description();
        description.required = false;
        let err = FormDefinition::from_fields("Loose", vec![FormField::title(), description])
            .expect_err("optional description");
        assert!(err.to_string().contains("must stay required"));
    }
}
