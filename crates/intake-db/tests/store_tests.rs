// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use intake_app::{
    FieldPatch, FieldType, FormDefinition, FormId, MentionSet, Submission, TrackerSettings,
};
use intake_db::{Store, validate_db_path};
use intake_testkit::{IntakeFaker, temp_db_path};

fn store() -> Result<Store> {
    let store = Store::open_memory()?;
    store.bootstrap()?;
    Ok(store)
}

#[test]
fn validate_db_path_rejects_uri_forms() {
    assert!(validate_db_path("file:test.db").is_err());
    assert!(validate_db_path("https://example.com/db.sqlite").is_err());
    assert!(validate_db_path("db.sqlite?mode=ro").is_err());
    assert!(validate_db_path("/tmp/intake.db").is_ok());
}

#[test]
fn bootstrap_rejects_schema_missing_required_column() -> Result<()> {
    let store = store()?;
    store.raw_connection().execute_batch(
        "
            ALTER TABLE submissions RENAME TO submissions_old;
            CREATE TABLE submissions (
              id INTEGER PRIMARY KEY,
              form_id INTEGER NOT NULL,
              answers TEXT NOT NULL,
              created_at TEXT NOT NULL
            );
            DROP TABLE submissions_old;
            ",
    )?;

    let err = store
        .bootstrap()
        .expect_err("schema validation should fail");
    let message = err.to_string();
    assert!(message.contains("table `submissions` is missing required columns"));
    assert!(message.contains("issue_title"));
    Ok(())
}

#[test]
fn saved_form_loads_with_fields_in_order() -> Result<()> {
    let store = store()?;
    let mut faker = IntakeFaker::new(11);
    let form = faker.form(5);
    let settings = faker.settings();

    let id = store.save_form(&form, &settings)?;
    let stored = store.load_form(id)?;

    assert_eq!(stored.form, form);
    assert_eq!(stored.settings, settings);
    Ok(())
}

#[test]
fn templates_keep_mentions_across_reload() -> Result<()> {
    let store = store()?;
    let mut form = FormDefinition::default();
    let email = form.add_field(FieldType::Email);
    form.update_field(
        &email,
        FieldPatch {
            label: Some("Email".to_owned()),
            placeholder: Some("Reply goes to «Feature Title|title»".to_owned()),
            ..FieldPatch::default()
        },
    )?;
    let settings = TrackerSettings {
        default_title: format!("«Email|{email}» asks: {{title}}"),
        ..TrackerSettings::default()
    };

    let id = store.save_form(&form, &settings)?;
    let stored = store.load_form(id)?;

    let title_mentions = MentionSet::from_text(&stored.settings.default_title);
    assert_eq!(title_mentions.len(), 1);
    assert_eq!(title_mentions.as_slice()[0].target.as_str(), email.as_str());

    let field = stored.form.field(&email).expect("email field");
    assert_eq!(MentionSet::from_text(&field.placeholder).len(), 1);
    Ok(())
}

#[test]
fn reloaded_form_resumes_field_ids() -> Result<()> {
    let store = store()?;
    let mut form = FormDefinition::default();
    form.add_field(FieldType::Text);
    form.add_field(FieldType::Text);
    let id = store.save_form(&form, &TrackerSettings::default())?;

    let mut reloaded = store.load_form(id)?.form;
    assert_eq!(reloaded.add_field(FieldType::Radio).as_str(), "field_3");
    Ok(())
}

#[test]
fn update_form_replaces_fields() -> Result<()> {
    let store = store()?;
    let mut form = FormDefinition::default();
    let extra = form.add_field(FieldType::Phone);
    let id = store.save_form(&form, &TrackerSettings::default())?;

    form.remove_field(&extra)?;
    form.name = "Bug Reports".to_owned();
    store.update_form(id, &form, &TrackerSettings::default())?;

    let stored = store.load_form(id)?;
    assert_eq!(stored.form.name, "Bug Reports");
    assert_eq!(stored.form.fields().len(), 2);
    assert!(stored.updated_at >= stored.created_at);
    Ok(())
}

#[test]
fn update_missing_form_is_actionable() -> Result<()> {
    let store = store()?;
    let err = store
        .update_form(
            FormId::new(404),
            &FormDefinition::default(),
            &TrackerSettings::default(),
        )
        .expect_err("missing form");
    assert!(err.to_string().contains("save it as a new form"));
    Ok(())
}

#[test]
fn invalid_forms_are_not_saved() -> Result<()> {
    let store = store()?;
    let form = FormDefinition::new("  ");
    assert!(store.save_form(&form, &TrackerSettings::default()).is_err());
    assert!(store.list_forms()?.is_empty());
    Ok(())
}

#[test]
fn list_forms_counts_fields() -> Result<()> {
    let store = store()?;
    let mut faker = IntakeFaker::new(5);
    let small = store.save_form(&faker.form(1), &faker.settings())?;
    let large = store.save_form(&faker.form(4), &faker.settings())?;

    let forms = store.list_forms()?;
    assert_eq!(forms.len(), 2);
    let count_of = |id| {
        forms
            .iter()
            .find(|summary| summary.id == id)
            .map(|summary| summary.field_count)
    };
    assert_eq!(count_of(small), Some(3));
    assert_eq!(count_of(large), Some(6));
    Ok(())
}

#[test]
fn delete_form_cascades_to_submissions() -> Result<()> {
    let store = store()?;
    let mut faker = IntakeFaker::new(9);
    let form = faker.form(2);
    let id = store.save_form(&form, &faker.settings())?;
    let submission = faker.submission(&form);
    store.record_submission(id, &submission, "Export", None)?;

    store.delete_form(id)?;
    assert!(store.load_form(id).is_err());
    assert!(store.list_submissions(id)?.is_empty());
    assert!(store.delete_form(id).is_err());
    Ok(())
}

#[test]
fn submissions_are_recorded_per_form() -> Result<()> {
    let store = store()?;
    let mut faker = IntakeFaker::new(21);
    let form = faker.form(3);
    let id = store.save_form(&form, &faker.settings())?;

    let submission = faker.submission(&form);
    let first = store.record_submission(id, &submission, "Dark mode", Some("ENG-12"))?;
    store.record_submission(id, &Submission::new(), "Bulk edit", None)?;

    let records = store.list_submissions(id)?;
    assert_eq!(records.len(), 2);
    let recorded = records
        .iter()
        .find(|record| record.id == first)
        .expect("first submission");
    assert_eq!(recorded.issue_identifier.as_deref(), Some("ENG-12"));
    assert_eq!(store.load_submission(first)?, submission);
    Ok(())
}

#[test]
fn submissions_require_an_existing_form() -> Result<()> {
    let store = store()?;
    let err = store
        .record_submission(FormId::new(7), &Submission::new(), "x", None)
        .expect_err("missing form");
    assert!(err.to_string().contains("save the form"));
    Ok(())
}

#[test]
fn file_store_persists_between_opens() -> Result<()> {
    let (_dir, path) = temp_db_path()?;
    let id = {
        let store = Store::open(&path)?;
        store.bootstrap()?;
        store.save_form(&FormDefinition::default(), &TrackerSettings::default())?
    };

    let store = Store::open(&path)?;
    store.bootstrap()?;
    assert_eq!(store.load_form(id)?.form, FormDefinition::default());
    Ok(())
}
