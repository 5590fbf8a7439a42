// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use intake_app::{
    FieldId, FieldType, FormDefinition, FormField, FormId, FormSummary, Submission, SubmissionId,
    SubmissionRecord, TrackerSettings,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const APP_NAME: &str = "intake";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    (
        "forms",
        &["id", "name", "settings", "created_at", "updated_at"],
    ),
    (
        "form_fields",
        &[
            "id",
            "form_id",
            "position",
            "field_id",
            "field_type",
            "label",
            "placeholder",
            "required",
            "options",
            "country_code",
            "accepted_file_types",
            "multiple",
            "max_file_size_mb",
        ],
    ),
    (
        "submissions",
        &[
            "id",
            "form_id",
            "answers",
            "issue_title",
            "issue_identifier",
            "created_at",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_form_fields_position",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_form_fields_position ON form_fields (form_id, position);",
    },
    RequiredIndex {
        name: "idx_form_fields_field_id",
        create_sql: "CREATE UNIQUE INDEX IF NOT EXISTS idx_form_fields_field_id ON form_fields (form_id, field_id);",
    },
    RequiredIndex {
        name: "idx_submissions_form_id",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_submissions_form_id ON submissions (form_id);",
    },
];

/// A form as persisted, with its tracker settings. Template and placeholder
/// text is stored in canonical token form; mentions are rebuilt from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredForm {
    pub id: FormId,
    pub form: FormDefinition,
    pub settings: TrackerSettings,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)
    }

    pub fn save_form(&self, form: &FormDefinition, settings: &TrackerSettings) -> Result<FormId> {
        form.validate()?;
        let settings_json = encode_settings(settings)?;
        let now = now_rfc3339()?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin form save")?;
        tx.execute(
            "
            INSERT INTO forms (name, settings, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ",
            params![form.name, settings_json, now, now],
        )
        .context("insert form")?;
        let form_id = FormId::new(tx.last_insert_rowid());
        insert_fields(&tx, form_id, form.fields())?;
        tx.commit().context("commit form save")?;

        tracing::debug!(form_id = form_id.get(), fields = form.fields().len(), "form saved");
        Ok(form_id)
    }

    pub fn update_form(
        &self,
        form_id: FormId,
        form: &FormDefinition,
        settings: &TrackerSettings,
    ) -> Result<()> {
        form.validate()?;
        let settings_json = encode_settings(settings)?;
        let now = now_rfc3339()?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin form update")?;
        let rows_affected = tx
            .execute(
                "
                UPDATE forms
                SET name = ?, settings = ?, updated_at = ?
                WHERE id = ?
                ",
                params![form.name, settings_json, now, form_id.get()],
            )
            .context("update form")?;
        if rows_affected == 0 {
            bail!(
                "form {} not found -- it may have been deleted, save it as a new form",
                form_id.get()
            );
        }
        tx.execute(
            "DELETE FROM form_fields WHERE form_id = ?",
            params![form_id.get()],
        )
        .context("clear form fields")?;
        insert_fields(&tx, form_id, form.fields())?;
        tx.commit().context("commit form update")?;

        tracing::debug!(form_id = form_id.get(), "form updated");
        Ok(())
    }

    pub fn load_form(&self, form_id: FormId) -> Result<StoredForm> {
        let row = self
            .conn
            .query_row(
                "
                SELECT name, settings, created_at, updated_at
                FROM forms
                WHERE id = ?
                ",
                params![form_id.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .with_context(|| format!("load form {}", form_id.get()))?;
        let Some((name, settings_raw, created_at_raw, updated_at_raw)) = row else {
            bail!(
                "form {} not found -- run with --print-path to check which database is open",
                form_id.get()
            );
        };

        let fields = self.load_fields(form_id)?;
        let form = FormDefinition::from_fields(name, fields)
            .with_context(|| format!("form {} is invalid", form_id.get()))?;

        Ok(StoredForm {
            id: form_id,
            form,
            settings: decode_settings(&settings_raw)?,
            created_at: parse_datetime(&created_at_raw)?,
            updated_at: parse_datetime(&updated_at_raw)?,
        })
    }

    pub fn list_forms(&self) -> Result<Vec<FormSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT f.id, f.name, f.updated_at, COUNT(ff.id)
                FROM forms f
                LEFT JOIN form_fields ff ON ff.form_id = f.id
                GROUP BY f.id
                ORDER BY f.updated_at DESC, f.id DESC
                ",
            )
            .context("prepare forms query")?;
        let rows = stmt
            .query_map([], |row| {
                let updated_at_raw: String = row.get(2)?;
                let field_count: i64 = row.get(3)?;
                Ok(FormSummary {
                    id: FormId::new(row.get(0)?),
                    name: row.get(1)?,
                    field_count: usize::try_from(field_count).unwrap_or_default(),
                    updated_at: parse_datetime(&updated_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query forms")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect forms")
    }

    pub fn delete_form(&self, form_id: FormId) -> Result<()> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM forms WHERE id = ?", params![form_id.get()])
            .context("delete form")?;
        if rows_affected == 0 {
            bail!("form {} not found -- nothing to delete", form_id.get());
        }
        tracing::debug!(form_id = form_id.get(), "form deleted");
        Ok(())
    }

    pub fn record_submission(
        &self,
        form_id: FormId,
        submission: &Submission,
        issue_title: &str,
        issue_identifier: Option<&str>,
    ) -> Result<SubmissionId> {
        self.require_form(form_id)?;
        let answers = serde_json::to_string(submission).context("encode submission answers")?;
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO submissions (
                  form_id, answers, issue_title, issue_identifier, created_at
                ) VALUES (?, ?, ?, ?, ?)
                ",
                params![form_id.get(), answers, issue_title, issue_identifier, now],
            )
            .context("insert submission")?;

        Ok(SubmissionId::new(self.conn.last_insert_rowid()))
    }

    pub fn list_submissions(&self, form_id: FormId) -> Result<Vec<SubmissionRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT id, form_id, issue_title, issue_identifier, created_at
                FROM submissions
                WHERE form_id = ?
                ORDER BY created_at DESC, id DESC
                ",
            )
            .context("prepare submissions query")?;
        let rows = stmt
            .query_map(params![form_id.get()], |row| {
                let created_at_raw: String = row.get(4)?;
                Ok(SubmissionRecord {
                    id: SubmissionId::new(row.get(0)?),
                    form_id: FormId::new(row.get(1)?),
                    issue_title: row.get(2)?,
                    issue_identifier: row.get(3)?,
                    created_at: parse_datetime(&created_at_raw).map_err(to_sql_error)?,
                })
            })
            .context("query submissions")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect submissions")
    }

    pub fn load_submission(&self, submission_id: SubmissionId) -> Result<Submission> {
        let answers: Option<String> = self
            .conn
            .query_row(
                "SELECT answers FROM submissions WHERE id = ?",
                params![submission_id.get()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("load submission {}", submission_id.get()))?;
        let Some(answers) = answers else {
            bail!("submission {} not found", submission_id.get());
        };
        serde_json::from_str(&answers)
            .with_context(|| format!("decode answers of submission {}", submission_id.get()))
    }

    fn load_fields(&self, form_id: FormId) -> Result<Vec<FormField>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  field_id, field_type, label, placeholder, required, options,
                  country_code, accepted_file_types, multiple, max_file_size_mb
                FROM form_fields
                WHERE form_id = ?
                ORDER BY position ASC
                ",
            )
            .context("prepare form fields query")?;
        let rows = stmt
            .query_map(params![form_id.get()], |row| {
                let type_raw: String = row.get(1)?;
                let field_type = FieldType::parse(&type_raw)
                    .ok_or_else(|| conversion_error(1, format!("unknown field type {type_raw}")))?;
                let options_raw: String = row.get(5)?;
                let options = serde_json::from_str::<Vec<String>>(&options_raw)
                    .map_err(|err| conversion_error(5, format!("invalid options: {err}")))?;

                Ok(FormField {
                    id: FieldId::new(row.get::<_, String>(0)?),
                    field_type,
                    label: row.get(2)?,
                    placeholder: row.get(3)?,
                    required: row.get(4)?,
                    options,
                    country_code: row.get(6)?,
                    accepted_file_types: row.get(7)?,
                    multiple: row.get(8)?,
                    max_file_size_mb: row.get(9)?,
                })
            })
            .context("query form fields")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect fields of form {}", form_id.get()))
    }

    fn require_form(&self, form_id: FormId) -> Result<()> {
        let exists: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM forms WHERE id = ?)",
                params![form_id.get()],
                |row| row.get(0),
            )
            .context("check form existence")?;
        if exists != 1 {
            bail!(
                "form {} not found -- save the form before recording submissions",
                form_id.get()
            );
        }
        Ok(())
    }
}

fn insert_fields(conn: &Connection, form_id: FormId, fields: &[FormField]) -> Result<()> {
    let mut stmt = conn
        .prepare(
            "
            INSERT INTO form_fields (
              form_id, position, field_id, field_type, label, placeholder, required,
              options, country_code, accepted_file_types, multiple, max_file_size_mb
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .context("prepare field insert")?;

    for (position, field) in fields.iter().enumerate() {
        let options = serde_json::to_string(&field.options).context("encode field options")?;
        let position = i64::try_from(position).context("field position overflow")?;
        stmt.execute(params![
            form_id.get(),
            position,
            field.id.as_str(),
            field.field_type.as_str(),
            field.label,
            field.placeholder,
            field.required,
            options,
            field.country_code,
            field.accepted_file_types,
            field.multiple,
            field.max_file_size_mb,
        ])
        .with_context(|| format!("insert field {}", field.id))?;
    }
    Ok(())
}

pub fn data_dir() -> Result<PathBuf> {
    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set INTAKE_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir)
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("INTAKE_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }
    Ok(data_dir()?.join("intake.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn encode_settings(settings: &TrackerSettings) -> Result<String> {
    serde_json::to_string(settings).context("encode tracker settings")
}

fn decode_settings(raw: &str) -> Result<TrackerSettings> {
    serde_json::from_str(raw)
        .context("stored tracker settings are unreadable -- re-save the form to rewrite them")
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use an intake database or point INTAKE_DB_PATH at a new file"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}

fn parse_datetime(raw: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .with_context(|| format!("unsupported datetime format {raw:?}"))
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

fn to_sql_error(error: anyhow::Error) -> rusqlite::Error {
    conversion_error(0, error.to_string())
}
