// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use intake_app::PickerOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_API_KEY_ENV: &str = "INTAKE_TRACKER_API_KEY";
const DEFAULT_TIMEOUT: &str = "10s";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub ui: Ui,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            tracker: Tracker::default(),
            ui: Ui::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tracker {
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Tracker {
    fn default() -> Self {
        Self {
            endpoint: Some(intake_tracker::DEFAULT_ENDPOINT.to_owned()),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub disable_search_focus: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            disable_search_focus: Some(false),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("INTAKE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set INTAKE_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(intake_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and keep values under [storage], [tracker], and [ui]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.storage.db_path {
            intake_db::validate_db_path(db_path)?;
        }

        if let Some(endpoint) = &self.tracker.endpoint
            && endpoint.trim().is_empty()
        {
            bail!("tracker.endpoint in {} must not be empty", path.display());
        }

        if let Some(name) = &self.tracker.api_key_env
            && (name.is_empty() || name.contains(['=', '\0']))
        {
            bail!(
                "tracker.api_key_env in {} must name an environment variable, got {:?}",
                path.display(),
                name
            );
        }

        if let Some(timeout) = &self.tracker.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "tracker.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => intake_db::default_db_path(),
        }
    }

    pub fn tracker_endpoint(&self) -> &str {
        self.tracker
            .endpoint
            .as_deref()
            .unwrap_or(intake_tracker::DEFAULT_ENDPOINT)
            .trim_end_matches('/')
    }

    pub fn tracker_api_key_env(&self) -> &str {
        self.tracker
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV)
    }

    pub fn tracker_timeout(&self) -> Result<Duration> {
        parse_duration(self.tracker.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    /// The API key from the variable named by `tracker.api_key_env`, or
    /// `None` when it is unset or blank.
    pub fn tracker_api_key(&self) -> Option<String> {
        env::var(self.tracker_api_key_env())
            .ok()
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
    }

    pub fn tracker_client(&self) -> Result<Option<intake_tracker::Client>> {
        let Some(api_key) = self.tracker_api_key() else {
            return Ok(None);
        };
        let client = intake_tracker::Client::new(
            self.tracker_endpoint(),
            &api_key,
            self.tracker_timeout()?,
        )?;
        Ok(Some(client))
    }

    pub fn picker_options(&self) -> PickerOptions {
        PickerOptions {
            auto_focus_search: !self.ui.disable_search_focus.unwrap_or(false),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# intake config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/intake/intake.db)\n# db_path = \"/absolute/path/to/intake.db\"\n\n[tracker]\nendpoint = \"{}\"\n# Name of the environment variable holding the tracker API key\napi_key_env = \"{}\"\ntimeout = \"{}\"\n\n[ui]\n# Keep typing in the text field when the reference picker opens\ndisable_search_focus = false\n",
            path.display(),
            intake_tracker::DEFAULT_ENDPOINT,
            DEFAULT_API_KEY_ENV,
            DEFAULT_TIMEOUT,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    const HINT: &str = "use <N>ms, <N>s, or <N>m (for example 500ms or 10s)";
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(
        raw.find(|c: char| !c.is_ascii_digit())
            .unwrap_or(raw.len()),
    );
    let amount: u64 = digits
        .parse()
        .with_context(|| format!("invalid duration {raw:?}; {HINT}"))?;
    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.saturating_mul(60)),
        _ => bail!("invalid duration unit in {raw:?}; {HINT}"),
    };
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.tracker_endpoint(), intake_tracker::DEFAULT_ENDPOINT);
        assert_eq!(config.tracker_timeout()?, Duration::from_secs(10));
        assert!(config.picker_options().auto_focus_search);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[tracker]\ntimeout = \"5s\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage], [tracker], and [ui]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[tracker]\nendpoint = \"http://localhost:9000/graphql/\"\napi_key_env = \"MY_KEY\"\ntimeout = \"500ms\"\n[ui]\ndisable_search_focus = true\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.tracker_endpoint(), "http://localhost:9000/graphql");
        assert_eq!(config.tracker_api_key_env(), "MY_KEY");
        assert_eq!(config.tracker_timeout()?, Duration::from_millis(500));
        assert!(!config.picker_options().auto_focus_search);
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 3\n")?;
        let error = Config::load(&path).expect_err("v3 config should fail");
        assert!(error.to_string().contains("unsupported config version 3"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("INTAKE_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("INTAKE_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn storage_db_path_wins_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_explicit_dir, explicit) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        let (_bare_dir, bare) = write_config("version = 1\n")?;

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("INTAKE_DB_PATH", "/from/env.db");
        }
        let from_config = Config::load(&explicit)?.db_path();
        let from_env = Config::load(&bare)?.db_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("INTAKE_DB_PATH");
        }

        assert_eq!(from_config?, PathBuf::from("/explicit/from-config.db"));
        assert_eq!(from_env?, PathBuf::from("/from/env.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"https://evil.example/intake.db\"\n")?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        assert!(error.to_string().contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn tracker_values_are_validated() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[tracker]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));

        let (_temp, path) = write_config("version = 1\n[tracker]\napi_key_env = \"\"\n")?;
        let error = Config::load(&path).expect_err("empty env name should fail");
        assert!(error.to_string().contains("api_key_env"));

        let (_temp, path) = write_config("version = 1\n[tracker]\nendpoint = \" \"\n")?;
        assert!(Config::load(&path).is_err());
        Ok(())
    }

    #[test]
    fn api_key_comes_from_named_variable() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[tracker]\napi_key_env = \"INTAKE_TEST_KEY\"\n")?;
        let config = Config::load(&path)?;

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("INTAKE_TEST_KEY", "  lin_api_abc \n");
        }
        let key = config.tracker_api_key();
        let client = config.tracker_client()?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("INTAKE_TEST_KEY", "   ");
        }
        let blank = config.tracker_api_key();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("INTAKE_TEST_KEY");
        }

        assert_eq!(key.as_deref(), Some("lin_api_abc"));
        assert!(client.is_some());
        assert_eq!(blank, None);
        assert!(config.tracker_client()?.is_none());
        Ok(())
    }

    #[test]
    fn durations_take_a_unit_suffix() -> Result<()> {
        assert_eq!(parse_duration("750ms")?, Duration::from_millis(750));
        assert_eq!(parse_duration(" 30s ")?, Duration::from_secs(30));
        assert_eq!(parse_duration("3m")?, Duration::from_secs(180));

        for bad in ["nope", "10", "5h", "ms"] {
            let error = parse_duration(bad).expect_err("invalid duration should fail");
            assert!(error.to_string().contains("invalid duration"), "{bad}");
        }
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("[storage]"));
        assert!(example.contains("[tracker]"));
        assert!(example.contains("[ui]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.tracker_api_key_env(), "INTAKE_TRACKER_API_KEY");
        Ok(())
    }
}
