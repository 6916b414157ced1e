use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    /// Unset means a request may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(self.gemini_api_key.as_deref(), |name| std::env::var(name).ok())
    }

    pub fn model(&self) -> &str {
        self.gemini_model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.gemini_base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/')
    }
}

const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Configured key first, then the environment. Blank values count as unset.
fn resolve_api_key(configured: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Option<String> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(API_KEY_ENV_VARS.iter().filter_map(|name| env(name)))
        .find(|k| !k.trim().is_empty())
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn load_settings_from_dir(data_dir: &Path) -> Settings {
    let path = settings_path(data_dir);
    if let Ok(bytes) = fs::read(&path) {
        if let Ok(s) = serde_json::from_slice::<Settings>(&bytes) {
            return s;
        }
    }
    Settings::default()
}

pub fn save_settings_to_dir(data_dir: &Path, s: &Settings) -> Result<()> {
    let path = settings_path(data_dir);
    let json = serde_json::to_vec_pretty(s)?;
    fs::write(path, json).context("write settings")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from_dir(dir.path());
        assert!(s.gemini_model.is_none());
        assert_eq!(s.model(), DEFAULT_GEMINI_MODEL);

        fs::write(settings_path(dir.path()), b"{ not json").unwrap();
        let s = load_settings_from_dir(dir.path());
        assert!(s.request_timeout_secs.is_none());
    }

    #[test]
    fn save_then_load_keeps_fields() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings {
            gemini_model: Some("custom-image-model".into()),
            gemini_base_url: Some("http://localhost:9999/v1beta/".into()),
            request_timeout_secs: Some(30),
            ..Settings::default()
        };
        save_settings_to_dir(dir.path(), &s).unwrap();
        let loaded = load_settings_from_dir(dir.path());
        assert_eq!(loaded.model(), "custom-image-model");
        assert_eq!(loaded.base_url(), "http://localhost:9999/v1beta");
        assert_eq!(loaded.request_timeout_secs, Some(30));
    }

    #[test]
    fn explicit_key_wins_over_environment() {
        let s = Settings {
            gemini_api_key: Some("from-file".into()),
            ..Settings::default()
        };
        assert_eq!(s.api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn blank_keys_fall_through_to_the_next_source() {
        let env = |name: &str| match name {
            "GEMINI_API_KEY" => Some("   ".to_string()),
            "API_KEY" => Some("from-env".to_string()),
            _ => None,
        };
        assert_eq!(resolve_api_key(Some(""), env).as_deref(), Some("from-env"));
        assert_eq!(resolve_api_key(Some("file"), env).as_deref(), Some("file"));

        let blank_env = |_: &str| Some(String::new());
        assert_eq!(resolve_api_key(None, blank_env), None);
        assert_eq!(resolve_api_key(None, |_: &str| None), None);
    }
}
