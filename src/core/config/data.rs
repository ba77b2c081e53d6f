use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::stream::{DecoderOptions, SessionOptions};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Keys accepted by `parley set` / `parley unset`.
pub const SETTING_KEYS: &[&str] = &[
    "base-url",
    "default-model",
    "tool-name",
    "idle-timeout",
    "placeholder",
    "log-file",
];

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Root of the OpenAI-compatible API (chat and model endpoints hang off it)
    pub base_url: Option<String>,
    pub default_model: Option<String>,
    /// Tool whose call/response frames are shown in the transcript
    pub tool_name: Option<String>,
    /// Seconds to wait for the next chunk before giving up on a response
    pub idle_timeout_secs: Option<u64>,
    /// Text shown while waiting for the first chunk of a response
    pub placeholder: Option<String>,
    /// Append finished responses to this file
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingError {
    UnknownKey(String),
    InvalidNumber { key: &'static str, input: String },
    EmptyValue(&'static str),
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(
                f,
                "Unknown config key: {key} (expected one of: {})",
                SETTING_KEYS.join(", ")
            ),
            SettingError::InvalidNumber { key, input } => {
                write!(f, "{key} expects a positive whole number of seconds, got '{input}'")
            }
            SettingError::EmptyValue(key) => write!(f, "{key} needs a value"),
        }
    }
}

impl Error for SettingError {}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn session_options(&self) -> SessionOptions {
        let defaults = SessionOptions::default();
        SessionOptions {
            placeholder: self
                .placeholder
                .clone()
                .unwrap_or(defaults.placeholder),
            idle_timeout: self
                .idle_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            decoder: match &self.tool_name {
                Some(tool_name) => DecoderOptions {
                    tool_name: tool_name.clone(),
                },
                None => defaults.decoder,
            },
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), SettingError> {
        let value = value.trim();
        if key == "idle-timeout" {
            let secs = value
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SettingError::InvalidNumber {
                    key: "idle-timeout",
                    input: value.to_string(),
                })?;
            self.idle_timeout_secs = Some(secs);
            return Ok(());
        }

        let (name, slot) = self
            .string_slot(key)
            .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
        if value.is_empty() {
            return Err(SettingError::EmptyValue(name));
        }
        *slot = Some(value.to_string());
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), SettingError> {
        if key == "idle-timeout" {
            self.idle_timeout_secs = None;
            return Ok(());
        }

        let (_, slot) = self
            .string_slot(key)
            .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
        *slot = None;
        Ok(())
    }

    /// Current value of a setting key, formatted for `parley set` output.
    pub fn display_value(&self, key: &str) -> Option<String> {
        match key {
            "base-url" => self.base_url.clone(),
            "default-model" => self.default_model.clone(),
            "tool-name" => self.tool_name.clone(),
            "idle-timeout" => self.idle_timeout_secs.map(|secs| format!("{secs}s")),
            "placeholder" => self.placeholder.clone(),
            "log-file" => self.log_file.clone(),
            _ => None,
        }
    }

    fn string_slot(&mut self, key: &str) -> Option<(&'static str, &mut Option<String>)> {
        match key {
            "base-url" => Some(("base-url", &mut self.base_url)),
            "default-model" => Some(("default-model", &mut self.default_model)),
            "tool-name" => Some(("tool-name", &mut self.tool_name)),
            "placeholder" => Some(("placeholder", &mut self.placeholder)),
            "log-file" => Some(("log-file", &mut self.log_file)),
            _ => None,
        }
    }
}

/// Render a path for display, abbreviating the home directory to `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
