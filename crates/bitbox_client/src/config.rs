use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_SETTINGS_FILE: &str = "bitbox.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub api_url: String,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".into(),
            user_agent: concat!("bitbox-client/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Defaults, then `bitbox.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_url") {
                settings.api_url = v.clone();
            }
            if let Some(v) = file_cfg.get("user_agent") {
                settings.user_agent = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("BITBOX_API_URL") {
        settings.api_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Ok(v) = std::env::var("APP__USER_AGENT") {
        settings.user_agent = v;
    }

    settings
}

/// Validates the backend base URL and strips trailing slashes so endpoint
/// segments can be appended to it.
pub fn normalize_api_url(raw_api_url: &str) -> Result<String, ClientError> {
    let raw_api_url = raw_api_url.trim();
    if raw_api_url.is_empty() {
        return Ok(ClientSettings::default().api_url);
    }

    let parsed = Url::parse(raw_api_url)
        .map_err(|err| ClientError::InvalidBaseUrl(format!("{raw_api_url}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl(format!(
            "{raw_api_url}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.cannot_be_a_base() {
        return Err(ClientError::InvalidBaseUrl(raw_api_url.to_string()));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
