//! Settings persisted between runs.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::feed::FeedConfig;

/// Persisted user settings, stored as pretty-printed JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    #[serde(default)]
    pub feed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Settings {
    /// `<user config dir>/feedman/settings.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feedman").join("settings.json"))
    }

    /// Reads settings from `path`. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("No settings at {:?}", path);
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings at {:?}", path))?;
        Ok(Some(settings))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }

    /// The feed to talk to, or `None` when no feed URL is set.
    pub fn feed_config(&self) -> Option<FeedConfig> {
        let feed_url = self.feed_url.trim();
        if feed_url.is_empty() {
            return None;
        }
        let config = FeedConfig::new(feed_url);
        Some(match &self.api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        })
    }

    /// The API key with all but its last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        let key = self.api_key.as_deref().filter(|k| !k.is_empty())?;
        let chars: Vec<char> = key.chars().collect();
        let visible = chars.len().saturating_sub(4);
        let tail: String = chars[visible..].iter().collect();
        Some(format!("{}{}", "*".repeat(visible.min(8)), tail))
    }
}
