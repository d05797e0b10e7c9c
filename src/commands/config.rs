//! Resolving the feed to use from flags, environment and stored settings.

use anyhow::{Context, Result};
use log::debug;
use std::path::PathBuf;

use crate::{
    application::{FeedSession, Settings},
    feed::FeedConfig,
    http::build_client,
};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub feed_url: Option<String>,
    pub api_key: Option<String>,
    pub settings_path: Option<PathBuf>,
}

impl GlobalOptions {
    /// `--settings`, falling back to the per-user default.
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_path.clone().or_else(Settings::default_path)
    }

    pub fn require_settings_path(&self) -> Result<PathBuf> {
        self.settings_path()
            .context("Could not determine the user config directory; pass --settings")
    }

    /// Stored settings, or defaults when none are saved yet.
    pub fn stored_settings(&self) -> Result<Settings> {
        match self.settings_path() {
            Some(path) => Ok(Settings::load(&path)?.unwrap_or_default()),
            None => Ok(Settings::default()),
        }
    }

    /// Command-line values over stored settings.
    pub fn feed_config(&self) -> Result<FeedConfig> {
        let mut settings = self.stored_settings()?;
        if let Some(feed_url) = self.feed_url.as_deref().filter(|u| !u.trim().is_empty()) {
            settings.feed_url = feed_url.to_string();
        }
        if let Some(api_key) = &self.api_key {
            settings.api_key = Some(api_key.clone());
        }

        settings.feed_config().context(
            "No feed URL configured. Pass --feed-url or run `feedman config set --feed-url <URL>`",
        )
    }
}

/// Everything a feed command needs.
pub struct Config {
    pub session: FeedSession,
}

impl Config {
    pub fn new(options: &GlobalOptions) -> Result<Self> {
        let feed = options.feed_config()?;
        debug!("Using feed {:?}", feed);

        let http = build_client().context("Failed to build HTTP client")?;
        Ok(Self {
            session: FeedSession::new(http, feed),
        })
    }
}
