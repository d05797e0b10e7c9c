//! `feedman config show` and `feedman config set`.

use anyhow::Result;
use log::info;

use super::config::GlobalOptions;
use crate::application::Settings;

pub fn show(options: &GlobalOptions) -> Result<()> {
    let path = options.require_settings_path()?;
    let settings = Settings::load(&path)?.unwrap_or_default();

    println!("Settings: {}", path.display());
    println!(
        "FeedUrl:  {}",
        if settings.feed_url.is_empty() {
            "(not set)"
        } else {
            &settings.feed_url
        }
    );
    println!(
        "ApiKey:   {}",
        settings
            .masked_api_key()
            .unwrap_or_else(|| "(not set)".to_string())
    );
    Ok(())
}

/// Stores the given `--feed-url` and `--api-key`. An empty key clears the
/// stored one.
pub fn set(options: &GlobalOptions) -> Result<()> {
    let path = options.require_settings_path()?;
    let mut settings = Settings::load(&path)?.unwrap_or_default();

    if let Some(feed_url) = &options.feed_url {
        settings.feed_url = feed_url.trim().to_string();
    }
    if let Some(api_key) = &options.api_key {
        let api_key = api_key.trim();
        settings.api_key = (!api_key.is_empty()).then(|| api_key.to_string());
    }

    settings.save(&path)?;
    info!("Saved settings to {:?}", path);
    println!("Saved {}", path.display());
    Ok(())
}
