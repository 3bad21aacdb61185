use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CONFIG_FILE: &str = "roomify.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub render_url: Option<String>,
    pub request_timeout_secs: u64,
    pub log_filter: String,
    pub signed_in: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            render_url: None,
            request_timeout_secs: 120,
            log_filter: "info".into(),
            signed_in: true,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    render_url: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
    signed_in: Option<bool>,
}

/// Defaults, then `roomify.toml` (or `explicit_path`), then environment variables.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(&path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if explicit_path.is_some() => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.render_url {
        settings.render_url = non_empty(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file_cfg.signed_in {
        settings.signed_in = v;
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROOMIFY_RENDER_URL") {
        settings.render_url = non_empty(v);
    }
    if let Some(v) = lookup("APP__RENDER_URL") {
        settings.render_url = non_empty(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__SIGNED_IN") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.signed_in = true,
            "0" | "false" | "no" => settings.signed_in = false,
            _ => {}
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
