use std::{fs, path::Path};

use serde::Deserialize;
use shared::{domain::Coordinate, protocol::DEFAULT_PAGE_LIMIT};

pub const SETTINGS_FILE: &str = "admin.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub page_limit: u32,
    pub log_filter: String,
    /// Stand-in for device geolocation in a terminal session.
    pub device_location: Option<Coordinate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".into(),
            page_limit: DEFAULT_PAGE_LIMIT,
            log_filter: "info".into(),
            device_location: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    page_limit: Option<u32>,
    log_filter: Option<String>,
    device_location: Option<String>,
}

pub fn load_settings() -> Settings {
    load_settings_with(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the settings file, then the environment.
pub fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<FileSettings>(&raw) {
            if let Some(v) = file_cfg.api_url {
                settings.api_url = v;
            }
            if let Some(v) = file_cfg.page_limit.filter(|limit| *limit > 0) {
                settings.page_limit = v;
            }
            if let Some(v) = file_cfg.log_filter {
                settings.log_filter = v;
            }
            if let Some(v) = file_cfg.device_location.as_deref().and_then(parse_coordinate) {
                settings.device_location = Some(v);
            }
        }
    }

    if let Some(v) = env("ADMIN_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("APP__PAGE_LIMIT") {
        if let Ok(parsed) = v.parse::<u32>() {
            if parsed > 0 {
                settings.page_limit = parsed;
            }
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = env("APP__DEVICE_LOCATION") {
        settings.device_location = parse_coordinate(&v);
    }

    settings
}

/// Parses `"lat,lng"`.
pub fn parse_coordinate(raw: &str) -> Option<Coordinate> {
    let (lat, lng) = raw.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(Coordinate::new(lat, lng))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
