use std::{collections::HashMap, fs, path::Path};

use shared::domain::SortKey;
use tracing::warn;

pub const DEFAULT_CONFIG_FILE: &str = "order_desk.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub default_sort: SortKey,
    pub assume_yes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 10,
            default_sort: SortKey::PickupDate,
            assume_yes: false,
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match read_file_values(&raw) {
            Ok(file_cfg) => apply_values(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(err) => warn!(path = %path.display(), %err, "ignoring unreadable settings file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings.server_url = normalize_server_url(&settings.server_url);
    settings
}

fn read_file_values(raw: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table = toml::from_str::<HashMap<String, toml::Value>>(raw)?;
    Ok(table
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}

fn apply_values(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("server_url") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("request_timeout_secs") {
        set_timeout(settings, &v);
    }
    if let Some(v) = lookup("default_sort") {
        set_sort(settings, &v);
    }
    if let Some(v) = lookup("assume_yes") {
        set_assume_yes(settings, &v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ORDER_DESK_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        set_timeout(settings, &v);
    }
    if let Some(v) = lookup("APP__DEFAULT_SORT") {
        set_sort(settings, &v);
    }
    if let Some(v) = lookup("APP__ASSUME_YES") {
        set_assume_yes(settings, &v);
    }
}

fn set_timeout(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => settings.request_timeout_secs = secs,
        _ => warn!(value = raw, "ignoring invalid request timeout"),
    }
}

fn set_sort(settings: &mut Settings, raw: &str) {
    match raw.parse::<SortKey>() {
        Ok(sort) => settings.default_sort = sort,
        Err(err) => warn!(value = raw, %err, "ignoring invalid default sort"),
    }
}

fn set_assume_yes(settings: &mut Settings, raw: &str) {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => settings.assume_yes = true,
        "0" | "false" | "no" => settings.assume_yes = false,
        _ => warn!(value = raw, "ignoring invalid assume_yes flag"),
    }
}

pub fn normalize_server_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return Settings::default().server_url;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
