//! # Configuration
//!
//! Environment-driven settings for the reminder daemon and its services.
//! Values are read once at startup after `.env` has been loaded.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Single `REMINDER_POLL_SECONDS` replaces the per-view poll periods
//! - 1.0.0: Initial release

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::features::reminders::PermissionState;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_DATA_DIR: &str = ".navarya";
pub const DEFAULT_POLL_SECONDS: u64 = 60;
pub const DEFAULT_TOAST_MAX_VISIBLE: usize = 3;
pub const DEFAULT_TOAST_DURATION_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, without a trailing slash
    pub api_url: String,
    /// Session token issued by the identity provider, if signed in
    pub auth_token: Option<String>,
    /// Directory holding the local cache file
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    /// Skip reminders whose notification was already sent
    pub dedupe_sent: bool,
    pub notification_permission: PermissionState,
    pub toast_max_visible: usize,
    pub toast_duration: Duration,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECONDS),
            dedupe_sent: false,
            notification_permission: PermissionState::Default,
            toast_max_visible: DEFAULT_TOAST_MAX_VISIBLE,
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by `from_env` and tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let api_url = lookup("NAVARYA_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let auth_token = lookup("NAVARYA_AUTH_TOKEN").filter(|token| !token.trim().is_empty());

        let data_dir = lookup("NAVARYA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let poll_seconds = parse_or(&lookup, "REMINDER_POLL_SECONDS", DEFAULT_POLL_SECONDS)?;
        if poll_seconds == 0 {
            return Err(anyhow!("REMINDER_POLL_SECONDS must be greater than zero"));
        }

        let dedupe_sent = parse_or(&lookup, "REMINDER_DEDUPE_SENT", false)?;

        let notification_permission = match lookup("NOTIFICATION_PERMISSION") {
            Some(value) => value
                .parse::<PermissionState>()
                .map_err(|e| anyhow!("Invalid NOTIFICATION_PERMISSION: {e}"))?,
            None => defaults.notification_permission,
        };

        let toast_max_visible =
            parse_or(&lookup, "TOAST_MAX_VISIBLE", DEFAULT_TOAST_MAX_VISIBLE)?.max(1);
        let toast_duration_ms = parse_or(&lookup, "TOAST_DURATION_MS", DEFAULT_TOAST_DURATION_MS)?;

        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Config {
            api_url,
            auth_token,
            data_dir,
            poll_interval: Duration::from_secs(poll_seconds),
            dedupe_sent,
            notification_permission,
            toast_max_visible,
            toast_duration: Duration::from_millis(toast_duration_ms),
            log_level,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value for {key} ('{raw}'): {e}")),
        None => Ok(default),
    }
}
