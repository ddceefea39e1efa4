// Draw Lottery - Store Configuration
use std::env;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_STORE_URL: &str = "http://localhost:8787";
pub const DEFAULT_PUBLIC_KEY: &str = "public";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const STORE_URL_VAR: &str = "LOTTERY_STORE_URL";
pub const PUBLIC_KEY_VAR: &str = "LOTTERY_PUBLIC_KEY";
pub const TIMEOUT_VAR: &str = "LOTTERY_TIMEOUT_SECS";

/// Where the lottery store lives and how to talk to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Anonymous bearer credential accepted for reads
    pub public_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STORE_URL.to_string(),
            public_key: DEFAULT_PUBLIC_KEY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl StoreConfig {
    /// Default settings pointed at another store
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for
    /// missing or unusable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(STORE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup(PUBLIC_KEY_VAR).filter(|v| !v.trim().is_empty()) {
            config.public_key = key.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => warn!(
                    "Ignoring {}={:?}, using {}s",
                    TIMEOUT_VAR, raw, DEFAULT_TIMEOUT_SECS
                ),
            }
        }
        config
    }
}
