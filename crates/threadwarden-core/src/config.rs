//! Engine configuration: JSON file with environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1500;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_KEEPALIVE_SECS: u64 = 300;
pub const DEFAULT_KEEPALIVE_TYPING_MS: u64 = 1500;

/// Top-level Threadwarden configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Attempts per corrective action (the "double protection").
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Fixed pause between attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Ceiling on remote calls in flight across all resource keys.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_interval_secs: u64,
    #[serde(default = "default_keepalive_typing_ms")]
    pub keepalive_typing_ms: u64,
}

fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}
fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}
fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}
fn default_keepalive_secs() -> u64 {
    DEFAULT_KEEPALIVE_SECS
}
fn default_keepalive_typing_ms() -> u64 {
    DEFAULT_KEEPALIVE_TYPING_MS
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_SECS,
            keepalive_typing_ms: DEFAULT_KEEPALIVE_TYPING_MS,
        }
    }
}

impl WardenConfig {
    /// Load config from a JSON file, falling back to defaults, then apply
    /// `WARDEN_*` environment overrides.
    pub fn load(config_path: &Path) -> Self {
        let mut config: WardenConfig = match std::fs::read_to_string(config_path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => {
                    info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring invalid config {}: {}", config_path.display(), e);
                    WardenConfig::default()
                }
            },
            Err(_) => WardenConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.sanitize();
        config
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, "WARDEN_RETRY_ATTEMPTS") {
            self.retry_attempts = v;
        }
        if let Some(v) = parse_override(&lookup, "WARDEN_RETRY_DELAY_MS") {
            self.retry_delay_ms = v;
        }
        if let Some(v) = parse_override(&lookup, "WARDEN_MAX_CONCURRENCY") {
            self.max_concurrency = v;
        }
        if let Some(v) = parse_override(&lookup, "WARDEN_KEEPALIVE_SECS") {
            self.keepalive_interval_secs = v;
        }
        if let Some(v) = parse_override(&lookup, "WARDEN_KEEPALIVE_TYPING_MS") {
            self.keepalive_typing_ms = v;
        }
    }

    /// Clamp values that would stall the executor.
    fn sanitize(&mut self) {
        self.retry_attempts = self.retry_attempts.max(1);
        self.max_concurrency = self.max_concurrency.max(1);
        self.keepalive_interval_secs = self.keepalive_interval_secs.max(1);
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn keepalive_typing(&self) -> Duration {
        Duration::from_millis(self.keepalive_typing_ms)
    }

    /// Save config to disk.
    pub fn save(&self, config_path: &Path) -> crate::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = WardenConfig::load(&dir.path().join("nope.json"));
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadwarden.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = WardenConfig::load(&path);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threadwarden.json");
        std::fs::write(&path, r#"{ "retry_delay_ms": 250 }"#).unwrap();

        let config: WardenConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.retry_delay_ms, 250);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.keepalive_interval_secs, DEFAULT_KEEPALIVE_SECS);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("threadwarden.json");
        let config = WardenConfig {
            max_concurrency: 9,
            ..WardenConfig::default()
        };
        config.save(&path).unwrap();

        let reloaded: WardenConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.max_concurrency, 9);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("WARDEN_RETRY_DELAY_MS", "20"),
            ("WARDEN_MAX_CONCURRENCY", " 2 "),
            ("WARDEN_RETRY_ATTEMPTS", "lots"),
            ("WARDEN_KEEPALIVE_TYPING_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = WardenConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.retry_delay_ms, 20);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.keepalive_typing(), Duration::from_millis(250));
        // Garbage is ignored
        assert_eq!(config.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_sanitize_clamps_zero() {
        let mut config = WardenConfig {
            retry_attempts: 0,
            max_concurrency: 0,
            keepalive_interval_secs: 0,
            ..WardenConfig::default()
        };
        config.sanitize();
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.keepalive_interval_secs, 1);
    }
}
