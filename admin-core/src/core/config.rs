use std::path::PathBuf;
use std::time::Duration;

use dogbar_client::ClientConfig;

/// Page sizes the media library accepts
pub const PAGE_SIZES: [usize; 4] = [12, 20, 36, 50];

/// Admin console configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | BACKEND_URL | http://localhost:54321 | hosted backend base URL |
/// | BACKEND_ANON_KEY | (empty) | public API key |
/// | MEDIA_BUCKET | media | blob-store bucket |
/// | WORK_DIR | ./.dogbar | session store and logs |
/// | REQUEST_TIMEOUT_SECS | 30 | HTTP timeout |
/// | PERMISSION_CACHE_TTL_SECS | 60 | permission matrix staleness window |
/// | ROLE_READY_TIMEOUT_MS | 5000 | bounded wait for role resolution |
/// | MEDIA_PAGE_SIZE | 20 | default page size, one of 12/20/36/50 |
/// | SHOW_DEFAULT_MEDIA | false | prepend built-in assets |
/// | DELETE_PROGRESS_DISMISS_MS | 1000 | delay before delete progress is cleared |
/// | AUDIT_BATCH_SIZE | 5 | audit flush batch |
/// | AUDIT_RETENTION_DAYS | 30 | audit retention window, 1 to 3650 |
/// | AUDIT_TRIM_DELAY_MS | 2000 | delay before a scheduled trim |
/// | LOG_LEVEL | info | tracing level |
/// | LOG_DIR | (unset) | optional rolling log directory |
///
/// # Example
///
/// ```ignore
/// BACKEND_URL=https://project.example.co MEDIA_PAGE_SIZE=36 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub anon_key: String,
    pub media_bucket: String,
    pub work_dir: String,
    pub request_timeout_secs: u64,
    pub permission_cache_ttl_secs: u64,
    pub role_ready_timeout_ms: u64,
    /// Always one of [`PAGE_SIZES`]
    pub media_page_size: usize,
    pub show_default_media: bool,
    pub delete_progress_dismiss_ms: u64,
    pub audit_batch_size: usize,
    pub audit_retention_days: i64,
    pub audit_trim_delay_ms: u64,
    pub log_level: String,
    pub log_dir: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Longest audit retention accepted from the environment
pub const MAX_AUDIT_RETENTION_DAYS: i64 = 3650;

const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_BATCH_SIZE: usize = 5;
const DEFAULT_RETENTION_DAYS: i64 = 30;

/// A configured value that was replaced by its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFallback {
    pub key: &'static str,
    pub value: String,
    pub fallback: String,
}

impl ConfigFallback {
    fn new(key: &'static str, value: impl ToString, fallback: impl ToString) -> Self {
        Self {
            key,
            value: value.to_string(),
            fallback: fallback.to_string(),
        }
    }
}

impl Config {
    /// Load from environment variables, falling back to defaults
    ///
    /// Out-of-range values are replaced silently; use [`load_env`](Self::load_env)
    /// to learn which.
    pub fn from_env() -> Self {
        Self::load_env().0
    }

    /// Load from the environment and report every value that was replaced
    ///
    /// Nothing is logged here, the subscriber may not be installed yet.
    pub fn load_env() -> (Self, Vec<ConfigFallback>) {
        let raw = Self {
            backend_url: std::env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:54321".into()),
            anon_key: std::env::var("BACKEND_ANON_KEY").unwrap_or_default(),
            media_bucket: std::env::var("MEDIA_BUCKET").unwrap_or_else(|_| "media".into()),
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./.dogbar".into()),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            permission_cache_ttl_secs: env_or("PERMISSION_CACHE_TTL_SECS", 60),
            role_ready_timeout_ms: env_or("ROLE_READY_TIMEOUT_MS", 5000),
            media_page_size: env_or("MEDIA_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            show_default_media: env_or("SHOW_DEFAULT_MEDIA", false),
            delete_progress_dismiss_ms: env_or("DELETE_PROGRESS_DISMISS_MS", 1000),
            audit_batch_size: env_or("AUDIT_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            audit_retention_days: env_or("AUDIT_RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
            audit_trim_delay_ms: env_or("AUDIT_TRIM_DELAY_MS", 2000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
        };
        raw.normalized()
    }

    /// Replace unsupported values with their defaults
    pub fn normalized(mut self) -> (Self, Vec<ConfigFallback>) {
        let mut fallbacks = Vec::new();

        if !PAGE_SIZES.contains(&self.media_page_size) {
            fallbacks.push(ConfigFallback::new(
                "MEDIA_PAGE_SIZE",
                self.media_page_size,
                DEFAULT_PAGE_SIZE,
            ));
            self.media_page_size = DEFAULT_PAGE_SIZE;
        }
        if self.audit_batch_size == 0 {
            fallbacks.push(ConfigFallback::new("AUDIT_BATCH_SIZE", 0, DEFAULT_BATCH_SIZE));
            self.audit_batch_size = DEFAULT_BATCH_SIZE;
        }
        if !(1..=MAX_AUDIT_RETENTION_DAYS).contains(&self.audit_retention_days) {
            fallbacks.push(ConfigFallback::new(
                "AUDIT_RETENTION_DAYS",
                self.audit_retention_days,
                DEFAULT_RETENTION_DAYS,
            ));
            self.audit_retention_days = DEFAULT_RETENTION_DAYS;
        }

        (self, fallbacks)
    }

    /// Defaults with a custom work dir and backend, for tests
    pub fn with_overrides(work_dir: impl Into<String>, backend_url: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.backend_url = backend_url.into();
        config
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.backend_url.clone())
            .with_anon_key(self.anon_key.clone())
            .with_bucket(self.media_bucket.clone())
            .with_timeout(self.request_timeout_secs)
    }

    pub fn work_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    pub fn permission_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.permission_cache_ttl_secs)
    }

    pub fn role_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.role_ready_timeout_ms)
    }

    pub fn delete_progress_dismiss(&self) -> Duration {
        Duration::from_millis(self.delete_progress_dismiss_ms)
    }

    pub fn audit_trim_delay(&self) -> Duration {
        Duration::from_millis(self.audit_trim_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_values_fall_back() {
        let config = Config {
            media_page_size: 25,
            audit_batch_size: 0,
            audit_retention_days: 1_000_000_000,
            ..Config::from_env()
        };

        let (config, fallbacks) = config.normalized();

        assert_eq!(config.media_page_size, 20);
        assert_eq!(config.audit_batch_size, 5);
        assert_eq!(config.audit_retention_days, 30);
        let keys: Vec<_> = fallbacks.iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec!["MEDIA_PAGE_SIZE", "AUDIT_BATCH_SIZE", "AUDIT_RETENTION_DAYS"]
        );
        assert_eq!(fallbacks[2].value, "1000000000");
    }

    #[test]
    fn test_supported_values_are_kept() {
        let config = Config {
            media_page_size: 36,
            audit_batch_size: 10,
            audit_retention_days: MAX_AUDIT_RETENTION_DAYS,
            ..Config::from_env()
        };

        let (config, fallbacks) = config.normalized();

        assert!(fallbacks.is_empty());
        assert_eq!(config.media_page_size, 36);
        assert_eq!(config.audit_retention_days, MAX_AUDIT_RETENTION_DAYS);
    }
}
