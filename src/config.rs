use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScrapeError};

/// Mirrors of the content site, in probe order.
pub const DEFAULT_DOMAIN_POOL: &[&str] = &[
    "https://hianimez.is",
    "https://hianimez.to",
    "https://hianime.is",
    "https://hianime.bz",
    "https://hianimez.bz",
];

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const DEFAULT_HTTP_TIMEOUT_SECS: f64 = 20.0;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_CACHE_DIR: &str = "subtitles_cache";

/// Headless browser settings for rendered page fetches.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub settle_delay: Duration,
    pub window_size: (u32, u32),
    pub user_agent: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(45),
            selector_timeout: Duration::from_secs(15),
            settle_delay: Duration::from_millis(800),
            window_size: (1920, 1080),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Bounded retry loop for raw episode page fetches. Backoffs are fixed, not
/// exponential.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub retries: u32,
    pub server_error_backoff: Duration,
    pub error_backoff: Duration,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            server_error_backoff: Duration::from_millis(600),
            error_backoff: Duration::from_millis(400),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Ordered, non-empty candidate base URLs.
    pub hosts: Vec<String>,
    pub http_timeout: Duration,
    pub probe_timeout: Duration,
    pub subtitle_timeout: Duration,
    pub retry: RetryPolicy,
    pub render: RenderConfig,
    pub cache_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_DOMAIN_POOL.iter().map(|h| h.to_string()).collect(),
            http_timeout: Duration::from_secs_f64(DEFAULT_HTTP_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(10),
            subtitle_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
            render: RenderConfig::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl Config {
    /// Read `HTTP_TIMEOUT`, `HTTP_RETRIES` and `SUBTITLE_CACHE_DIR` from the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup("HTTP_TIMEOUT") {
            let secs: f64 = raw.trim().parse().map_err(|_| config_error("HTTP_TIMEOUT", &raw, "expected a number of seconds"))?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(config_error("HTTP_TIMEOUT", &raw, "must be greater than zero"));
            }
            config.http_timeout = Duration::from_secs_f64(secs);
        }

        if let Some(raw) = lookup("HTTP_RETRIES") {
            config.retry.retries = raw
                .trim()
                .parse()
                .map_err(|_| config_error("HTTP_RETRIES", &raw, "expected a non-negative integer"))?;
        }

        if let Some(raw) = lookup("SUBTITLE_CACHE_DIR") {
            if raw.trim().is_empty() {
                return Err(config_error("SUBTITLE_CACHE_DIR", &raw, "must not be empty"));
            }
            config.cache_dir = PathBuf::from(raw);
        }

        Ok(config)
    }

    /// Replace the candidate host pool. The pool must not be empty.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hosts: Vec<String> = hosts
            .into_iter()
            .map(|h| Into::<String>::into(h).trim_end_matches('/').to_string())
            .collect();
        if hosts.is_empty() {
            return Err(config_error("hosts", "", "the candidate host pool must not be empty"));
        }
        self.hosts = hosts;
        Ok(self)
    }
}

fn config_error(var: &str, value: &str, reason: &str) -> ScrapeError {
    ScrapeError::Config {
        var: var.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
