use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;

use crate::config::{self, Config};
use crate::error::{Result, ScrapeError};

/// Picks a reachable mirror out of the candidate pool and turns relative
/// links into absolute ones.
#[derive(Debug, Clone)]
pub struct HostResolver {
    pool: Vec<String>,
    client: Client,
}

impl HostResolver {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(config::ACCEPT));

        let client = Client::builder()
            .user_agent(config::USER_AGENT)
            .default_headers(headers)
            .timeout(config.probe_timeout)
            .build()
            .map_err(|source| ScrapeError::Request {
                url: String::new(),
                source,
            })?;

        let pool = config
            .hosts
            .iter()
            .map(|h| h.trim_end_matches('/').to_string())
            .collect::<Vec<_>>();
        if pool.is_empty() {
            return Err(ScrapeError::Config {
                var: "hosts".to_string(),
                value: String::new(),
                reason: "the candidate host pool must not be empty".to_string(),
            });
        }

        Ok(Self { pool, client })
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// First pool entry answering with a status below 500. Falls back to the
    /// first entry when none does; this never fails.
    pub async fn pick_live_base(&self) -> String {
        for base in &self.pool {
            match self.client.get(base.as_str()).send().await {
                Ok(resp) if resp.status().as_u16() < 500 => {
                    info!("Using live host {} (HTTP {})", base, resp.status());
                    return base.clone();
                }
                Ok(resp) => debug!("Host {} answered HTTP {}", base, resp.status()),
                Err(e) => debug!("Host {} unreachable: {}", base, e),
            }
        }

        let fallback = self.pool[0].clone();
        warn!("No candidate host responded, defaulting to {}", fallback);
        fallback
    }

    /// Scheme and host (with port, if any) of an absolute URL. Relative
    /// input is answered by probing for a live base instead.
    pub async fn resolve_authority(&self, url: &str) -> String {
        match authority_of(url) {
            Some(authority) => authority,
            None => self.pick_live_base().await,
        }
    }
}

/// `scheme://host[:port]` of `url`, or `None` if it is not absolute.
pub fn authority_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{}://{}:{}", parsed.scheme(), host, port)),
        None => Some(format!("{}://{}", parsed.scheme(), host)),
    }
}

/// Join a possibly relative path onto `base` with standard URL-join rules.
/// `base` is treated as a directory.
pub fn to_absolute(base: &str, maybe_relative: &str) -> Result<String> {
    let base_dir = format!("{}/", base.trim_end_matches('/'));
    let base_url = Url::parse(&base_dir).map_err(|source| ScrapeError::InvalidUrl {
        url: base.to_string(),
        source,
    })?;
    let joined = base_url
        .join(maybe_relative.trim())
        .map_err(|source| ScrapeError::InvalidUrl {
            url: maybe_relative.to_string(),
            source,
        })?;
    Ok(joined.to_string())
}
