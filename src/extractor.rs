// src/extractor.rs

use std::sync::LazyLock;

use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

use crate::config::{self, Config, RetryPolicy};
use crate::error::{Result, ScrapeError};
use crate::models::StreamLinks;
use crate::utils::unescape_json_slashes;

/// The one stream label we pull out of the player config.
pub const TARGET_STREAM_LABEL: &str = "HD-2";

// {"label":"HD-2","file":"...m3u8"}
static STREAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)"label"\s*:\s*"{}"\s*,\s*"(?:file|url)"\s*:\s*"([^"]+\.m3u8)""#,
        regex::escape(TARGET_STREAM_LABEL)
    ))
    .unwrap()
});

// {"srclang":"en","file":"...vtt"}
static SUBTITLE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"srclang"\s*:\s*"en"\s*,\s*"(?:file|url|src)"\s*:\s*"([^"]+\.(?:vtt|srt))""#).unwrap()
});

// {"lang":"English","url":"...srt"}
static SUBTITLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"lang"\s*:\s*"English[^"]*"\s*,\s*"(?:file|url|src)"\s*:\s*"([^"]+\.(?:vtt|srt))""#).unwrap()
});

/// Status and body of a raw page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can GET a page. Lets the retry loop run against a real
/// client or a scripted one.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

/// reqwest client dressed up as a desktop Chrome: browser headers, cookie
/// jar and compressed transfer, so basic bot checks let it through.
#[derive(Debug, Clone)]
pub struct BrowserLikeClient {
    client: Client,
}

impl BrowserLikeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(config::ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(config::ACCEPT_LANGUAGE));
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));

        let client = Client::builder()
            .user_agent(config::USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(config.http_timeout)
            .build()
            .map_err(|source| ScrapeError::Request {
                url: String::new(),
                source,
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageTransport for BrowserLikeClient {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let request_error = |source| ScrapeError::Request {
            url: url.to_string(),
            source,
        };
        let resp = self.client.get(url).send().await.map_err(request_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(request_error)?;
        Ok(RawResponse { status, body })
    }
}

/// GET `url` up to `policy.attempts()` times. A 5xx waits the server-error
/// backoff, any other failure (4xx included) the shorter one. After the last
/// attempt the last error is returned inside `FetchExhausted`.
pub async fn fetch_with_retries<T>(transport: &T, url: &str, policy: &RetryPolicy) -> Result<String>
where
    T: PageTransport + ?Sized,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        let (error, backoff) = match transport.get(url).await {
            Ok(resp) if resp.status < 400 => return Ok(resp.body),
            Ok(resp) => {
                let backoff = if resp.status >= 500 {
                    policy.server_error_backoff
                } else {
                    policy.error_backoff
                };
                let error = ScrapeError::HttpStatus {
                    url: url.to_string(),
                    status: resp.status,
                };
                (error, backoff)
            }
            Err(e) => (e, policy.error_backoff),
        };

        warn!("Fetching {} failed, attempt {}/{}: {}", url, attempt, attempts, error);
        if attempt >= attempts {
            return Err(ScrapeError::FetchExhausted {
                url: url.to_string(),
                attempts,
                last: Box::new(error),
            });
        }

        tokio::time::sleep(backoff).await;
        attempt += 1;
    }
}

/// HLS playlist URL for the target stream label, if the page has one.
pub fn extract_stream_url(html: &str) -> Option<String> {
    STREAM_RE
        .captures(html)
        .map(|caps| unescape_json_slashes(&caps[1]))
}

/// English subtitle URL: a language-code entry first, then a language-name one.
pub fn extract_subtitle_url(html: &str) -> Option<String> {
    [&*SUBTITLE_CODE_RE, &*SUBTITLE_NAME_RE]
        .into_iter()
        .find_map(|re| re.captures(html))
        .map(|caps| unescape_json_slashes(&caps[1]))
}

/// Both links from one raw page body.
pub fn extract_links(html: &str) -> StreamLinks {
    StreamLinks {
        stream_url: extract_stream_url(html),
        subtitle_url: extract_subtitle_url(html),
    }
}

/// Fetches raw episode pages and pulls the stream and subtitle out of them.
pub struct EpisodeExtractor<T = BrowserLikeClient> {
    transport: T,
    policy: RetryPolicy,
}

impl EpisodeExtractor<BrowserLikeClient> {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_transport(BrowserLikeClient::new(config)?, config.retry.clone()))
    }
}

impl<T: PageTransport> EpisodeExtractor<T> {
    pub fn with_transport(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch errors propagate; a page without either link is not an error.
    pub async fn extract(&self, episode_page_url: &str) -> Result<StreamLinks> {
        let html = fetch_with_retries(&self.transport, episode_page_url, &self.policy).await?;
        let links = extract_links(&html);

        match &links.stream_url {
            Some(url) => info!("Found {} stream: {}", TARGET_STREAM_LABEL, url),
            None => debug!("No {} stream on {}", TARGET_STREAM_LABEL, episode_page_url),
        }
        match &links.subtitle_url {
            Some(url) => info!("Found English subtitle: {}", url),
            None => debug!("No English subtitle on {}", episode_page_url),
        }

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned responses in order; fails once the script runs out.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawResponse>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl PageTransport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<RawResponse> {
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(ScrapeError::HttpStatus { url: url.to_string(), status: 599 }))
        }
    }

    fn ok(status: u16, body: &str) -> Result<RawResponse> {
        Ok(RawResponse { status, body: body.to_string() })
    }

    fn fast_policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            server_error_backoff: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn test_stream_picks_target_label_only() {
        let html = r#"sources: [{"label":"HD-1","file":"https://cdn/other.m3u8"},
                                {"label":"HD-2","file":"https://cdn/x.m3u8","type":"hls"}]"#;
        assert_eq!(extract_stream_url(html).as_deref(), Some("https://cdn/x.m3u8"));
    }

    #[test]
    fn test_stream_accepts_url_field_and_escaped_slashes() {
        let html = r#"{"label" : "hd-2", "url" : "https:\/\/cdn\/y.m3u8"}"#;
        assert_eq!(extract_stream_url(html).as_deref(), Some("https://cdn/y.m3u8"));
    }

    #[test]
    fn test_stream_requires_hls_playlist() {
        let html = r#"{"label":"HD-2","file":"https://cdn/x.mp4"}"#;
        assert_eq!(extract_stream_url(html), None);
    }

    #[test]
    fn test_subtitle_by_language_code() {
        let html = r#"tracks: [{"srclang":"en","file":"https://cdn/en.vtt"}]"#;
        assert_eq!(extract_subtitle_url(html).as_deref(), Some("https://cdn/en.vtt"));
    }

    #[test]
    fn test_subtitle_by_language_name() {
        let html = r#"[{"lang":"Spanish","url":"https://cdn/es.srt"},{"lang":"English (US)","src":"https://cdn/en.srt"}]"#;
        assert_eq!(extract_subtitle_url(html).as_deref(), Some("https://cdn/en.srt"));
    }

    #[test]
    fn test_subtitle_code_pattern_wins_over_name_pattern() {
        let html = r#"{"lang":"English","file":"https://cdn/by-name.vtt"} {"srclang":"en","file":"https://cdn/by-code.vtt"}"#;
        assert_eq!(extract_subtitle_url(html).as_deref(), Some("https://cdn/by-code.vtt"));
    }

    #[test]
    fn test_subtitle_ignores_other_languages() {
        let html = r#"{"srclang":"pt","file":"https://cdn/pt.vtt"}"#;
        assert_eq!(extract_subtitle_url(html), None);
    }

    #[test]
    fn test_extract_links_on_plain_page() {
        assert!(extract_links("<html><body>nothing here</body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_retry_recovers_after_server_error() {
        let transport = ScriptedTransport::new(vec![ok(503, "busy"), ok(200, "page body")]);
        let body = fetch_with_retries(&transport, "https://h/ep", &fast_policy(2))
            .await
            .unwrap();

        assert_eq!(body, "page body");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_with_last_error() {
        let transport = ScriptedTransport::new(vec![
            ok(502, ""),
            ok(503, ""),
            Err(ScrapeError::HttpStatus { url: "https://h/ep".into(), status: 404 }),
        ]);
        let err = fetch_with_retries(&transport, "https://h/ep", &fast_policy(2))
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 3);
        match err {
            ScrapeError::FetchExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ScrapeError::HttpStatus { status: 404, .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_client_errors_are_retried() {
        let transport = ScriptedTransport::new(vec![ok(403, "challenge"), ok(200, "ok")]);
        let body = fetch_with_retries(&transport, "https://h/ep", &fast_policy(1))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_zero_retries_means_one_attempt() {
        let transport = ScriptedTransport::new(vec![ok(500, "")]);
        let err = fetch_with_retries(&transport, "https://h/ep", &fast_policy(0))
            .await
            .unwrap_err();
        assert_eq!(transport.calls(), 1);
        assert!(matches!(err, ScrapeError::FetchExhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_extractor_returns_absent_links_without_error() {
        let transport = ScriptedTransport::new(vec![ok(200, r#"{"label":"HD-1","file":"a.m3u8"}"#)]);
        let extractor = EpisodeExtractor::with_transport(transport, fast_policy(0));
        let links = extractor.extract("https://h/ep").await.unwrap();
        assert_eq!(links, StreamLinks::default());
    }
}
