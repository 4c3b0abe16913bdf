use std::path::PathBuf;

/// Errors raised by the scraping pipeline.
///
/// Only transport-level failures end up here. An empty search, an empty
/// episode list or a missing stream/subtitle is returned as an empty value.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Timed out rendering {url}: {reason}")]
    RenderTimeout { url: String, reason: String },

    #[error("Rendering {url} failed: {reason}")]
    Render { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<ScrapeError>,
    },

    #[error("Subtitle download from {url} failed: {source}")]
    SubtitleDownload {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Could not write subtitle to {}: {source}", .path.display())]
    SubtitleWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Config {
        var: String,
        value: String,
        reason: String,
    },
}

impl ScrapeError {
    /// True for errors that came from the network or browser layer rather
    /// than from local configuration or disk.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ScrapeError::RenderTimeout { .. }
                | ScrapeError::Render { .. }
                | ScrapeError::HttpStatus { .. }
                | ScrapeError::Request { .. }
                | ScrapeError::FetchExhausted { .. }
                | ScrapeError::SubtitleDownload { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
