// Library interface for anisub.
// The binary and the integration tests both go through these modules.

pub mod config;
pub mod error;
pub mod extractor;
pub mod hianime;
pub mod host;
pub mod models;
pub mod parser;
pub mod render;
pub mod subtitle;
pub mod utils;

pub use config::Config;
pub use error::{Result, ScrapeError};
pub use hianime::HiAnime;
pub use models::{EpisodeNumber, EpisodeRef, SearchResult, StreamLinks};
