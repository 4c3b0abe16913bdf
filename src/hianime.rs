use std::path::{Path, PathBuf};

use log::info;

use crate::config::Config;
use crate::error::Result;
use crate::extractor::EpisodeExtractor;
use crate::host::{HostResolver, to_absolute};
use crate::models::{EpisodeNumber, EpisodeRef, SearchResult, StreamLinks};
use crate::parser::{EPISODE_CONTAINERS, parse_episode_list, parse_search_results};
use crate::render::{PageRenderer, WaitFor};
use crate::subtitle::SubtitleSaver;

/// Entry point for the four pipeline operations. Holds no state between
/// calls beyond configuration; each call resolves its own host and, for
/// rendered pages, its own browser.
pub struct HiAnime {
    config: Config,
    resolver: HostResolver,
    renderer: PageRenderer,
    extractor: EpisodeExtractor,
    subtitles: SubtitleSaver,
}

impl HiAnime {
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self {
            resolver: HostResolver::new(&config)?,
            renderer: PageRenderer::new(config.render.clone()),
            extractor: EpisodeExtractor::new(&config)?,
            subtitles: SubtitleSaver::new(&config)?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Search the first live mirror for `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let base = self.resolver.pick_live_base().await;
        let url = search_url(&base, query);
        info!("Searching for {:?} on {}", query, base);

        let html = self.renderer.fetch_rendered(&url, WaitFor::Settle).await?;
        let results = parse_search_results(&html, &base);
        info!("Found {} results", results.len());
        Ok(results)
    }

    /// Episodes listed on an anime page. A relative `anime_url` is taken
    /// against a live mirror.
    pub async fn episodes(&self, anime_url: &str) -> Result<Vec<EpisodeRef>> {
        let base = self.resolver.resolve_authority(anime_url).await;
        let page_url = to_absolute(&base, anime_url)?;

        let html = self
            .renderer
            .fetch_rendered(&page_url, WaitFor::any_of(EPISODE_CONTAINERS.iter().copied()))
            .await?;
        let episodes = parse_episode_list(&html, &base);
        info!("Found {} episodes on {}", episodes.len(), page_url);
        Ok(episodes)
    }

    /// Stream and English subtitle for one episode page.
    pub async fn stream_and_subtitle(&self, episode_url: &str) -> Result<StreamLinks> {
        let base = self.resolver.resolve_authority(episode_url).await;
        let page_url = to_absolute(&base, episode_url)?;
        self.extractor.extract(&page_url).await
    }

    /// Download a subtitle into `cache_dir`, or the configured cache
    /// directory when `None`.
    pub async fn save_subtitle(&self, url: &str, episode: &EpisodeNumber, cache_dir: Option<&Path>) -> Result<PathBuf> {
        let dir = cache_dir.unwrap_or(self.config.cache_dir.as_path());
        self.subtitles.save_subtitle(url, episode, dir).await
    }
}

pub fn search_url(base: &str, query: &str) -> String {
    format!(
        "{}/search?keyword={}",
        base.trim_end_matches('/'),
        urlencoding::encode(query.trim())
    )
}
