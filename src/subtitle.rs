use std::path::{Path, PathBuf};

use log::info;
use reqwest::Client;

use crate::config::{self, Config};
use crate::error::{Result, ScrapeError};
use crate::models::EpisodeNumber;
use crate::utils::subtitle_extension;

/// Downloads subtitle tracks into a cache directory.
#[derive(Debug, Clone)]
pub struct SubtitleSaver {
    client: Client,
}

impl SubtitleSaver {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config::USER_AGENT)
            .timeout(config.subtitle_timeout)
            .build()
            .map_err(|source| ScrapeError::SubtitleDownload {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }

    /// Save the track at `url` as `Episode <n>.<ext>` inside `cache_dir`,
    /// creating the directory if needed. The caller owns the file afterwards.
    pub async fn save_subtitle(&self, url: &str, episode: &EpisodeNumber, cache_dir: &Path) -> Result<PathBuf> {
        let download_error = |source| ScrapeError::SubtitleDownload {
            url: url.to_string(),
            source,
        };
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(download_error)?
            .bytes()
            .await
            .map_err(download_error)?;

        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|source| ScrapeError::SubtitleWrite {
                path: cache_dir.to_path_buf(),
                source,
            })?;

        let path = cache_dir.join(subtitle_file_name(url, episode));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ScrapeError::SubtitleWrite {
                path: path.clone(),
                source,
            })?;

        info!("Saved subtitle to {}", path.display());
        Ok(path)
    }
}

pub fn subtitle_file_name(url: &str, episode: &EpisodeNumber) -> String {
    format!("Episode {}.{}", episode.file_stem(), subtitle_extension(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_subtitle_file_name() {
        assert_eq!(
            subtitle_file_name("https://cdn/x/eng-2.vtt", &EpisodeNumber::Numbered(3)),
            "Episode 3.vtt"
        );
        assert_eq!(
            subtitle_file_name("https://cdn/x/eng.SRT?sig=1", &EpisodeNumber::Unknown),
            "Episode unknown.srt"
        );
    }

    #[tokio::test]
    async fn test_save_subtitle_creates_cache_dir() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/subs/en.vtt");
                then.status(200).body("WEBVTT\n\n00:00.000 --> 00:01.000\nHello\n");
            })
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let cache_dir = tmp.path().join("nested").join("cache");
        let saver = SubtitleSaver::new(&Config::default()).unwrap();

        let path = saver
            .save_subtitle(&server.url("/subs/en.vtt"), &EpisodeNumber::Numbered(7), &cache_dir)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(path, cache_dir.join("Episode 7.vtt"));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn test_save_subtitle_reports_http_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.vtt");
                then.status(404);
            })
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let saver = SubtitleSaver::new(&Config::default()).unwrap();
        let err = saver
            .save_subtitle(&server.url("/missing.vtt"), &EpisodeNumber::Numbered(1), tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::SubtitleDownload { .. }));
        assert!(!tmp.path().join("Episode 1.vtt").exists());
    }

    #[tokio::test]
    async fn test_save_subtitle_reports_write_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/en.vtt");
                then.status(200).body("WEBVTT");
            })
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let saver = SubtitleSaver::new(&Config::default()).unwrap();
        let err = saver
            .save_subtitle(&server.url("/en.vtt"), &EpisodeNumber::Numbered(1), &blocker)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::SubtitleWrite { .. }));
    }
}
