use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One anime matched by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub page_url: String,
}

/// Episode number as read from the page. `Unknown` sorts after every
/// numbered episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeNumber {
    Numbered(u64),
    Unknown,
}

impl EpisodeNumber {
    /// Parse a run of digits; anything else is `Unknown`.
    pub fn from_digits(digits: &str) -> Self {
        digits
            .parse::<u64>()
            .map(EpisodeNumber::Numbered)
            .unwrap_or(EpisodeNumber::Unknown)
    }

    /// Name fragment safe to use in a filename.
    pub fn file_stem(&self) -> String {
        match self {
            EpisodeNumber::Numbered(n) => n.to_string(),
            EpisodeNumber::Unknown => "unknown".to_string(),
        }
    }
}

impl Ord for EpisodeNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (EpisodeNumber::Numbered(a), EpisodeNumber::Numbered(b)) => a.cmp(b),
            (EpisodeNumber::Numbered(_), EpisodeNumber::Unknown) => Ordering::Less,
            (EpisodeNumber::Unknown, EpisodeNumber::Numbered(_)) => Ordering::Greater,
            (EpisodeNumber::Unknown, EpisodeNumber::Unknown) => Ordering::Equal,
        }
    }
}

impl PartialOrd for EpisodeNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeNumber::Numbered(n) => write!(f, "{}", n),
            EpisodeNumber::Unknown => f.write_str("?"),
        }
    }
}

/// Link to one episode page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub number: EpisodeNumber,
    pub page_url: String,
}

impl Ord for EpisodeRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.page_url.cmp(&other.page_url))
    }
}

impl PartialOrd for EpisodeRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What the extractor found on an episode page. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLinks {
    /// HLS playlist for the target stream label.
    pub stream_url: Option<String>,
    /// English `.vtt`/`.srt` track.
    pub subtitle_url: Option<String>,
}

impl StreamLinks {
    pub fn is_empty(&self) -> bool {
        self.stream_url.is_none() && self.subtitle_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sorts_last() {
        let mut numbers = vec![
            EpisodeNumber::Unknown,
            EpisodeNumber::Numbered(12),
            EpisodeNumber::Numbered(2),
        ];
        numbers.sort();
        assert_eq!(
            numbers,
            vec![
                EpisodeNumber::Numbered(2),
                EpisodeNumber::Numbered(12),
                EpisodeNumber::Unknown,
            ]
        );
    }

    #[test]
    fn test_unknown_sorts_after_huge_numbers() {
        assert!(EpisodeNumber::Numbered(u64::MAX) < EpisodeNumber::Unknown);
    }

    #[test]
    fn test_from_digits() {
        assert_eq!(EpisodeNumber::from_digits("007"), EpisodeNumber::Numbered(7));
        assert_eq!(EpisodeNumber::from_digits("x1"), EpisodeNumber::Unknown);
        assert_eq!(EpisodeNumber::from_digits("99999999999999999999999"), EpisodeNumber::Unknown);
    }

    #[test]
    fn test_display_and_file_stem() {
        assert_eq!(EpisodeNumber::Numbered(4).to_string(), "4");
        assert_eq!(EpisodeNumber::Unknown.to_string(), "?");
        assert_eq!(EpisodeNumber::Unknown.file_stem(), "unknown");
    }

    #[test]
    fn test_episode_ref_ties_break_on_url() {
        let a = EpisodeRef { number: EpisodeNumber::Numbered(1), page_url: "https://h/a".into() };
        let b = EpisodeRef { number: EpisodeNumber::Numbered(1), page_url: "https://h/b".into() };
        assert!(a < b);
    }
}
