use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::host::to_absolute;
use crate::models::{EpisodeNumber, EpisodeRef, SearchResult};

/// Containers that hold the episode list, in the order they are tried.
/// The renderer waits on the same list.
pub const EPISODE_CONTAINERS: &[&str] = &[
    "ul.episodes",
    "div.episode-list",
    "div#episodes",
    "div#episode_page",
];

const RESULTS_CONTAINER: &str = "div.film-list-wrap";
const RESULT_ANCHORS: &str = "div.film-poster a[href]";
const CONTAINER_ANCHORS: &str = "a[href]";
const EPISODE_HREF_ANCHORS: &str = "a[href*='episode']";
const UNKNOWN_TITLE: &str = "Unknown";

static EPISODE_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Episode\s*([0-9]+)").unwrap());
static EPISODE_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)episode[-_/ ]?(\d+)").unwrap());

/// A way of finding candidate anchors in a document.
type AnchorStrategy = for<'a> fn(&'a Html, &str) -> Vec<ElementRef<'a>>;

/// Anchors inside the first element matching `container`.
fn anchors_in_container<'a>(document: &'a Html, container: &str) -> Vec<ElementRef<'a>> {
    let (Some(container_sel), Some(anchor_sel)) = (selector(container), selector(CONTAINER_ANCHORS)) else {
        return Vec::new();
    };
    document
        .select(&container_sel)
        .next()
        .map(|el| el.select(&anchor_sel).collect())
        .unwrap_or_default()
}

/// Anchors anywhere in the document matching `anchors`.
fn anchors_matching<'a>(document: &'a Html, anchors: &str) -> Vec<ElementRef<'a>> {
    selector(anchors)
        .map(|sel| document.select(&sel).collect())
        .unwrap_or_default()
}

fn episode_strategies() -> Vec<(AnchorStrategy, &'static str)> {
    let mut strategies: Vec<(AnchorStrategy, &'static str)> = EPISODE_CONTAINERS
        .iter()
        .map(|c| (anchors_in_container as AnchorStrategy, *c))
        .collect();
    strategies.push((anchors_matching, EPISODE_HREF_ANCHORS));
    strategies
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            debug!("Skipping invalid selector {:?}: {}", css, e);
            None
        }
    }
}

/// Visible text of an element, whitespace-trimmed pieces joined by spaces.
fn visible_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Search hits from a rendered results page, in document order.
pub fn parse_search_results(html: &str, base: &str) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    let container = selector(RESULTS_CONTAINER)
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    let Some(anchor_sel) = selector(RESULT_ANCHORS) else {
        return Vec::new();
    };

    let mut results = Vec::new();
    for anchor in container.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() {
            continue;
        }
        let page_url = match to_absolute(base, href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping search result with unusable link {:?}: {}", href, e);
                continue;
            }
        };

        let title = anchor
            .value()
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .or_else(|| Some(visible_text(&anchor)).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        results.push(SearchResult { title, page_url });
    }

    debug!("Parsed {} search results", results.len());
    results
}

/// Episode links from a rendered anime page, deduplicated and sorted by
/// number with unknown numbers last and URL as the tie-break.
pub fn parse_episode_list(html: &str, base: &str) -> Vec<EpisodeRef> {
    let document = Html::parse_document(html);

    let anchors = episode_strategies()
        .into_iter()
        .map(|(strategy, css)| (css, strategy(&document, css)))
        .find(|(_, anchors)| !anchors.is_empty())
        .map(|(css, anchors)| {
            debug!("Episode anchors found via {:?}", css);
            anchors
        })
        .unwrap_or_default();

    let mut episodes = Vec::with_capacity(anchors.len());
    for anchor in anchors {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() {
            continue;
        }
        let page_url = match to_absolute(base, href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping episode with unusable link {:?}: {}", href, e);
                continue;
            }
        };
        let number = episode_number(&visible_text(&anchor), href);
        episodes.push(EpisodeRef { number, page_url });
    }

    sort_episodes(episodes)
}

/// "Episode N" in the link text wins; otherwise digits next to "episode"
/// in the href.
pub fn episode_number(text: &str, href: &str) -> EpisodeNumber {
    EPISODE_TEXT_RE
        .captures(text)
        .or_else(|| EPISODE_HREF_RE.captures(href))
        .map(|caps| EpisodeNumber::from_digits(&caps[1]))
        .unwrap_or(EpisodeNumber::Unknown)
}

pub fn sort_episodes(mut episodes: Vec<EpisodeRef>) -> Vec<EpisodeRef> {
    episodes.sort();
    episodes.dedup();
    episodes
}
