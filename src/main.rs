use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Serialize;

use anisub::{Config, EpisodeNumber, EpisodeRef, HiAnime, SearchResult, StreamLinks};

mod ui;

use ui::{confirm, prompt_input, select_from_list, spinner};

#[derive(Parser)]
#[command(name = "anisub", version, about = "Find an anime episode's HD-2 stream and English subtitle")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Anime search query (interactive mode)
    query: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Where downloaded subtitles go (overrides SUBTITLE_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for an anime
    Search { query: String },

    /// List the episodes on an anime page
    Episodes { url: String },

    /// Find the stream and English subtitle on an episode page
    Extract {
        url: String,

        /// Also download the subtitle
        #[arg(short, long)]
        save: bool,

        /// Episode number used to name the saved subtitle
        #[arg(short, long)]
        episode: Option<u64>,
    },

    /// Download a subtitle file
    Subtitle {
        url: String,

        /// Episode number used to name the file
        #[arg(short, long)]
        episode: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.cache_dir.clone() {
        config.cache_dir = dir;
    }
    let site = HiAnime::new(config).context("Failed to set up the scraper")?;

    let outcome = match cli.command {
        Some(Commands::Search { query }) => run_search(&site, &query, cli.json).await,
        Some(Commands::Episodes { url }) => run_episodes(&site, &url, cli.json).await,
        Some(Commands::Extract { url, save, episode }) => {
            run_extract(&site, &url, save, episode_number(episode), cli.json).await
        }
        Some(Commands::Subtitle { url, episode }) => run_subtitle(&site, &url, episode_number(episode)).await,
        None => run_interactive(&site, cli.query).await,
    };

    outcome.map_err(explain)
}

fn episode_number(episode: Option<u64>) -> EpisodeNumber {
    episode.map(EpisodeNumber::Numbered).unwrap_or(EpisodeNumber::Unknown)
}

fn explain(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<anisub::ScrapeError>() {
        Some(e) if e.is_transport() => err.context("The site could not be reached, try again in a moment"),
        _ => err,
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_search(site: &HiAnime, query: &str, json: bool) -> Result<()> {
    let bar = spinner(&format!("Searching for {}...", query));
    let results = site.search(query).await;
    bar.finish_and_clear();
    let results = results?;

    if json {
        return print_json(&results);
    }
    if results.is_empty() {
        println!("No anime found for: {}", query);
    }
    for SearchResult { title, page_url } in &results {
        println!("{}\t{}", title, page_url);
    }
    Ok(())
}

async fn run_episodes(site: &HiAnime, url: &str, json: bool) -> Result<()> {
    let bar = spinner("Loading episodes...");
    let episodes = site.episodes(url).await;
    bar.finish_and_clear();
    let episodes = episodes?;

    if json {
        return print_json(&episodes);
    }
    if episodes.is_empty() {
        println!("No episodes found on: {}", url);
    }
    for EpisodeRef { number, page_url } in &episodes {
        println!("Episode {}\t{}", number, page_url);
    }
    Ok(())
}

async fn run_extract(site: &HiAnime, url: &str, save: bool, episode: EpisodeNumber, json: bool) -> Result<()> {
    let links = site.stream_and_subtitle(url).await?;

    if json {
        print_json(&links)?;
    } else {
        print_links(&links);
    }

    if save {
        match &links.subtitle_url {
            Some(sub) => {
                let path = site.save_subtitle(sub, &episode, None).await?;
                println!("Subtitle saved to {}", path.display());
            }
            None => println!("No English subtitle to save"),
        }
    }
    Ok(())
}

async fn run_subtitle(site: &HiAnime, url: &str, episode: EpisodeNumber) -> Result<()> {
    let bar = spinner("Downloading subtitle...");
    let path = site.save_subtitle(url, &episode, None).await;
    bar.finish_and_clear();
    println!("{}", path?.display());
    Ok(())
}

fn print_links(links: &StreamLinks) {
    match &links.stream_url {
        Some(url) => println!("Stream (HD-2): {}", url),
        None => println!("Stream (HD-2): not found"),
    }
    match &links.subtitle_url {
        Some(url) => println!("English subtitle: {}", url),
        None => println!("English subtitle: not found"),
    }
}

async fn run_interactive(site: &HiAnime, query: Option<String>) -> Result<()> {
    let query = match query {
        Some(q) => q,
        None => prompt_input("Enter anime search query")?,
    };

    let bar = spinner(&format!("Searching for {}...", query));
    let results = site.search(&query).await;
    bar.finish_and_clear();
    let results = results?;

    if results.is_empty() {
        return Err(anyhow!("No anime found for query: {}", query));
    }

    let titles: Vec<String> = results.iter().map(|r| r.title.clone()).collect();
    let selected = &results[select_from_list(&titles, "Select anime")?];
    println!("Selected: {}", selected.title);

    let bar = spinner("Loading episodes...");
    let episodes = site.episodes(&selected.page_url).await;
    bar.finish_and_clear();
    let episodes = episodes?;

    if episodes.is_empty() {
        return Err(anyhow!("No episodes found for: {}", selected.title));
    }

    let labels: Vec<String> = episodes.iter().map(|ep| format!("Episode {}", ep.number)).collect();
    let episode = &episodes[select_from_list(&labels, "Select episode")?];

    let bar = spinner("Looking for the stream...");
    let links = site.stream_and_subtitle(&episode.page_url).await;
    bar.finish_and_clear();
    let links = links?;

    print_links(&links);

    if let Some(sub) = &links.subtitle_url {
        if confirm("Download the subtitle?")? {
            let path = site.save_subtitle(sub, &episode.number, None).await?;
            println!("Subtitle saved to {}", path.display());
        }
    }
    Ok(())
}
