use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use veille::article;
use veille::config::Config;
use veille::dedup::{DedupOptions, Deduplicator};
use veille::output::digest::Digest;
use veille::status;
use veille::store::{SeenEntry, TopicEntry, TtlStore};

/// Veille: deduplication engine for RSS tech-watch digests.
///
/// Takes a fetched article batch as JSON and decides which articles are
/// genuinely new: by exact URL, and by story-level similarity across
/// sources covering the same event.
#[derive(Parser)]
#[command(name = "veille", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config and data directories and write a default config
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Filter an article batch (JSON on stdin or --input) and emit a digest
    Dedup {
        /// Read the batch from a file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Drop articles whose URL was already delivered
        #[arg(long)]
        filter_seen: bool,

        /// Collapse articles covering the same story
        #[arg(long)]
        filter_topic: bool,

        /// Lookback window in hours (default: hours_lookback from config)
        #[arg(long)]
        hours: Option<u64>,

        /// Run without persisting any store state
        #[arg(long)]
        dry_run: bool,

        /// Also write a Markdown digest to this path
        #[arg(long)]
        digest: Option<PathBuf>,
    },

    /// Record URLs as seen without running a fetch pipeline
    MarkSeen {
        /// URLs to record (reads stdin lines when empty)
        urls: Vec<String>,
    },

    /// Show entry counts, TTLs and paths for both stores
    Stats,
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr: stdout is reserved for the digest JSON so the
    // command stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("veille=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Init { force } => init(force),
        Commands::Dedup {
            input,
            filter_seen,
            filter_topic,
            hours,
            dry_run,
            digest,
        } => dedup(input, filter_seen, filter_topic, hours, dry_run, digest),
        Commands::MarkSeen { urls } => mark_seen(urls),
        Commands::Stats => stats(),
    }
}

fn init(force: bool) -> Result<()> {
    let config_path = Config::config_path();
    let data_dir = Config::data_dir();

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;

    if config_path.exists() && !force {
        println!("Config already exists at: {}", config_path.display());
        println!("Use --force to overwrite it.");
    } else {
        Config::default_seed().write_to(&config_path)?;
        println!("Config written to: {}", config_path.display());
    }
    println!("Store directory: {}", data_dir.display());
    println!(
        "\nveille is ready. Pipe a fetched batch through `veille dedup --filter-seen --filter-topic`."
    );
    Ok(())
}

fn dedup(
    input: Option<PathBuf>,
    filter_seen: bool,
    filter_topic: bool,
    hours: Option<u64>,
    dry_run: bool,
    digest_path: Option<PathBuf>,
) -> Result<()> {
    let config = Config::load()?;

    let raw = match input {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading batch from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading batch from stdin")?;
            buf
        }
    };

    let (articles, dropped) = article::parse_batch(&raw)?;
    if dropped > 0 {
        info!(dropped, "dropped malformed article records");
    }

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let hours = hours.unwrap_or(config.hours_lookback);
    let before = articles.len();
    let articles = article::filter_lookback(articles, now, hours);
    if before > articles.len() {
        info!(
            outside_window = before - articles.len(),
            hours, "dropped articles outside the lookback window"
        );
    }

    let mut seen: TtlStore<SeenEntry> =
        TtlStore::load(Config::seen_store_path(), config.seen_url_ttl_days);
    let mut topics: TtlStore<TopicEntry> =
        TtlStore::load(Config::topic_store_path(), config.topic_ttl_days);

    let options = DedupOptions {
        filter_seen,
        filter_topic,
        dry_run,
    };
    let outcome = Deduplicator::new(&mut seen, &mut topics, &config).run(articles, &options, now);

    let digest = Digest::new(outcome, hours);
    if let Some(path) = digest_path {
        std::fs::write(&path, digest.to_markdown(now))
            .with_context(|| format!("writing markdown digest to {}", path.display()))?;
        info!(path = %path.display(), "markdown digest written");
    }
    println!("{}", serde_json::to_string_pretty(&digest)?);
    Ok(())
}

fn mark_seen(urls: Vec<String>) -> Result<()> {
    let config = Config::load()?;

    let urls: Vec<String> = if urls.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading urls from stdin")?;
        buf.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    } else {
        urls
    };

    if urls.is_empty() {
        println!("No URLs given. Pass them as arguments or one per line on stdin.");
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let mut seen: TtlStore<SeenEntry> =
        TtlStore::load(Config::seen_store_path(), config.seen_url_ttl_days);
    let added = veille::dedup::mark_seen(&mut seen, &urls, now);
    seen.save()?;

    println!(
        "{} marked as seen, {} already present",
        added.to_string().bold(),
        urls.len() - added
    );
    Ok(())
}

fn stats() -> Result<()> {
    let config = Config::load()?;
    let now = chrono::Utc::now().timestamp().max(0) as u64;

    // Read-only: expired entries are dropped from the counts but the
    // stores are never saved here.
    let mut seen: TtlStore<SeenEntry> =
        TtlStore::load(Config::seen_store_path(), config.seen_url_ttl_days);
    seen.purge(now);
    let mut topics: TtlStore<TopicEntry> =
        TtlStore::load(Config::topic_store_path(), config.topic_ttl_days);
    topics.purge(now);

    status::show("seen-urls", &seen.stats());
    status::show("topics", &topics.stats());
    Ok(())
}
