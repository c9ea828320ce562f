use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use clap::{Parser, Subcommand};
use newsdeck::config::Config;
use newsdeck::feed::{build_query, build_search_url, Pipeline};
use newsdeck::paste;
use newsdeck::storage::Category;
use newsdeck::util::validate_url_for_open;
use newsdeck::view::{render_cards, render_detail, Snapshot, DEFAULT_WIDTH};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "newsdeck",
    version,
    about = "Collects education and AI news into a card feed data file"
)]
struct Args {
    /// Config file (default: ~/.config/newsdeck/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all feeds and rewrite the data file
    Update {
        /// Overrides the configured output path
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print the card list or one article from the data file
    Show {
        /// Data file to read (default: configured output)
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Only cards of this category
        #[arg(long, value_name = "CATEGORY")]
        category: Option<Category>,

        /// Show the detail view of one article
        #[arg(long, value_name = "N")]
        id: Option<usize>,

        /// Open the article link in the browser (requires --id)
        #[arg(long, requires = "id")]
        open: bool,
    },
    /// Parse newsletter text into articles and print them as JSON
    Paste {
        /// Text file to read (default: stdin)
        file: Option<PathBuf>,
    },
    /// List configured feeds and their search queries
    Feeds,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config '{}'", path.display())),
        None => match Config::default_path() {
            Some(path) => Config::load(&path)
                .with_context(|| format!("Failed to load config '{}'", path.display())),
            None => {
                tracing::debug!("HOME not set, using default configuration");
                Ok(Config::default())
            }
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("newsdeck=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Update { output: None }) {
        Command::Update { output } => update(&config, output).await,
        Command::Show {
            input,
            category,
            id,
            open,
        } => show(&config, input, category, id, open),
        Command::Paste { file } => paste_newsletter(&config, file.as_deref()),
        Command::Feeds => list_feeds(&config),
    }
}

async fn update(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| config.output.clone());
    let pipeline = Pipeline::from_config(config).context("Failed to build HTTP client")?;

    let articles = pipeline
        .run_and_persist(&config.feeds, &output)
        .await
        .with_context(|| format!("Failed to save articles to '{}'", output.display()))?;

    println!("Saved {} articles to {}", articles.len(), output.display());
    Ok(())
}

fn show(
    config: &Config,
    input: Option<PathBuf>,
    category: Option<Category>,
    id: Option<usize>,
    open: bool,
) -> Result<()> {
    let input = input.unwrap_or_else(|| config.output.clone());
    let snapshot = Snapshot::load(&input)
        .with_context(|| format!("Failed to read articles from '{}'", input.display()))?;

    let Some(id) = id else {
        print!("{}", render_cards(&snapshot.filter(category), DEFAULT_WIDTH));
        return Ok(());
    };

    let article = snapshot
        .get(id)
        .with_context(|| format!("No article with id {id} ({} articles)", snapshot.len()))?;

    if open {
        let url = validate_url_for_open(&article.url)
            .with_context(|| format!("Refusing to open article {id} link"))?;
        open::that(url.as_str()).context("Failed to open browser")?;
        tracing::info!(id, url = %url, "Opened article in browser");
    } else {
        print!("{}", render_detail(article, DEFAULT_WIDTH));
    }
    Ok(())
}

fn paste_newsletter(config: &Config, file: Option<&Path>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let offset = FixedOffset::east_opt(config.pipeline.utc_offset_hours.saturating_mul(3600))
        .context("utc_offset_hours out of range")?;
    let today = Utc::now().with_timezone(&offset).date_naive();

    let articles = paste::parse_newsletter(&text, &config.paste, today);
    if articles.is_empty() {
        eprintln!("No links found. Put each article title on the line above its URL.");
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&articles).context("Failed to encode articles")?;
    println!("{json}");
    Ok(())
}

fn list_feeds(config: &Config) -> Result<()> {
    for feed in &config.feeds {
        let query = build_query(feed, &config.source.recency);
        let url = build_search_url(&config.source, &query)
            .with_context(|| format!("Invalid endpoint '{}'", config.source.endpoint))?;
        println!("[{}] {}", feed.category, feed.label);
        println!("  query: {query}");
        println!("  url:   {url}");
    }
    Ok(())
}
