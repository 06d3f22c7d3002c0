use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notegraph::claim_check::{ClaimCheckStore, SqliteClaimCheck};
use notegraph::chat::AnthropicChat;
use notegraph::config::{load_config, Config};
use notegraph::embedding::create_embedder;
use notegraph::store::NoteStore;
use notegraph::sync::{run_full_sync, ProgressMode};
use notegraph::vision::AnthropicVision;
use notegraph::{db, migrate, rag, stats};

#[derive(Parser)]
#[command(name = "notegraph")]
#[command(about = "Markdown vault sync, wikilink graph, and note Q&A", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./config/notegraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    Init,
    /// Run a full vault synchronization (scan, images, embeddings, links)
    Sync {
        /// Progress output: off, human, or json (defaults by terminal)
        #[arg(long)]
        progress: Option<ProgressMode>,
    },
    /// Ask a question answered from the notes
    Ask {
        /// The question text
        question: String,
    },
    /// Semantic search for note file names
    Find {
        /// The search query
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List notes related to a markdown file's content
    Analyze {
        /// Path to the markdown file
        file: PathBuf,
    },
    /// Print store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notegraph=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => cmd_init(&config).await,
        Commands::Sync { progress } => cmd_sync(&config, progress).await,
        Commands::Ask { question } => cmd_ask(&config, &question).await,
        Commands::Find { query, limit } => cmd_find(&config, &query, limit).await,
        Commands::Analyze { file } => cmd_analyze(&config, &file).await,
        Commands::Stats => cmd_stats(&config).await,
    }
}

async fn open_store(config: &Config) -> Result<NoteStore> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    Ok(NoteStore::new(pool))
}

async fn cmd_init(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    println!("Database initialized successfully.");
    Ok(())
}

async fn cmd_sync(config: &Config, progress: Option<ProgressMode>) -> Result<()> {
    if !config.embedding.is_enabled() {
        anyhow::bail!(
            "Embedding provider is disabled. Set embedding.provider in the config to run sync."
        );
    }

    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding)?;
    let captioner = AnthropicVision::new(&config.chat)?;

    let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
    let reporter = mode.reporter();

    let report = run_full_sync(&store, embedder.as_ref(), &captioner, config, reporter.as_ref()).await?;

    println!("{}", report.summary());

    // Park the full report for later retrieval by key.
    let claim = SqliteClaimCheck::new(store.pool().clone());
    let key = format!("sync:result:{}", uuid::Uuid::new_v4());
    claim
        .put_json(
            &key,
            &serde_json::to_value(&report)?,
            config.claim_check.ttl_secs,
        )
        .await?;
    println!("Result stored under key: {key}");

    Ok(())
}

async fn cmd_ask(config: &Config, question: &str) -> Result<()> {
    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding)?;
    let chat = AnthropicChat::new(&config.chat)?;

    let answer = rag::answer_question(&store, embedder.as_ref(), &chat, config, question).await?;

    println!("{}", answer.answer);

    if !answer.attachment_paths.is_empty() {
        println!("\nAttachments:");
        for path in &answer.attachment_paths {
            println!("- {path}");
        }
    }

    Ok(())
}

async fn cmd_find(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding)?;

    let limit = limit.unwrap_or(config.retrieval.find_limit);
    let names = rag::find_notes(&store, embedder.as_ref(), query, limit).await?;

    if names.is_empty() {
        println!("No matching notes.");
    } else {
        for name in names {
            println!("{name}");
        }
    }

    Ok(())
}

async fn cmd_analyze(config: &Config, file: &std::path::Path) -> Result<()> {
    let store = open_store(config).await?;
    let embedder = create_embedder(&config.embedding)?;

    let content = std::fs::read_to_string(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let related = rag::analyze_note(&store, embedder.as_ref(), config, &file_name, &content).await?;

    if related.is_empty() {
        println!("No related notes found.");
    } else {
        println!("Related notes:");
        for name in related {
            println!("- {name}");
        }
    }

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    stats::run_stats(&store).await
}
