mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use engram::config::EngramConfig;

#[derive(Parser)]
#[command(name = "engram", version, about = "Capture thought fragments and consolidate them into memories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve,
    /// Segment text into fragments and store them
    Add {
        text: String,
        #[arg(long, default_value = "cli")]
        source: String,
        /// Attach the new fragments to this session
        #[arg(long = "session")]
        session_id: Option<String>,
    },
    /// Segment a UTF-8 text file into fragments
    AddFile {
        path: PathBuf,
        #[arg(long = "session")]
        session_id: Option<String>,
    },
    /// List fragments, newest first
    List {
        /// Only processed fragments (default: only unprocessed)
        #[arg(long)]
        processed: bool,
        /// Fragments in either state
        #[arg(long, conflicts_with = "processed")]
        all: bool,
        #[arg(long = "session")]
        session_id: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Consolidate fragments into a memory
    Process {
        /// Fragment ids to consolidate
        #[arg(long, num_args = 1..)]
        ids: Vec<String>,
        /// Take the newest unprocessed fragments instead of explicit ids
        #[arg(long, conflicts_with = "ids")]
        all: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long = "session")]
        session_id: Option<String>,
    },
    /// Compose a memory directly from fragment strings
    Memory {
        #[arg(required = true)]
        fragments: Vec<String>,
    },
    /// Manage sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// List stored memories
    Memories {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        source: Option<String>,
    },
    /// Search memories
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Answer a question from stored memories
    Ask { question: String },
    /// Show fragment and memory counts
    Stats,
    /// Run database diagnostics
    Doctor,
    /// Send a probe prompt to the completion service
    Test,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Create a new session
    New {
        #[arg(long)]
        name: Option<String>,
    },
    /// List sessions, newest first
    List,
}

/// `--all` lists both states; otherwise `--processed` picks one.
fn processed_filter(processed: bool, all: bool) -> Option<bool> {
    (!all).then_some(processed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = EngramConfig::load()?;

    // stderr keeps stdout clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => engram::server::serve(config).await?,
        Command::Add {
            text,
            source,
            session_id,
        } => cli::fragments::add(&config, &text, &source, session_id.as_deref())?,
        Command::AddFile { path, session_id } => {
            cli::fragments::add_file(&config, &path, session_id.as_deref())?
        }
        Command::List {
            processed,
            all,
            session_id,
            limit,
        } => cli::fragments::list(&config, processed_filter(processed, all), session_id, limit)?,
        Command::Process {
            ids,
            all,
            limit,
            session_id,
        } => cli::fragments::process(config, ids, all, limit, session_id).await?,
        Command::Memory { fragments } => cli::memories::compose(config, fragments).await?,
        Command::Session { action } => match action {
            SessionAction::New { name } => cli::sessions::create(&config, name.as_deref())?,
            SessionAction::List => cli::sessions::list(&config)?,
        },
        Command::Memories { limit, source } => cli::memories::list(&config, limit, source)?,
        Command::Search { query, top_k } => cli::search::search(&config, &query, top_k)?,
        Command::Ask { question } => cli::search::ask(config, &question).await?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Test => cli::probe(&config).await?,
    }

    Ok(())
}
