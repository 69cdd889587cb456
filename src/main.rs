//! # docqa CLI
//!
//! The `docqa` binary ingests PDF documents into a SQLite-backed vector
//! index and answers questions over them, either from the command line
//! or through an HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa serve` | Start the HTTP API server |
//! | `docqa ingest <file>` | Ingest a single PDF and wait for the result |
//! | `docqa ask "<question>"` | Answer a question from indexed documents |
//! | `docqa list` | List documents and their processing status |
//! | `docqa delete <filename>` | Remove a document's passages and records |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! docqa init --config ./config/docqa.toml
//!
//! # Ingest a document
//! docqa ingest ./handbook.pdf --config ./config/docqa.toml
//!
//! # Ask a question
//! docqa ask "What is the vacation policy?" --config ./config/docqa.toml
//!
//! # Start the HTTP server
//! docqa serve --config ./config/docqa.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use docqa::chunk::ChunkSplitter;
use docqa::config::{self, Config};
use docqa::db;
use docqa::embedding::OpenAiEmbedder;
use docqa::extract::PdfExtractor;
use docqa::index::SqliteIndex;
use docqa::ingest::IngestionPipeline;
use docqa::ledger::DocumentLedger;
use docqa::logging;
use docqa::migrate;
use docqa::models::format_ts_iso;
use docqa::query::{OpenAiCompletion, QueryEngine};
use docqa::server::{self, AppState};

/// docqa — PDF ingestion and question answering over a local vector index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Ingest PDF documents and answer questions over them",
    version,
    long_about = "docqa extracts text from PDF files, splits it into overlapping chunks, \
    embeds the chunks via the configured provider, and stores them in a SQLite-backed \
    vector index. Questions are answered by retrieving the closest chunks and prompting \
    a chat completion model with them."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and passages
    /// tables. This command is idempotent — running it multiple times
    /// is safe.
    Init,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload, query, metadata, and delete endpoints.
    Serve,

    /// Ingest a single PDF file and wait for a terminal status.
    ///
    /// Unlike the HTTP upload endpoint, this command processes the
    /// document in the foreground and reports the outcome directly.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,

        /// Document name recorded in the ledger. Defaults to the file's
        /// base name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Answer a question from indexed documents.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// List documents and their processing status.
    List,

    /// Remove a document by filename.
    ///
    /// Deletes the document's passages from the index and its rows from
    /// the ledger. A filename with no records is a no-op.
    Delete {
        /// Document filename as recorded at upload time.
        filename: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let components = Components::build(&cfg).await?;
            let state = AppState {
                config: Arc::new(cfg),
                ledger: components.ledger,
                index: components.index,
                pipeline: components.pipeline,
                engine: components.engine,
            };
            server::run_server(state).await?;
        }
        Commands::Ingest { file, name } => {
            run_ingest(&cfg, &file, name).await?;
        }
        Commands::Ask { question } => {
            let components = Components::build(&cfg).await?;
            let answer = components.engine.answer(&question).await?;
            println!("{}", answer);
        }
        Commands::List => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            let ledger = DocumentLedger::new(pool);
            let docs = ledger.list().await?;
            if docs.is_empty() {
                println!("No documents.");
            } else {
                for doc in docs {
                    println!(
                        "{:<6} {:<12} {:<24} {}",
                        doc.id,
                        doc.status,
                        format_ts_iso(doc.upload_date),
                        doc.filename
                    );
                }
            }
        }
        Commands::Delete { filename } => {
            let components = Components::build(&cfg).await?;
            let passages = components.index.delete_by_source(&filename).await?;
            let records = components.ledger.delete_by_filename(&filename).await?;
            println!(
                "Deleted {} passages and {} records for '{}'.",
                passages, records, filename
            );
        }
    }

    Ok(())
}

/// Wired application components shared by the server and CLI commands.
struct Components {
    ledger: DocumentLedger,
    index: Arc<dyn docqa::index::VectorIndex>,
    pipeline: Arc<IngestionPipeline>,
    engine: Arc<QueryEngine>,
}

impl Components {
    async fn build(cfg: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(&cfg.db.path).await?;
        migrate::run_migrations(&pool).await?;

        let ledger = DocumentLedger::new(pool.clone());
        let index: Arc<dyn docqa::index::VectorIndex> = Arc::new(SqliteIndex::new(pool));
        let embedder = Arc::new(OpenAiEmbedder::new(&cfg.embedding)?);
        let completion = Arc::new(OpenAiCompletion::new(&cfg.completion)?);
        let splitter = ChunkSplitter::new(cfg.chunking.chunk_size, cfg.chunking.overlap);

        let pipeline = Arc::new(IngestionPipeline::new(
            ledger.clone(),
            Arc::clone(&index),
            embedder.clone(),
            Arc::new(PdfExtractor),
            splitter,
        ));

        let engine = Arc::new(QueryEngine::new(
            embedder,
            Arc::clone(&index),
            completion,
            cfg.retrieval.top_k,
        ));

        Ok(Self {
            ledger,
            index,
            pipeline,
            engine,
        })
    }
}

/// Foreground ingestion for the `ingest` command. Copies the source file
/// into the upload directory so the pipeline's cleanup never touches the
/// caller's original, then processes it and reports the ledger outcome.
async fn run_ingest(cfg: &Config, file: &Path, name: Option<String>) -> anyhow::Result<()> {
    if !file.is_file() {
        bail!("not a file: {}", file.display());
    }

    let filename = match name {
        Some(name) => name,
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .context("file has no usable name; pass --name")?,
    };

    let components = Components::build(cfg).await?;

    std::fs::create_dir_all(&cfg.upload.dir)?;
    let staged = cfg.upload.dir.join(&filename);
    std::fs::copy(file, &staged)
        .with_context(|| format!("failed to stage {}", file.display()))?;

    components.pipeline.process(&staged, &filename).await;

    // The pipeline reports through the ledger; surface the newest record
    // for this filename as the command's outcome.
    let docs = components.ledger.find_by_filename(&filename).await?;
    match docs.last() {
        Some(doc) => println!("{}: {}", doc.filename, doc.status),
        None => bail!("no ledger record was created for '{}'", filename),
    }

    Ok(())
}
