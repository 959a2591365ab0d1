use anyhow::{anyhow, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pdf_index_core::{
    build_index, init_vector_db, inspect_index_dir, read_manifest, ChunkingConfig,
    ConsoleReporter, Embedder, FlatIndex, FlatL2Index, IndexState, InitOutcome, LoaderOptions,
    ParseErrorPolicy, PipelineConfig, SentenceModel, StatusReporter, BUILD_COMPLETED,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-index", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

#[derive(Subcommand)]
enum Command {
    /// Build the vector index only if the index directory is still empty.
    Init,
    /// Rebuild the vector index unconditionally, replacing the saved one.
    Build,
    /// Query the saved vector index.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "4")]
        top_k: usize,
    },
    /// Report whether the index directory is empty or populated.
    Status,
}

#[derive(Args)]
struct Settings {
    /// Folder that contains the source PDFs.
    #[arg(long, env = "DATA_PATH", default_value = "data/", global = true)]
    data_path: PathBuf,

    /// Folder the vector index is saved into.
    #[arg(long, env = "DB_FAISS_PATH", default_value = "vectorstore/db_faiss", global = true)]
    db_faiss_path: PathBuf,

    /// Maximum chunk length in characters.
    #[arg(long, env = "CHUNK_SIZE", default_value = "500", global = true)]
    chunk_size: usize,

    /// Characters shared by neighbouring chunks.
    #[arg(long, env = "CHUNK_OVERLAP", default_value = "50", global = true)]
    chunk_overlap: usize,

    /// Worker threads used to parse PDFs.
    #[arg(long, env = "LOADER_THREADS", default_value = "4", global = true)]
    loader_threads: usize,

    /// Also load PDFs from subdirectories.
    #[arg(long, env = "LOADER_RECURSIVE", default_value_t = false, global = true)]
    recursive: bool,

    /// Parse PDFs on a thread pool.
    #[arg(
        long,
        env = "USE_MULTITHREADING",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    use_multithreading: bool,

    /// Show a progress bar while loading PDFs.
    #[arg(
        long,
        env = "SHOW_PROGRESS",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    show_progress: bool,

    /// What to do with a PDF that fails to parse.
    #[arg(long, env = "ON_PARSE_ERROR", value_enum, default_value = "abort", global = true)]
    on_parse_error: ParseErrorArg,

    /// Sentence-transformer model name.
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2", global = true)]
    embedding_model: String,

    /// Where downloaded model files are cached.
    #[arg(long, env = "EMBEDDING_CACHE_DIR", default_value = ".fastembed_cache", global = true)]
    embedding_cache_dir: PathBuf,

    /// Vector size of the built-in trigram embedder.
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value = "384", global = true)]
    embedding_dimensions: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum ParseErrorArg {
    Abort,
    Skip,
}

impl From<ParseErrorArg> for ParseErrorPolicy {
    fn from(value: ParseErrorArg) -> Self {
        match value {
            ParseErrorArg::Abort => ParseErrorPolicy::Abort,
            ParseErrorArg::Skip => ParseErrorPolicy::Skip,
        }
    }
}

impl Settings {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let chunking = ChunkingConfig::new(self.chunk_size, self.chunk_overlap)?;
        let loader = LoaderOptions {
            recursive: self.recursive,
            use_multithreading: self.use_multithreading,
            max_concurrency: self.loader_threads,
            show_progress: self.show_progress,
            on_parse_error: self.on_parse_error.into(),
        };

        Ok(PipelineConfig::new(&self.data_path, &self.db_faiss_path)
            .with_chunking(chunking)
            .with_loader(loader))
    }

    fn embedder(&self) -> anyhow::Result<Box<dyn Embedder>> {
        let model = SentenceModel::parse(&self.embedding_model)
            .ok_or_else(|| anyhow!("unknown embedding model: {}", self.embedding_model))?;
        sentence_embedder(model, self)
    }
}

#[cfg(feature = "fastembed")]
fn sentence_embedder(model: SentenceModel, settings: &Settings) -> anyhow::Result<Box<dyn Embedder>> {
    let embedder = pdf_index_core::SentenceEmbedder::new(model, &settings.embedding_cache_dir)
        .with_context(|| format!("loading embedding model {}", model.name()))?;
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "fastembed"))]
fn sentence_embedder(model: SentenceModel, settings: &Settings) -> anyhow::Result<Box<dyn Embedder>> {
    warn!(
        requested = model.name(),
        cache_dir = %settings.embedding_cache_dir.display(),
        "built without the fastembed feature, using the trigram embedder"
    );
    Ok(Box::new(pdf_index_core::CharacterNgramEmbedder {
        dimensions: settings.embedding_dimensions,
    }))
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-index boot"
    );

    let config = cli.settings.pipeline_config()?;
    let reporter = ConsoleReporter;

    match cli.command.unwrap_or(Command::Init) {
        Command::Init => {
            let embedder = cli.settings.embedder()?;
            let index = FlatL2Index::for_embedder(embedder.as_ref());
            let outcome = init_vector_db(&config, embedder.as_ref(), &index, &reporter)
                .with_context(|| format!("building vector index at {}", config.index_path.display()))?;
            if let InitOutcome::Built(summary) = outcome {
                info!(
                    chunks = summary.chunks,
                    files = summary.files_loaded,
                    skipped = summary.files_skipped,
                    "first-run build done"
                );
            }
        }
        Command::Build => {
            let embedder = cli.settings.embedder()?;
            let index = FlatL2Index::for_embedder(embedder.as_ref());
            let summary = build_index(&config, embedder.as_ref(), &index)
                .with_context(|| format!("building vector index at {}", config.index_path.display()))?;
            if summary.files_skipped > 0 {
                warn!(skipped = summary.files_skipped, "some pdf files were skipped");
            }
            reporter.plain(BUILD_COMPLETED);
        }
        Command::Search { query, top_k } => {
            let index = FlatIndex::load(&config.index_path)
                .with_context(|| format!("loading vector index from {}", config.index_path.display()))?;
            let embedder = cli.settings.embedder()?;
            if embedder.model_name() != index.embedding_model() {
                warn!(
                    index_model = index.embedding_model(),
                    query_model = embedder.model_name(),
                    "query embedder differs from the one used to build the index"
                );
            }

            let query_vector = embedder.embed(&query)?;
            let hits = index.similarity_search(&query_vector, top_k)?;

            println!("query: {query}");
            for hit in hits {
                println!(
                    "[{:.4}] distance={:.4} source={} page={}",
                    hit.score, hit.distance, hit.chunk.source, hit.chunk.page
                );
                println!("  chunk_text:\n{}", hit.chunk.text);
            }
        }
        Command::Status => {
            let state = inspect_index_dir(&config.index_path)
                .with_context(|| format!("reading {}", config.index_path.display()))?;
            match state {
                IndexState::Empty => reporter.warning(&format!("{}: empty", config.index_path.display())),
                IndexState::Populated => {
                    reporter.success(&format!("{}: populated", config.index_path.display()));
                    match read_manifest(&config.index_path) {
                        Ok(manifest) => println!(
                            "model={} dimensions={} entries={} created_at={}",
                            manifest.embedding_model,
                            manifest.dimensions,
                            manifest.entry_count,
                            manifest.created_at.to_rfc3339()
                        ),
                        Err(error) => println!("  unable_to_read_manifest: {error}"),
                    }
                }
            }
        }
    }

    Ok(())
}
