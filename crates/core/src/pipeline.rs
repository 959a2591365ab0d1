use crate::chunking::{split_documents, ChunkingConfig};
use crate::config::PipelineConfig;
use crate::embeddings::Embedder;
use crate::error::{IndexError, PipelineError};
use crate::index::VectorIndex;
use crate::ingest::{load_documents, LoadReport};
use crate::models::{BuildSummary, Chunk, Document};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub const BUILD_COMPLETED: &str = "Database build completed ...";

pub fn load_dir_data(config: &PipelineConfig) -> Result<LoadReport, PipelineError> {
    Ok(load_documents(&config.data_path, &config.loader)?)
}

pub fn split_doc_to_chunks(
    documents: &[Document],
    chunking: ChunkingConfig,
) -> Result<Vec<Chunk>, PipelineError> {
    let chunks = split_documents(documents, chunking)?;
    info!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size = chunking.chunk_size(),
        chunk_overlap = chunking.chunk_overlap(),
        "documents split"
    );
    Ok(chunks)
}

/// Embeds every chunk, builds the index from the pairs and saves it to `dir`.
/// Returns the number of saved entries.
pub fn save_chunks_to_index<I>(
    chunks: Vec<Chunk>,
    embedder: &dyn Embedder,
    index: &I,
    dir: &Path,
) -> Result<usize, IndexError>
where
    I: VectorIndex,
{
    let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
    let embeddings = embedder.embed_batch(&texts)?;
    info!(
        model = embedder.model_name(),
        vectors = embeddings.len(),
        "chunks embedded"
    );

    let count = chunks.len();
    let handle = index.build(chunks, embeddings)?;
    index.save(&handle, dir)?;
    Ok(count)
}

/// Runs load, split, embed and save in order, replacing whatever index is at
/// `config.index_path`.
pub fn build_index<I>(
    config: &PipelineConfig,
    embedder: &dyn Embedder,
    index: &I,
) -> Result<BuildSummary, PipelineError>
where
    I: VectorIndex,
{
    let started = Instant::now();

    let report = load_dir_data(config)?;
    let chunks = split_doc_to_chunks(&report.documents, config.chunking)?;
    let chunk_count = save_chunks_to_index(chunks, embedder, index, &config.index_path)?;

    let summary = BuildSummary {
        files_loaded: report.files_loaded,
        files_skipped: report.skipped_files.len(),
        documents: report.documents.len(),
        chunks: chunk_count,
        dimensions: embedder.dimensions(),
    };

    info!(
        index_path = %config.index_path.display(),
        files = summary.files_loaded,
        skipped = summary.files_skipped,
        chunks = summary.chunks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "vector index build finished"
    );

    Ok(summary)
}
