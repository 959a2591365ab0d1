use crate::chunking::ChunkingConfig;
use crate::models::LoaderOptions;
use std::path::PathBuf;

/// Everything one pipeline run needs, resolved once at startup and handed to
/// each stage explicitly.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scanned for `*.pdf` files.
    pub data_path: PathBuf,
    /// Directory the vector index is saved into.
    pub index_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub loader: LoaderOptions,
}

impl PipelineConfig {
    pub fn new(data_path: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            index_path: index_path.into(),
            chunking: ChunkingConfig::default(),
            loader: LoaderOptions::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_loader(mut self, loader: LoaderOptions) -> Self {
        self.loader = loader;
        self
    }
}
