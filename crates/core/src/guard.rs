use crate::config::PipelineConfig;
use crate::embeddings::Embedder;
use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::models::BuildSummary;
use crate::pipeline::{build_index, BUILD_COMPLETED};
use console::style;
use std::fs;
use std::path::Path;
use tracing::info;

/// Documentation file that may live in the index directory without counting
/// as index content.
pub const README_MARKER: &str = "readme.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Empty,
    Populated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitOutcome {
    Built(BuildSummary),
    Skipped,
}

/// Receives the guard's human-facing status lines.
pub trait StatusReporter {
    fn warning(&self, message: &str);
    fn success(&self, message: &str);
    fn plain(&self, message: &str);
}

/// Prints status lines to stdout, red for warnings and green for success.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn warning(&self, message: &str) {
        println!("{}", style(message).red());
    }

    fn success(&self, message: &str) {
        println!("{}", style(message).green());
    }

    fn plain(&self, message: &str) {
        println!("{message}");
    }
}

/// Classifies the index directory with a single listing. Every entry other
/// than [`README_MARKER`] counts as content.
pub fn inspect_index_dir(path: &Path) -> std::io::Result<IndexState> {
    for entry in fs::read_dir(path)? {
        if entry?.file_name() != README_MARKER {
            return Ok(IndexState::Populated);
        }
    }
    Ok(IndexState::Empty)
}

/// Builds the index on first run and leaves an existing one untouched.
pub fn init_vector_db<I>(
    config: &PipelineConfig,
    embedder: &dyn Embedder,
    index: &I,
    reporter: &dyn StatusReporter,
) -> Result<InitOutcome, PipelineError>
where
    I: VectorIndex,
{
    init_with(&config.index_path, reporter, || {
        build_index(config, embedder, index)
    })
}

/// Guard logic with the build step supplied by the caller.
pub fn init_with<F>(
    index_path: &Path,
    reporter: &dyn StatusReporter,
    build: F,
) -> Result<InitOutcome, PipelineError>
where
    F: FnOnce() -> Result<BuildSummary, PipelineError>,
{
    let state = inspect_index_dir(index_path).map_err(crate::IngestError::Io)?;
    info!(index_path = %index_path.display(), ?state, "checked vector index directory");

    match state {
        IndexState::Empty => {
            reporter.warning(&format!(
                "{} is empty. Build vector DB on first run",
                index_path.display()
            ));
            let summary = build()?;
            reporter.plain(BUILD_COMPLETED);
            Ok(InitOutcome::Built(summary))
        }
        IndexState::Populated => {
            reporter.success(&format!(
                "{} is not empty. No need to build vector DB on first run",
                index_path.display()
            ));
            Ok(InitOutcome::Skipped)
        }
    }
}
