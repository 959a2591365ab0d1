use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    /// 0-based page index within `source`.
    pub page: u32,
}

/// One parsed PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: u32,
    /// Character offset of `text` inside the page it was cut from.
    pub start_index: usize,
    pub chunk_index: u64,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParseErrorPolicy {
    /// Stop the whole run on the first unreadable PDF.
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub recursive: bool,
    pub use_multithreading: bool,
    pub max_concurrency: usize,
    pub show_progress: bool,
    pub on_parse_error: ParseErrorPolicy,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            use_multithreading: true,
            max_concurrency: 4,
            show_progress: true,
            on_parse_error: ParseErrorPolicy::Abort,
        }
    }
}

/// Summary written alongside the vectors so the index can be checked on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub entry_count: usize,
    pub vectors_checksum: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub chunk: Chunk,
    pub distance: f32,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
}
