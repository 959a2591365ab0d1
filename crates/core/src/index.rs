//! L2 vector index backed by usearch, plus its on-disk layout.
//!
//! A saved index is two files in the target directory:
//!
//! * `index.usearch`: the usearch index, keyed by entry position.
//! * `index.json`: the [`IndexManifest`] and the docstore, one entry per key
//!   in key order.
//!
//! Both files are written into a staging directory next to the target and
//! renamed into place, so an interrupted save never leaves partial files in
//! the index directory itself.

use crate::embeddings::Embedder;
use crate::error::IndexError;
use crate::models::{Chunk, IndexManifest, SearchHit};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

pub const VECTORS_FILE: &str = "index.usearch";
pub const DOCSTORE_FILE: &str = "index.json";
pub const FORMAT_VERSION: u32 = 2;

/// Builds a searchable handle from chunk/vector pairs and persists it.
pub trait VectorIndex {
    type Handle;

    fn build(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self::Handle, IndexError>;

    fn save(&self, handle: &Self::Handle, dir: &Path) -> Result<(), IndexError>;
}

/// [`VectorIndex`] backend producing [`FlatIndex`] handles.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    embedding_model: String,
    dimensions: usize,
}

impl FlatL2Index {
    pub fn new(embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            dimensions,
        }
    }

    pub fn for_embedder(embedder: &dyn Embedder) -> Self {
        Self::new(embedder.model_name(), embedder.dimensions())
    }
}

impl VectorIndex for FlatL2Index {
    type Handle = FlatIndex;

    fn build(&self, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<FlatIndex, IndexError> {
        FlatIndex::from_pairs(&self.embedding_model, self.dimensions, chunks, embeddings)
    }

    fn save(&self, handle: &FlatIndex, dir: &Path) -> Result<(), IndexError> {
        handle.save(dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocstoreEntry {
    pub id: String,
    pub chunk: Chunk,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocstoreFile {
    manifest: IndexManifest,
    entries: Vec<DocstoreEntry>,
}

/// Docstore entries plus the usearch index holding their vectors. The vector
/// for `entries[i]` is stored under key `i`.
pub struct FlatIndex {
    embedding_model: String,
    dimensions: usize,
    entries: Vec<DocstoreEntry>,
    vectors: Index,
}

impl fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatIndex")
            .field("embedding_model", &self.embedding_model)
            .field("dimensions", &self.dimensions)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl FlatIndex {
    pub fn from_pairs(
        embedding_model: &str,
        dimensions: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::LengthMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        if dimensions == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }

        if let Some(ragged) = embeddings.iter().find(|embedding| embedding.len() != dimensions) {
            return Err(IndexError::DimensionMismatch {
                expected: dimensions,
                found: ragged.len(),
            });
        }

        let vectors = new_usearch_index(dimensions)?;
        if !embeddings.is_empty() {
            vectors.reserve(embeddings.len()).map_err(backend)?;
        }
        for (key, embedding) in embeddings.iter().enumerate() {
            vectors.add(key as u64, embedding.as_slice()).map_err(backend)?;
        }

        let entries = chunks
            .into_iter()
            .map(|chunk| DocstoreEntry {
                id: make_entry_id(&chunk),
                chunk,
            })
            .collect();

        Ok(Self {
            embedding_model: embedding_model.to_string(),
            dimensions,
            entries,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn entries(&self) -> &[DocstoreEntry] {
        &self.entries
    }

    /// Stored vector of the entry at `position`.
    pub fn vector(&self, position: usize) -> Option<Vec<f32>> {
        if position >= self.entries.len() {
            return None;
        }
        let mut buffer = vec![0f32; self.dimensions];
        match self.vectors.get(position as u64, buffer.as_mut_slice()) {
            Ok(found) if found > 0 => Some(buffer),
            _ => None,
        }
    }

    /// Returns up to `k` entries closest to `query` by Euclidean distance,
    /// nearest first.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                found: query.len(),
            });
        }

        let matches = self
            .vectors
            .search(query, k.min(self.entries.len()))
            .map_err(backend)?;

        let mut scored: Vec<(u64, f32)> = matches.keys.into_iter().zip(matches.distances).collect();
        scored.sort_by(|left, right| left.1.total_cmp(&right.1).then(left.0.cmp(&right.0)));

        scored
            .into_iter()
            .map(|(key, squared)| {
                let entry = usize::try_from(key)
                    .ok()
                    .and_then(|position| self.entries.get(position))
                    .ok_or_else(|| IndexError::Backend(format!("search returned unknown key {key}")))?;
                let distance = squared.max(0.0).sqrt();
                Ok(SearchHit {
                    id: entry.id.clone(),
                    chunk: entry.chunk.clone(),
                    distance,
                    score: 1.0 / (1.0 + distance),
                })
            })
            .collect()
    }

    /// Writes the index into `dir`, creating it if needed and replacing any
    /// previous index files there.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;
        let staging = staging_dir(dir)?;
        match fs::remove_dir_all(&staging) {
            Err(error) if error.kind() != ErrorKind::NotFound => return Err(error.into()),
            _ => {}
        }
        fs::create_dir_all(&staging)?;

        let written = self
            .write_files(&staging)
            .and_then(|_| Ok(fs::rename(staging.join(VECTORS_FILE), dir.join(VECTORS_FILE))?))
            .and_then(|_| Ok(fs::rename(staging.join(DOCSTORE_FILE), dir.join(DOCSTORE_FILE))?));
        let _ = fs::remove_dir_all(&staging);
        written?;

        info!(
            path = %dir.display(),
            entries = self.entries.len(),
            dimensions = self.dimensions,
            "vector index saved"
        );
        Ok(())
    }

    fn write_files(&self, staging: &Path) -> Result<(), IndexError> {
        let vectors_path = staging.join(VECTORS_FILE);
        self.vectors
            .save(path_str(&vectors_path)?)
            .map_err(backend)?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            entry_count: self.entries.len(),
            vectors_checksum: sha256_hex(&fs::read(&vectors_path)?),
            created_at: Utc::now(),
        };
        let docstore = serde_json::to_vec_pretty(&DocstoreFile {
            manifest,
            entries: self.entries.clone(),
        })?;
        fs::write(staging.join(DOCSTORE_FILE), docstore)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let vectors_path = dir.join(VECTORS_FILE);
        let docstore: DocstoreFile = serde_json::from_slice(&fs::read(dir.join(DOCSTORE_FILE))?)?;
        let corrupt = |details: String| IndexError::Corrupt {
            path: dir.display().to_string(),
            details,
        };

        let manifest = docstore.manifest;
        if manifest.format_version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }
        if sha256_hex(&fs::read(&vectors_path)?) != manifest.vectors_checksum {
            return Err(corrupt("vectors checksum mismatch".to_string()));
        }
        if manifest.dimensions == 0 {
            return Err(corrupt("manifest dimension is zero".to_string()));
        }

        let vectors = new_usearch_index(manifest.dimensions)?;
        vectors
            .load(path_str(&vectors_path)?)
            .map_err(|error| corrupt(error.to_string()))?;

        if vectors.size() != docstore.entries.len() || docstore.entries.len() != manifest.entry_count {
            return Err(corrupt(format!(
                "vector count {} does not match docstore entries {}",
                vectors.size(),
                docstore.entries.len()
            )));
        }
        if vectors.dimensions() != manifest.dimensions {
            return Err(corrupt(format!(
                "vector dimension {} does not match manifest {}",
                vectors.dimensions(),
                manifest.dimensions
            )));
        }

        debug!(path = %dir.display(), entries = docstore.entries.len(), "vector index loaded");

        Ok(Self {
            embedding_model: manifest.embedding_model,
            dimensions: manifest.dimensions,
            entries: docstore.entries,
            vectors,
        })
    }
}

/// Reads just the manifest of a saved index.
pub fn read_manifest(dir: &Path) -> Result<IndexManifest, IndexError> {
    let docstore: DocstoreFile = serde_json::from_slice(&fs::read(dir.join(DOCSTORE_FILE))?)?;
    Ok(docstore.manifest)
}

fn new_usearch_index(dimensions: usize) -> Result<Index, IndexError> {
    let options = IndexOptions {
        dimensions,
        metric: MetricKind::L2sq,
        quantization: ScalarKind::F32,
        connectivity: 0,
        expansion_add: 0,
        expansion_search: 0,
        multi: false,
    };
    Index::new(&options).map_err(backend)
}

fn backend(error: impl fmt::Display) -> IndexError {
    IndexError::Backend(error.to_string())
}

fn path_str(path: &Path) -> Result<&str, IndexError> {
    path.to_str()
        .ok_or_else(|| IndexError::Backend(format!("index path is not valid UTF-8: {}", path.display())))
}

/// Sibling of `dir` that receives the files of an in-progress save.
fn staging_dir(dir: &Path) -> Result<PathBuf, IndexError> {
    let dir = fs::canonicalize(dir)?;
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "index".to_string());
    Ok(dir.with_file_name(format!(".{name}.staging")))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn make_entry_id(chunk: &Chunk) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk.source.as_bytes());
    hasher.update(chunk.page.to_le_bytes());
    hasher.update(chunk.chunk_index.to_le_bytes());
    hasher.update(chunk.text.as_bytes());
    format!("{:x}", hasher.finalize())
}
