pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod index;
pub mod ingest;
pub mod models;
pub mod pipeline;

pub use chunking::{split_documents, ChunkingConfig};
pub use config::PipelineConfig;
#[cfg(feature = "fastembed")]
pub use embeddings::SentenceEmbedder;
pub use embeddings::{CharacterNgramEmbedder, Embedder, SentenceModel, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IndexError, IngestError, PipelineError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PageTidier, PdfExtractor};
pub use guard::{
    init_vector_db, init_with, inspect_index_dir, ConsoleReporter, IndexState, InitOutcome,
    StatusReporter, README_MARKER,
};
pub use index::{read_manifest, DocstoreEntry, FlatIndex, FlatL2Index, VectorIndex};
pub use ingest::{discover_pdf_files, load_documents, load_documents_with, LoadReport, SkippedPdf};
pub use models::{
    BuildSummary, Chunk, Document, DocumentMetadata, IndexManifest, LoaderOptions,
    ParseErrorPolicy, SearchHit,
};
pub use pipeline::{build_index, load_dir_data, save_chunks_to_index, split_doc_to_chunks, BUILD_COMPLETED};
