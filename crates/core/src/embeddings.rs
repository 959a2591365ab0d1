use crate::error::IndexError;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Maps text to a fixed-dimension vector.
pub trait Embedder {
    fn model_name(&self) -> &str;
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// Hashed character-trigram embedder. Needs no model files, so it is the
/// built-in fallback and the embedder used throughout the tests.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn model_name(&self) -> &str {
        "char-trigram-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let mut vector = vec![0f32; self.dimensions()];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}

/// Sentence-transformer models the fastembed backend knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentenceModel {
    #[default]
    AllMiniLmL6V2,
    AllMiniLmL12V2,
    BgeSmallEnV15,
    BgeBaseEnV15,
}

impl SentenceModel {
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_prefix("sentence-transformers/").unwrap_or(&name);
        let name = name.strip_prefix("baai/").unwrap_or(name);
        match name {
            "all-minilm-l6-v2" => Some(Self::AllMiniLmL6V2),
            "all-minilm-l12-v2" => Some(Self::AllMiniLmL12V2),
            "bge-small-en-v1.5" => Some(Self::BgeSmallEnV15),
            "bge-base-en-v1.5" => Some(Self::BgeBaseEnV15),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "sentence-transformers/all-MiniLM-L6-v2",
            Self::AllMiniLmL12V2 => "sentence-transformers/all-MiniLM-L12-v2",
            Self::BgeSmallEnV15 => "BAAI/bge-small-en-v1.5",
            Self::BgeBaseEnV15 => "BAAI/bge-base-en-v1.5",
        }
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::BgeBaseEnV15 => 768,
            _ => 384,
        }
    }
}

#[cfg(feature = "fastembed")]
pub use sentence::SentenceEmbedder;

#[cfg(feature = "fastembed")]
mod sentence {
    //! Sentence embeddings via fastembed.

    use super::{Embedder, SentenceModel};
    use crate::error::IndexError;
    use std::path::Path;

    pub struct SentenceEmbedder {
        model: fastembed::TextEmbedding,
        kind: SentenceModel,
    }

    impl SentenceEmbedder {
        /// Loads `kind`, downloading model files into `cache_dir` on first use.
        pub fn new(kind: SentenceModel, cache_dir: &Path) -> Result<Self, IndexError> {
            let options = fastembed::InitOptions::new(fastembed_model(kind))
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(true);

            let model = fastembed::TextEmbedding::try_new(options)
                .map_err(|e| IndexError::Embedding(format!("model load failed: {e}")))?;

            Ok(Self { model, kind })
        }
    }

    fn fastembed_model(kind: SentenceModel) -> fastembed::EmbeddingModel {
        match kind {
            SentenceModel::AllMiniLmL6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
            SentenceModel::AllMiniLmL12V2 => fastembed::EmbeddingModel::AllMiniLML12V2,
            SentenceModel::BgeSmallEnV15 => fastembed::EmbeddingModel::BGESmallENV15,
            SentenceModel::BgeBaseEnV15 => fastembed::EmbeddingModel::BGEBaseENV15,
        }
    }

    impl Embedder for SentenceEmbedder {
        fn model_name(&self) -> &str {
            self.kind.name()
        }

        fn dimensions(&self) -> usize {
            self.kind.dimensions()
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
            let embeddings = self.embed_batch(&[text])?;
            Ok(embeddings.into_iter().next().unwrap_or_default())
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, IndexError> {
            self.model
                .embed(texts.to_vec(), None)
                .map_err(|e| IndexError::Embedding(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CharacterNgramEmbedder, Embedder, SentenceModel};

    #[test]
    fn embedder_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow")?;
        let second = embedder.embed("Hydraulic pressure and flow")?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn embedder_outputs_expected_length() -> Result<(), Box<dyn std::error::Error>> {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed("abc")?;
        assert_eq!(vector.len(), 32);
        Ok(())
    }

    #[test]
    fn batch_matches_single_calls() -> Result<(), Box<dyn std::error::Error>> {
        let embedder = CharacterNgramEmbedder { dimensions: 64 };
        let batch = embedder.embed_batch(&["pump", "valve"])?;
        assert_eq!(batch, vec![embedder.embed("pump")?, embedder.embed("valve")?]);
        Ok(())
    }

    #[test]
    fn sentence_model_names_parse() {
        assert_eq!(
            SentenceModel::parse("all-MiniLM-L6-v2"),
            Some(SentenceModel::AllMiniLmL6V2)
        );
        assert_eq!(
            SentenceModel::parse("sentence-transformers/all-MiniLM-L12-v2"),
            Some(SentenceModel::AllMiniLmL12V2)
        );
        assert_eq!(
            SentenceModel::parse("BAAI/bge-base-en-v1.5").map(|model| model.dimensions()),
            Some(768)
        );
        assert_eq!(SentenceModel::parse("unknown"), None);
    }
}
