use crate::error::IngestError;
use crate::models::{Chunk, Document};
use text_splitter::{ChunkConfig, TextSplitter};

/// Chunk size and overlap, both counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestError> {
        if chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk overlap {chunk_overlap} must be smaller than chunk size {chunk_size}"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Splitter for the non-overlapping body of each chunk. The overlap is
    /// added afterwards at word level, so the body leaves room for it.
    fn splitter(&self) -> TextSplitter<text_splitter::Characters> {
        let capacity = self.chunk_size - self.chunk_overlap;
        TextSplitter::new(ChunkConfig::new(capacity).with_trim(true))
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Splits every document into overlapping chunks. Splitting prefers paragraph,
/// then line, sentence and word boundaries before cutting inside a word.
/// Each chunk after the first in a document starts with up to
/// `chunk_overlap` characters from the end of the previous one, cut at a word
/// boundary. Chunks never span two documents.
pub fn split_documents(
    documents: &[Document],
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let splitter = config.splitter();
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for document in documents {
        let text = document.page_content.as_str();
        let mut previous: Option<(usize, usize)> = None;

        for (body_start, body) in splitter.chunk_indices(text) {
            if body.trim().is_empty() {
                continue;
            }
            let body_end = body_start + body.len();

            let start = previous
                .and_then(|(prev_start, prev_end)| {
                    let span = text[prev_end..body_end].chars().count();
                    let budget = config.chunk_overlap.min(config.chunk_size.saturating_sub(span));
                    overlap_start(text, prev_start, prev_end, budget)
                })
                .unwrap_or(body_start);
            previous = Some((body_start, body_end));

            chunks.push(Chunk {
                text: text[start..body_end].to_string(),
                source: document.metadata.source.clone(),
                page: document.metadata.page,
                start_index: text[..start].chars().count(),
                chunk_index: cursor,
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}

/// Byte offset where the overlap copied from `text[body_start..body_end]`
/// begins: the last `budget` characters, moved forward to the next word
/// start. A single word longer than the budget is cut inside the word.
fn overlap_start(text: &str, body_start: usize, body_end: usize, budget: usize) -> Option<usize> {
    if budget == 0 {
        return None;
    }

    let body = &text[body_start..body_end];
    let (offset, _) = body.char_indices().rev().take(budget).last()?;
    let window = body_start + offset;

    let mid_word = window > body_start
        && text[..window]
            .chars()
            .next_back()
            .is_some_and(|ch| !ch.is_whitespace());
    let from = if mid_word {
        match text[window..body_end].find(char::is_whitespace) {
            Some(gap) => window + gap,
            None => return Some(window),
        }
    } else {
        window
    };

    let word = text[from..body_end]
        .find(|ch: char| !ch.is_whitespace())
        .map(|skip| from + skip);
    Some(word.unwrap_or(window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn prose(label: &str, sentences: usize) -> String {
        (0..sentences)
            .map(|index| format!("{label} sentence number {index} talks about pumps and valves."))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn document(source: &str, page: u32, text: &str) -> Document {
        Document {
            page_content: text.to_string(),
            metadata: DocumentMetadata {
                source: source.to_string(),
                page,
            },
        }
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(50, 50).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(50, 49).is_ok());
    }

    #[test]
    fn short_document_becomes_one_chunk() -> Result<(), Box<dyn std::error::Error>> {
        let docs = vec![document("a.pdf", 0, "Short page.")];
        let chunks = split_documents(&docs, ChunkingConfig::new(100, 10)?)?;

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Short page.");
        assert_eq!(chunks[0].start_index, 0);
        assert_eq!(chunks[0].page, 0);
        Ok(())
    }

    #[test]
    fn chunks_respect_size_and_overlap_with_neighbours() -> Result<(), Box<dyn std::error::Error>> {
        let text = prose("Overlap", 30);
        let docs = vec![document("a.pdf", 1, &text)];
        let config = ChunkingConfig::new(200, 40)?;

        let chunks = split_documents(&docs, config)?;

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 200, "chunk too long: {}", chunk.char_len());
            let expected: String = text
                .chars()
                .skip(chunk.start_index)
                .take(chunk.char_len())
                .collect();
            assert_eq!(expected, chunk.text);
        }
        for pair in chunks.windows(2) {
            let previous_end = pair[0].start_index + pair[0].char_len();
            assert!(pair[1].start_index > pair[0].start_index);
            assert!(pair[1].start_index < previous_end);
            assert!(previous_end - pair[1].start_index <= 40);
        }
        Ok(())
    }

    #[test]
    fn long_sentences_still_overlap_at_word_level() -> Result<(), Box<dyn std::error::Error>> {
        let text = (0..40)
            .map(|index| {
                format!(
                    "Sentence {index:02} explains how the hydraulic pump keeps line pressure steady while the valve block stays closed."
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        let docs = vec![document("manual.pdf", 0, &text)];

        let chunks = split_documents(&docs, ChunkingConfig::new(500, 50)?)?;

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 500);
        }
        for pair in chunks.windows(2) {
            let previous_end = pair[0].start_index + pair[0].char_len();
            assert!(
                pair[1].start_index < previous_end,
                "chunk {} does not overlap chunk {}",
                pair[1].chunk_index,
                pair[0].chunk_index
            );
            let overlap = previous_end - pair[1].start_index;
            assert!(overlap <= 50, "overlap {overlap} exceeds 50");

            let shared: String = text.chars().skip(pair[1].start_index).take(overlap).collect();
            assert!(pair[0].text.ends_with(&shared));
            assert!(pair[1].text.starts_with(&shared));
            assert!(!shared.starts_with(char::is_whitespace));
        }
        Ok(())
    }

    #[test]
    fn overlap_starts_at_a_word_boundary() {
        let text = "alpha beta gamma delta";
        let start = overlap_start(text, 0, text.len(), 8);
        assert_eq!(start.map(|offset| &text[offset..]), Some("delta"));

        let single = "abcdefghij";
        let start = overlap_start(single, 0, single.len(), 4);
        assert_eq!(start.map(|offset| &single[offset..]), Some("ghij"));

        assert_eq!(overlap_start(text, 0, text.len(), 0), None);
    }

    #[test]
    fn prefers_paragraph_boundaries() -> Result<(), Box<dyn std::error::Error>> {
        let first = "a".repeat(30);
        let second = "b".repeat(30);
        let docs = vec![document("a.pdf", 1, &format!("{first}\n\n{second}"))];

        let chunks = split_documents(&docs, ChunkingConfig::new(40, 5)?)?;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, first);
        assert!(chunks[1].text.ends_with(&second));
        Ok(())
    }

    #[test]
    fn chunks_never_cross_documents() -> Result<(), Box<dyn std::error::Error>> {
        let docs = vec![
            document("a.pdf", 0, &"alpha ".repeat(60)),
            document("a.pdf", 1, &"omega ".repeat(60)),
        ];

        let chunks = split_documents(&docs, ChunkingConfig::new(120, 20)?)?;

        for chunk in &chunks {
            let from_first = chunk.text.contains("alpha");
            let from_second = chunk.text.contains("omega");
            assert!(from_first ^ from_second);
            assert_eq!(chunk.page, if from_first { 0 } else { 1 });
        }
        let indexes: Vec<u64> = chunks.iter().map(|chunk| chunk.chunk_index).collect();
        assert_eq!(indexes, (0..chunks.len() as u64).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn splitting_is_deterministic() -> Result<(), Box<dyn std::error::Error>> {
        let docs = vec![document("a.pdf", 1, &prose("Same", 20))];
        let config = ChunkingConfig::new(150, 30)?;
        assert_eq!(split_documents(&docs, config)?, split_documents(&docs, config)?);
        Ok(())
    }
}
