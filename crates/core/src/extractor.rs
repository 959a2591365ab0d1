use crate::error::IngestError;
use lopdf::Document;
use regex::Regex;
use std::path::Path;

/// Text of one page. `index` is 0-based, so the first page is 0.
#[derive(Debug, Clone)]
pub struct PageText {
    pub index: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Document::load(path).map_err(|error| parse_error(path, error))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| parse_error(path, error))?;

            pages.push(PageText {
                index: page_no.saturating_sub(1),
                text,
            });
        }

        Ok(pages)
    }
}

fn parse_error(path: &Path, error: lopdf::Error) -> IngestError {
    IngestError::PdfParse {
        path: path.display().to_string(),
        details: error.to_string(),
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

/// Cleans raw extracted page text while keeping paragraph breaks, which the
/// splitter uses as its first-choice boundary.
#[derive(Debug, Clone)]
pub struct PageTidier {
    trailing_whitespace: Regex,
    leading_whitespace: Regex,
    space_runs: Regex,
    blank_runs: Regex,
}

impl PageTidier {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            trailing_whitespace: Regex::new(r"[ \t]+\n")?,
            leading_whitespace: Regex::new(r"\n[ \t]+")?,
            space_runs: Regex::new(r"[ \t]{2,}")?,
            blank_runs: Regex::new(r"\n{3,}")?,
        })
    }

    pub fn tidy(&self, text: &str) -> String {
        let text = text.replace('\u{a0}', " ").replace("\r\n", "\n");
        let text = self.trailing_whitespace.replace_all(&text, "\n");
        let text = self.leading_whitespace.replace_all(&text, "\n");
        let text = self.space_runs.replace_all(&text, " ");
        let text = self.blank_runs.replace_all(&text, "\n\n");
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_page_texts, PageTidier};
    use tempfile::tempdir;

    #[test]
    fn tidy_keeps_paragraph_breaks_and_drops_trailing_spaces() -> Result<(), Box<dyn std::error::Error>> {
        let tidier = PageTidier::new()?;
        let tidied = tidier.tidy("  First line  \nsecond\u{a0}line\n\n\n\nNext paragraph \t\n");
        assert_eq!(tidied, "First line\nsecond line\n\nNext paragraph");

        let tidied = tidier.tidy("Table   of\t\tcontents\n    indented line");
        assert_eq!(tidied, "Table of contents\nindented line");
        Ok(())
    }

    #[test]
    fn garbage_bytes_are_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        let error = extract_page_texts(&path).expect_err("broken pdf must not parse");
        assert!(matches!(error, crate::IngestError::PdfParse { .. }));
        Ok(())
    }
}
