use crate::error::IngestError;
use crate::extractor::{LopdfExtractor, PageTidier, PdfExtractor};
use crate::models::{Document, DocumentMetadata, LoaderOptions, ParseErrorPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

pub fn discover_pdf_files(folder: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

#[derive(Debug)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub files_loaded: usize,
    pub skipped_files: Vec<SkippedPdf>,
}

pub fn load_documents(folder: &Path, options: &LoaderOptions) -> Result<LoadReport, IngestError> {
    load_documents_with(folder, options, &LopdfExtractor)
}

/// Parses every PDF under `folder` into one [`Document`] per non-blank page.
///
/// Output order follows the sorted file list and then page order, whether or
/// not parsing ran on the thread pool.
pub fn load_documents_with(
    folder: &Path,
    options: &LoaderOptions,
    extractor: &dyn PdfExtractor,
) -> Result<LoadReport, IngestError> {
    if !fs::metadata(folder)?.is_dir() {
        return Err(IngestError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("data path is not a directory: {}", folder.display()),
        )));
    }

    let files = discover_pdf_files(folder, options.recursive);
    if files.is_empty() {
        return Err(IngestError::NoPdfFiles(folder.display().to_string()));
    }

    info!(folder = %folder.display(), file_count = files.len(), "loading pdf files");

    let tidier = PageTidier::new()?;
    let progress = progress_bar(files.len(), options.show_progress);

    let parse = |path: &PathBuf| {
        let parsed = parse_pdf(extractor, &tidier, path);
        progress.inc(1);
        (path.clone(), parsed)
    };

    let outcomes: Vec<(PathBuf, Result<Vec<Document>, IngestError>)> = if options.use_multithreading {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.max_concurrency.max(1))
            .build()
            .map_err(|error| IngestError::ThreadPool(error.to_string()))?;
        pool.install(|| files.par_iter().map(parse).collect())
    } else {
        files.iter().map(parse).collect()
    };
    progress.finish_and_clear();

    let mut report = LoadReport::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(documents) => {
                report.files_loaded += 1;
                report.documents.extend(documents);
            }
            Err(error) => match options.on_parse_error {
                ParseErrorPolicy::Abort => return Err(error),
                ParseErrorPolicy::Skip => {
                    warn!(path = %path.display(), reason = %error, "skipped pdf");
                    report.skipped_files.push(SkippedPdf {
                        path,
                        reason: error.to_string(),
                    });
                }
            },
        }
    }

    info!(
        files_loaded = report.files_loaded,
        skipped_files = report.skipped_files.len(),
        documents = report.documents.len(),
        "pdf files loaded"
    );

    Ok(report)
}

fn parse_pdf(
    extractor: &dyn PdfExtractor,
    tidier: &PageTidier,
    path: &Path,
) -> Result<Vec<Document>, IngestError> {
    if path.file_name().is_none() {
        return Err(IngestError::MissingFileName(path.display().to_string()));
    }

    let source = path.to_string_lossy().to_string();
    let pages = extractor.extract_pages(path)?;
    let page_count = pages.len();

    let documents: Vec<Document> = pages
        .into_iter()
        .filter_map(|page| {
            let text = tidier.tidy(&page.text);
            if text.is_empty() {
                return None;
            }
            Some(Document {
                page_content: text,
                metadata: DocumentMetadata {
                    source: source.clone(),
                    page: page.index,
                },
            })
        })
        .collect();

    if documents.is_empty() {
        warn!(path = %path.display(), page_count, "pdf had no readable page text");
    } else {
        debug!(path = %path.display(), page_count, documents = documents.len(), "parsed pdf");
    }

    Ok(documents)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len}") {
        bar.set_style(style);
    }
    bar.set_message("Loading PDFs");
    bar
}
