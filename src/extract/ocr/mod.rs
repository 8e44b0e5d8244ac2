mod parse;
mod preprocess;
mod render;
mod tesseract;

use anyhow::{Context, Result, anyhow};
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentKind};
use crate::error::PipelineError;
use crate::settings::Settings;
use crate::tools::command_exists;

use super::{SourceKind, Word, WordSource, WordsFuture, sort_words};
use render::PageRange;
use tesseract::{TesseractCli, TsvEngine};

pub use tesseract::list_tesseract_languages;

/// Words recognized from rasterized pages. Expensive; only reached when the
/// text layer did not reveal an answer key.
pub struct OcrSource;

impl WordSource for OcrSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Ocr
    }

    fn line_tolerance(&self, settings: &Settings) -> f32 {
        settings.line_tolerance_ocr
    }

    fn extract_words<'a>(
        &'a self,
        document: &'a Document,
        settings: &'a Settings,
    ) -> WordsFuture<'a> {
        Box::pin(async move {
            let unavailable =
                |err: anyhow::Error| PipelineError::unavailable("ocr", format!("{:#}", err));

            let session = Arc::new(OcrSession::open(settings).map_err(unavailable)?);
            let pages = {
                let session = Arc::clone(&session);
                let bytes = document.bytes().to_vec();
                let kind = document.kind();
                tokio::task::spawn_blocking(move || session.render(&bytes, kind))
                    .await
                    .map_err(|err| unavailable(anyhow!("render task failed: {}", err)))?
                    .map_err(unavailable)?
            };
            debug!(name = document.display_name(), pages = pages.len(), "pages rendered");

            let workers = settings.ocr_workers();
            let prepared: Vec<Result<(u32, PathBuf)>> = stream::iter(pages)
                .map(|(page, path)| {
                    let session = Arc::clone(&session);
                    async move {
                        tokio::task::spawn_blocking(move || session.prepare_page(page, &path))
                            .await
                            .map_err(|err| {
                                anyhow!("preparation task for page {} failed: {}", page, err)
                            })?
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;
            let mut prepared = prepared
                .into_iter()
                .collect::<Result<Vec<_>>>()
                .map_err(unavailable)?;
            prepared.sort_by_key(|(page, _)| *page);

            let mut words = {
                let session = Arc::clone(&session);
                tokio::task::spawn_blocking(move || session.recognize_pages(&prepared))
                    .await
                    .map_err(|err| unavailable(anyhow!("recognition task failed: {}", err)))?
                    .map_err(unavailable)?
            };
            // Every worker has finished; this is the last handle.
            drop(session);

            sort_words(&mut words);
            info!(name = document.display_name(), words = words.len(), "ocr finished");
            Ok(words)
        })
    }
}

/// One recognition session per document: the language is validated once,
/// every page goes through a single engine invocation, and the scratch
/// directory holding rendered pages lives exactly as long as the session.
struct OcrSession {
    dir: TempDir,
    engine: Box<dyn TsvEngine>,
    dpi: u32,
    normalize: bool,
    min_confidence: f32,
    range: PageRange,
}

impl OcrSession {
    fn open(settings: &Settings) -> Result<Self> {
        if !command_exists("tesseract") {
            return Err(anyhow!("tesseract not found (install tesseract-ocr)"));
        }
        let available = match list_tesseract_languages() {
            Ok(list) => Some(list),
            Err(err) => {
                warn!(error = %err, "could not list tesseract languages");
                None
            }
        };
        let language = tesseract::resolve_language(&settings.ocr_language, available.as_deref())?;
        debug!(language = %language, "ocr language resolved");
        let engine = TesseractCli {
            language,
            psm: settings.ocr_page_segmentation_mode,
            dpi: settings.render_dpi(),
        };
        Self::with_engine(settings, Box::new(engine))
    }

    fn with_engine(settings: &Settings, engine: Box<dyn TsvEngine>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("quiz-ocr-")
            .tempdir()
            .with_context(|| "failed to create ocr scratch directory")?;
        debug!(dir = %dir.path().display(), "ocr session opened");
        Ok(Self {
            dir,
            engine,
            dpi: settings.render_dpi(),
            normalize: settings.ocr_normalize,
            min_confidence: settings.ocr_min_confidence,
            range: PageRange {
                first: settings.ocr_first_page,
                last: settings.ocr_last_page,
            },
        })
    }

    fn render(&self, bytes: &[u8], kind: DocumentKind) -> Result<Vec<(u32, PathBuf)>> {
        render::render_pages(bytes, kind, self.dir.path(), self.dpi, self.range)
    }

    fn prepare_page(&self, page: u32, image: &Path) -> Result<(u32, PathBuf)> {
        if !self.normalize {
            return Ok((page, image.to_path_buf()));
        }
        let prepared = image.with_extension("ocr.png");
        preprocess::normalize_page(image, &prepared).with_context(|| format!("page {}", page))?;
        Ok((page, prepared))
    }

    /// Writes the page list and hands it to the engine once. `pages` must be
    /// in page order; the engine numbers its output pages by list position.
    fn recognize_pages(&self, pages: &[(u32, PathBuf)]) -> Result<Vec<Word>> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }
        let list = self.dir.path().join("pages.txt");
        let mut content = String::new();
        for (_, path) in pages {
            content.push_str(&path.to_string_lossy());
            content.push('\n');
        }
        std::fs::write(&list, content)
            .with_context(|| format!("failed to write {}", list.display()))?;

        let tsv = self.engine.recognize(&list)?;
        let page_numbers = pages.iter().map(|(page, _)| *page).collect::<Vec<_>>();
        let words = parse::parse_tsv_words(&tsv, &page_numbers, self.min_confidence)?;
        debug!(pages = pages.len(), words = words.len(), "pages recognized");
        Ok(words)
    }
}

impl Drop for OcrSession {
    fn drop(&mut self) {
        debug!(dir = %self.dir.path().display(), "ocr session closed");
    }
}
