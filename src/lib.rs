use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod batch;
pub mod document;
pub mod error;
pub mod extract;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod quiz;
pub mod settings;
mod tools;

#[cfg(test)]
mod test_util;

pub use batch::{BatchOptions, BatchSummary, QuizSheet, process_batch};
pub use document::{Document, DocumentKind};
pub use error::PipelineError;
pub use extract::{SourceKind, Word, WordSource, WordsFuture};
pub use pipeline::{Extraction, ExtractionReport, extract_questions, extract_with_chain};
pub use quiz::{AnswerLetter, FinalQuestion};
pub use settings::Settings;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub settings_path: Option<String>,
    pub lang: Option<String>,
    pub force_ocr: bool,
    pub jobs: Option<usize>,
}

/// Loads settings, applies command line overrides and processes every input.
pub async fn run(config: Config) -> Result<BatchSummary> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    if let Some(lang) = config.lang.as_deref().map(str::trim) {
        if !lang.is_empty() {
            settings.ocr_language = lang.to_string();
        }
    }
    if let Some(jobs) = config.jobs.filter(|jobs| *jobs > 0) {
        settings.batch_concurrency = jobs;
    }
    debug!(?settings, "settings loaded");

    let paths = batch::collect_inputs(&config.inputs)?;
    let options = BatchOptions {
        out_dir: config.out_dir,
        processed_dir: config.processed_dir,
    };
    let chain = extract::default_chain(config.force_ocr);
    Ok(batch::process_batch(paths, &settings, &options, &chain).await)
}

/// Sheets as JSON for stdout: one object for a single document, an array
/// otherwise. `None` when nothing succeeded.
pub fn format_sheets_json(summary: &BatchSummary) -> Result<Option<String>> {
    let sheets = summary.sheets().collect::<Vec<_>>();
    let json = match sheets.as_slice() {
        [] => return Ok(None),
        [single] if summary.total() == 1 => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    Ok(Some(json))
}
