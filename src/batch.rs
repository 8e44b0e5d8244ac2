use anyhow::{Context, Result, anyhow};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::document::{Document, title_from_name};
use crate::extract::WordSource;
use crate::pipeline::{ExtractionReport, extract_with_chain};
use crate::quiz::FinalQuestion;
use crate::settings::Settings;

const INPUT_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp",
];

/// One document's questions as written by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSheet {
    pub title: String,
    pub source: String,
    pub questions: Vec<FinalQuestion>,
    pub report: ExtractionReport,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Write `<stem>.json` per document here.
    pub out_dir: Option<PathBuf>,
    /// Move inputs that produced questions here.
    pub processed_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    pub result: Result<QuizSheet>,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Outcomes in input order.
    pub outcomes: Vec<DocumentOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn sheets(&self) -> impl Iterator<Item = &QuizSheet> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }
}

/// Expands directories into their supported files, sorted by path. Files
/// given explicitly are kept whatever their extension.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(input)
                .with_context(|| format!("failed to read directory: {}", input.display()))?
            {
                let path = entry?.path();
                if path.is_file() && is_supported_input(&path) {
                    found.push(path);
                }
            }
            found.sort();
            paths.extend(found);
        } else if input.is_file() {
            paths.push(input.clone());
        } else {
            return Err(anyhow!("input not found: {}", input.display()));
        }
    }
    Ok(paths)
}

fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| INPUT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Runs every document through `chain` with at most `batch.concurrency` in
/// flight. A failing document never affects the others.
pub async fn process_batch(
    paths: Vec<PathBuf>,
    settings: &Settings,
    options: &BatchOptions,
    chain: &[Box<dyn WordSource>],
) -> BatchSummary {
    let concurrency = settings.batch_concurrency.max(1);
    let mut results: Vec<(usize, DocumentOutcome)> = stream::iter(paths.into_iter().enumerate())
        .map(move |(idx, path)| async move {
            let result = process_document(&path, settings, options, chain).await;
            (idx, DocumentOutcome { path, result })
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;
    results.sort_by_key(|(idx, _)| *idx);

    let mut summary = BatchSummary::default();
    for (_, outcome) in results {
        match &outcome.result {
            Ok(sheet) => {
                info!(path = %outcome.path.display(), questions = sheet.questions.len(), "document processed");
                summary.succeeded += 1;
            }
            Err(err) => {
                warn!(path = %outcome.path.display(), error = %format!("{:#}", err), "document failed");
                summary.failed += 1;
            }
        }
        summary.outcomes.push(outcome);
    }
    summary
}

async fn process_document(
    path: &Path,
    settings: &Settings,
    options: &BatchOptions,
    chain: &[Box<dyn WordSource>],
) -> Result<QuizSheet> {
    let document = Document::from_path(path)?;
    let extraction = extract_with_chain(&document, settings, chain).await?;
    if extraction.questions.is_empty() {
        let reason = extraction
            .report
            .diagnostic
            .unwrap_or_else(|| "every question was incomplete".to_string());
        return Err(anyhow!("no questions extracted: {}", reason));
    }

    let source = document.display_name().to_string();
    let sheet = QuizSheet {
        title: title_from_name(&source),
        source,
        questions: extraction.questions,
        report: extraction.report,
    };
    if let Some(out_dir) = &options.out_dir {
        write_sheet(out_dir, path, &sheet)?;
    }
    if let Some(processed_dir) = &options.processed_dir {
        move_input(path, processed_dir)?;
    }
    Ok(sheet)
}

pub fn write_sheet(out_dir: &Path, input: &Path, sheet: &QuizSheet) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;
    let stem = input
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("document");
    let target = out_dir.join(format!("{}.json", stem));
    let json = serde_json::to_string_pretty(sheet)?;
    fs::write(&target, json)
        .with_context(|| format!("failed to write output: {}", target.display()))?;
    Ok(target)
}

fn move_input(input: &Path, processed_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(processed_dir).with_context(|| {
        format!(
            "failed to create processed directory: {}",
            processed_dir.display()
        )
    })?;
    let file_name = input
        .file_name()
        .ok_or_else(|| anyhow!("input has no file name: {}", input.display()))?;
    let target = processed_dir.join(file_name);
    if fs::rename(input, &target).is_err() {
        fs::copy(input, &target)
            .with_context(|| format!("failed to copy {} to {}", input.display(), target.display()))?;
        fs::remove_file(input)
            .with_context(|| format!("failed to remove {}", input.display()))?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::extract::{SourceKind, Word, WordsFuture};
    use crate::test_util::{blank_pdf, words_for_line};

    struct CannedSource(Vec<Word>);

    impl WordSource for CannedSource {
        fn kind(&self) -> SourceKind {
            SourceKind::TextLayer
        }

        fn line_tolerance(&self, settings: &Settings) -> f32 {
            settings.line_tolerance_text
        }

        fn extract_words<'a>(
            &'a self,
            _document: &'a Document,
            _settings: &'a Settings,
        ) -> WordsFuture<'a> {
            let words = self.0.clone();
            Box::pin(async move { Ok(words) })
        }
    }

    fn canned_chain() -> Vec<Box<dyn WordSource>> {
        let mut words = Vec::new();
        for (y, text) in [
            (40.0, "1. Which gas do plants absorb?"),
            (54.0, "a) Oxygen"),
            (68.0, "b) Carbon dioxide"),
            (82.0, "c) Nitrogen"),
            (96.0, "d) Helium"),
        ] {
            words.extend(words_for_line(text, 40.0, y, 1));
        }
        words.extend(words_for_line("Answer Key", 40.0, 40.0, 2));
        words.extend(words_for_line("1. B", 40.0, 60.0, 2));
        vec![Box::new(CannedSource(words))]
    }

    #[test]
    fn collects_supported_files_from_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.pdf", "a.PNG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }
        let paths = collect_inputs(&[dir.path().to_path_buf()]).expect("inputs");
        let names = paths
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.PNG", "b.pdf"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(collect_inputs(&[dir.path().join("gone.pdf")]).is_err());
    }

    #[tokio::test]
    async fn failures_are_isolated_and_order_is_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("biology_quiz-1.pdf");
        let bad = dir.path().join("broken.pdf");
        let other = dir.path().join("second.pdf");
        fs::write(&good, blank_pdf(2)).expect("write");
        fs::write(&bad, b"not a document").expect("write");
        fs::write(&other, blank_pdf(2)).expect("write");

        let out_dir = dir.path().join("out");
        let processed = dir.path().join("done");
        let options = BatchOptions {
            out_dir: Some(out_dir.clone()),
            processed_dir: Some(processed.clone()),
        };
        let summary = process_batch(
            vec![good.clone(), bad.clone(), other.clone()],
            &Settings::default(),
            &options,
            &canned_chain(),
        )
        .await;

        assert_eq!((summary.succeeded, summary.failed, summary.total()), (2, 1, 3));
        let order = summary
            .outcomes
            .iter()
            .map(|outcome| outcome.path.clone())
            .collect::<Vec<_>>();
        assert_eq!(order, vec![good.clone(), bad.clone(), other]);
        assert!(summary.outcomes[1].result.is_err());

        let sheet = summary.sheets().next().expect("sheet");
        assert_eq!(sheet.title, "Biology Quiz 1");
        assert_eq!(sheet.questions[0].option_b, "Carbon dioxide");

        assert!(out_dir.join("biology_quiz-1.json").exists());
        assert!(processed.join("biology_quiz-1.pdf").exists());
        assert!(!good.exists());
        assert!(bad.exists());
    }
}
