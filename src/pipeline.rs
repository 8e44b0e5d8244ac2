use serde::Serialize;
use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::PipelineError;
use crate::extract::{SourceKind, Word, WordSource, default_chain};
use crate::layout;
use crate::quiz::FinalQuestion;
use crate::quiz::answer_key::{self, AnswerKey, KeyStart};
use crate::quiz::merge;
use crate::quiz::questions::{self, ParsedQuestions};
use crate::settings::Settings;

#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub questions: Vec<FinalQuestion>,
    pub report: ExtractionReport,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub source: Option<SourceKind>,
    pub attempted: Vec<SourceKind>,
    pub fingerprint: String,
    pub page_count: u32,
    pub key_start: Option<KeyStart>,
    pub key_entries: usize,
    pub drafts: usize,
    pub rejected_drafts: usize,
    pub dropped_missing_key: usize,
    pub dropped_missing_option: usize,
    pub duplicate_numbers: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ExtractionReport {
    fn for_document(document: &Document) -> Self {
        Self {
            fingerprint: document.fingerprint().to_string(),
            page_count: document.page_count(),
            ..Self::default()
        }
    }
}

/// Question drafts and key recognized from one set of words.
#[derive(Debug)]
pub struct Structure {
    pub start: KeyStart,
    pub parsed: ParsedQuestions,
    pub key: AnswerKey,
}

/// Layout, key location and parsing over one word set. `None` when no key
/// start can be found.
pub fn recognize_structure(
    words: Vec<Word>,
    tolerance: f32,
    settings: &Settings,
) -> Option<Structure> {
    let lines = layout::reading_order(words, tolerance, settings);
    debug!(lines = lines.len(), "reading order built");
    let start = answer_key::locate_answer_key(&lines, settings.key_pair_density_threshold)?;
    debug!(page = start.page, y = start.y, signal = ?start.signal, "answer key located");
    let parsed = questions::parse_questions(lines.iter().filter(|line| line.page < start.page));
    let key = answer_key::parse_answer_key(&lines, &start);
    Some(Structure { start, parsed, key })
}

/// Extracts questions with the default source chain. Only an unreadable
/// document is an error; every other failure yields an empty result with a
/// diagnostic in the report.
pub async fn extract_questions(
    document: &Document,
    settings: &Settings,
    force_ocr: bool,
) -> Result<Extraction, PipelineError> {
    extract_with_chain(document, settings, &default_chain(force_ocr)).await
}

pub async fn extract_with_chain(
    document: &Document,
    settings: &Settings,
    chain: &[Box<dyn WordSource>],
) -> Result<Extraction, PipelineError> {
    let mut report = ExtractionReport::for_document(document);
    let mut failure: Option<PipelineError> = None;

    for source in chain {
        let kind = source.kind();
        report.attempted.push(kind);
        let words = match source.extract_words(document, settings).await {
            Ok(words) => words,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(name = document.display_name(), source = kind.as_str(), error = %err, "word source failed");
                failure = Some(err);
                continue;
            }
        };
        failure = None;
        if words.is_empty() {
            debug!(source = kind.as_str(), "no words");
            continue;
        }
        let tolerance = source.line_tolerance(settings);
        match recognize_structure(words, tolerance, settings) {
            Some(structure) => {
                report.source = Some(kind);
                let questions = finish(structure, &mut report);
                info!(
                    name = document.display_name(),
                    source = kind.as_str(),
                    questions = questions.len(),
                    "extraction finished"
                );
                return Ok(Extraction { questions, report });
            }
            None => {
                debug!(source = kind.as_str(), "no answer key structure");
            }
        }
    }

    let diagnostic = failure
        .unwrap_or(PipelineError::StructureNotFound)
        .to_string();
    warn!(name = document.display_name(), diagnostic = %diagnostic, "no questions extracted");
    report.diagnostic = Some(diagnostic);
    Ok(Extraction {
        questions: Vec::new(),
        report,
    })
}

fn finish(structure: Structure, report: &mut ExtractionReport) -> Vec<FinalQuestion> {
    let Structure { start, parsed, key } = structure;
    report.key_start = Some(start);
    report.key_entries = key.len();
    report.drafts = parsed.drafts.len();
    report.rejected_drafts = parsed.rejected;

    let outcome = merge::merge(parsed.drafts, &key);
    report.dropped_missing_key = outcome.dropped_missing_key;
    report.dropped_missing_option = outcome.dropped_missing_option;
    report.duplicate_numbers = outcome.duplicate_numbers;
    outcome.questions
}
