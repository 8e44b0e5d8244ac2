use anyhow::{Context, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::ffi::OsStr;
use std::fs;
use tracing::{debug, info, warn};

use crate::document::{Document, DocumentKind};
use crate::error::PipelineError;
use crate::settings::Settings;
use crate::tools::{command_exists, run_tool};

use super::{SourceKind, Word, WordSource, WordsFuture, sort_words};

/// Words from the embedded text layer via poppler's `pdftotext -bbox`.
///
/// Never fails: a missing or unreadable text layer is an ordinary outcome
/// and yields no words, which sends the orchestrator on to OCR.
pub struct TextLayerSource;

impl WordSource for TextLayerSource {
    fn kind(&self) -> SourceKind {
        SourceKind::TextLayer
    }

    fn line_tolerance(&self, settings: &Settings) -> f32 {
        settings.line_tolerance_text
    }

    fn extract_words<'a>(
        &'a self,
        document: &'a Document,
        _settings: &'a Settings,
    ) -> WordsFuture<'a> {
        Box::pin(async move {
            if document.kind() != DocumentKind::Pdf {
                debug!(name = document.display_name(), "no text layer for image input");
                return Ok(Vec::new());
            }
            if document.is_protected() {
                info!(
                    name = document.display_name(),
                    "{}, falling back",
                    PipelineError::DocumentProtected
                );
                return Ok(Vec::new());
            }
            let bytes = document.bytes().to_vec();
            let result = tokio::task::spawn_blocking(move || read_text_layer(&bytes)).await;
            let words = match result {
                Ok(Ok(words)) => words,
                Ok(Err(err)) => {
                    let message = err.to_string();
                    if message.to_lowercase().contains("password") {
                        info!(
                            name = document.display_name(),
                            "{}, falling back",
                            PipelineError::DocumentProtected
                        );
                    } else {
                        warn!(name = document.display_name(), error = %message, "text layer unavailable");
                    }
                    Vec::new()
                }
                Err(err) => {
                    warn!(name = document.display_name(), error = %err, "text layer task failed");
                    Vec::new()
                }
            };
            debug!(name = document.display_name(), words = words.len(), "text layer read");
            Ok(words)
        })
    }
}

fn read_text_layer(pdf_bytes: &[u8]) -> Result<Vec<Word>> {
    if !command_exists("pdftotext") {
        return Err(anyhow!("pdftotext not found (install poppler-utils)"));
    }
    let dir = tempfile::tempdir().with_context(|| "failed to create temp dir for pdf")?;
    let input_path = dir.path().join("input.pdf");
    fs::write(&input_path, pdf_bytes).with_context(|| "failed to write temp pdf")?;

    let stdout = run_tool(
        "pdftotext",
        [
            OsStr::new("-bbox"),
            OsStr::new("-enc"),
            OsStr::new("UTF-8"),
            input_path.as_os_str(),
            OsStr::new("-"),
        ],
    )?;
    let xhtml = String::from_utf8_lossy(&stdout);
    parse_bbox_xhtml(&xhtml)
}

/// Parses `pdftotext -bbox` output: `<page width=..>` elements holding
/// `<word xMin yMin xMax yMax>` elements, pages numbered in document order.
pub(crate) fn parse_bbox_xhtml(xhtml: &str) -> Result<Vec<Word>> {
    let mut reader = Reader::from_str(xhtml);
    reader.trim_text(true);

    let mut words = Vec::new();
    let mut page = 0u32;
    let mut page_width = 0f32;
    let mut open_word: Option<(f32, f32, f32, f32)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    page += 1;
                    page_width = attr_f32(&e, b"width").unwrap_or(0.0);
                }
                b"word" => {
                    let bounds = (
                        attr_f32(&e, b"xMin"),
                        attr_f32(&e, b"yMin"),
                        attr_f32(&e, b"xMax"),
                        attr_f32(&e, b"yMax"),
                    );
                    open_word = match bounds {
                        (Some(x1), Some(y1), Some(x2), Some(y2)) => Some((x1, y1, x2, y2)),
                        _ => None,
                    };
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if open_word.is_some() {
                    let value = match e.unescape() {
                        Ok(value) => value.into_owned(),
                        Err(_) => String::from_utf8_lossy(&e).into_owned(),
                    };
                    text.push_str(&value);
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"word" {
                    if let Some((x1, y1, x2, y2)) = open_word.take() {
                        let value = text.trim();
                        if !value.is_empty() && page > 0 {
                            words.push(Word {
                                text: value.to_string(),
                                x: x1,
                                y: y1,
                                width: (x2 - x1).max(0.0),
                                height: (y2 - y1).max(0.0),
                                page,
                                page_width,
                            });
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse pdftotext output: {}", err)),
        }
    }

    sort_words(&mut words);
    Ok(words)
}

fn attr_f32(e: &BytesStart<'_>, name: &[u8]) -> Option<f32> {
    e.attributes()
        .filter_map(|attr| attr.ok())
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| {
            std::str::from_utf8(&attr.value)
                .ok()
                .and_then(|value| value.trim().parse::<f32>().ok())
        })
}
