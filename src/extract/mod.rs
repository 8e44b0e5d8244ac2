use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::document::Document;
use crate::error::PipelineError;
use crate::settings::Settings;

pub mod ocr;
pub mod text_layer;

pub use ocr::OcrSource;
pub use text_layer::TextLayerSource;

/// A recognized token. Coordinates are top-left origin in the unit of the
/// source that produced it (points for the text layer, pixels for OCR).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub page: u32,
    pub page_width: f32,
}

impl Word {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    TextLayer,
    Ocr,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::TextLayer => "text-layer",
            SourceKind::Ocr => "ocr",
        }
    }
}

pub type WordsFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Word>, PipelineError>> + Send + 'a>>;

pub trait WordSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Vertical clustering tolerance for words produced by this source.
    fn line_tolerance(&self, settings: &Settings) -> f32;

    fn extract_words<'a>(&'a self, document: &'a Document, settings: &'a Settings)
    -> WordsFuture<'a>;
}

/// Sorts into (page, y, x) so that downstream stages never depend on the
/// order extraction workers finished in.
pub(crate) fn sort_words(words: &mut [Word]) {
    words.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.y.total_cmp(&b.y))
            .then(a.x.total_cmp(&b.x))
    });
}

pub fn default_chain(force_ocr: bool) -> Vec<Box<dyn WordSource>> {
    let mut chain: Vec<Box<dyn WordSource>> = Vec::new();
    if !force_ocr {
        chain.push(Box::new(TextLayerSource));
    }
    chain.push(Box::new(OcrSource));
    chain
}
