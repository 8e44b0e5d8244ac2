//! Turns positioned words into lines in human reading order.

pub mod columns;
pub mod lines;
mod text;

use serde::Serialize;

use crate::extract::Word;
use crate::settings::Settings;


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub page: u32,
    pub y: f32,
    pub text: String,
    #[serde(skip)]
    pub words: Vec<Word>,
}

impl Line {
    pub fn left(&self) -> f32 {
        self.words.first().map(|word| word.x).unwrap_or(0.0)
    }

    pub fn right(&self) -> f32 {
        self.words
            .iter()
            .map(Word::right)
            .fold(0.0, f32::max)
    }

    pub fn page_width(&self) -> f32 {
        self.words.first().map(|word| word.page_width).unwrap_or(0.0)
    }
}

/// Groups words into lines with `tolerance` and orders them page by page,
/// left column before right column.
pub fn reading_order(words: Vec<Word>, tolerance: f32, settings: &Settings) -> Vec<Line> {
    let grouped = lines::group_lines(words, tolerance, settings.gutter_gap);
    columns::split_columns(grouped, settings.column_split_margin)
}
