//! Question sheet structure: question drafts, the answer key, and the merge
//! of the two into final questions.

pub mod answer_key;
pub mod merge;
pub mod questions;

use serde::Serialize;

/// A correct-answer label. Only A to D are ever keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_uppercase() {
            'A' => Some(AnswerLetter::A),
            'B' => Some(AnswerLetter::B),
            'C' => Some(AnswerLetter::C),
            'D' => Some(AnswerLetter::D),
            _ => None,
        }
    }
}

/// Option label as it appears on the sheet. `E` is recognized so that its
/// text does not leak into option D, but it has no slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionLabel {
    Slot(AnswerLetter),
    E,
}

impl OptionLabel {
    pub fn from_char(ch: char) -> Option<Self> {
        if ch.eq_ignore_ascii_case(&'e') {
            return Some(OptionLabel::E);
        }
        AnswerLetter::from_char(ch).map(OptionLabel::Slot)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSlots {
    pub a: Option<String>,
    pub b: Option<String>,
    pub c: Option<String>,
    pub d: Option<String>,
}

impl OptionSlots {
    pub fn slot_mut(&mut self, letter: AnswerLetter) -> &mut Option<String> {
        match letter {
            AnswerLetter::A => &mut self.a,
            AnswerLetter::B => &mut self.b,
            AnswerLetter::C => &mut self.c,
            AnswerLetter::D => &mut self.d,
        }
    }

    /// All four option texts, or `None` if any is missing or blank.
    pub fn complete(&self) -> Option<[String; 4]> {
        let filled = |slot: &Option<String>| {
            slot.as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };
        Some([
            filled(&self.a)?,
            filled(&self.b)?,
            filled(&self.c)?,
            filled(&self.d)?,
        ])
    }
}

/// A question as read off the sheet, before validation against the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub number: u32,
    pub stem: String,
    pub options: OptionSlots,
    pub(crate) last_option: Option<OptionLabel>,
}

impl QuestionDraft {
    pub fn new(number: u32, stem: &str) -> Self {
        Self {
            number,
            stem: stem.trim().to_string(),
            options: OptionSlots::default(),
            last_option: None,
        }
    }

    pub fn has_options(&self) -> bool {
        self.last_option.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalQuestion {
    pub number: u32,
    pub stem: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerLetter,
}

pub(crate) fn append_text(target: &mut String, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}
