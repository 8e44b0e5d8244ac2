use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

use crate::layout::Line;

use super::AnswerLetter;

/// Question number to keyed letter. A later pair for the same number
/// replaces the earlier one.
pub type AnswerKey = BTreeMap<u32, AnswerLetter>;

/// Longer lines mentioning an answer key are prose or titles, not headers.
const MAX_HEADER_WORDS: usize = 8;

static KEY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\banswer[\s\-_]*keys?\b").expect("key header pattern compiles")
});
static KEY_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,3})\s*[.)\-:]?\s*([A-Da-d])").expect("key pair pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySignal {
    Header,
    DenseRow,
}

/// Where the answer key begins: an index into the reading-order lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeyStart {
    #[serde(skip)]
    pub index: usize,
    pub page: u32,
    pub y: f32,
    pub signal: KeySignal,
}

pub fn is_key_header(text: &str) -> bool {
    text.split_whitespace().count() <= MAX_HEADER_WORDS && KEY_HEADER.is_match(text)
}

/// Every `<number><delimiter?><letter>` pair in `text`. The letter must not
/// run into another letter and the number must not be the tail of a longer
/// number.
pub fn key_pairs(text: &str) -> Vec<(u32, AnswerLetter)> {
    KEY_PAIR
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let preceded_by_digit = text[..whole.start()]
                .chars()
                .next_back()
                .is_some_and(|ch| ch.is_ascii_digit());
            let followed_by_letter = text[whole.end()..]
                .chars()
                .next()
                .is_some_and(char::is_alphabetic);
            if preceded_by_digit || followed_by_letter {
                return None;
            }
            let number = caps[1].parse::<u32>().ok()?;
            let letter = caps[2].chars().next().and_then(AnswerLetter::from_char)?;
            Some((number, letter))
        })
        .collect()
}

/// Finds the first header line in reading order; without one, the first
/// line carrying at least `density_threshold` key pairs.
pub fn locate_answer_key(lines: &[Line], density_threshold: usize) -> Option<KeyStart> {
    let start = |index: usize, signal: KeySignal| {
        let line = &lines[index];
        KeyStart {
            index,
            page: line.page,
            y: line.y,
            signal,
        }
    };
    if let Some(index) = lines.iter().position(|line| is_key_header(&line.text)) {
        return Some(start(index, KeySignal::Header));
    }
    let threshold = density_threshold.max(1);
    lines
        .iter()
        .position(|line| key_pairs(&line.text).len() >= threshold)
        .map(|index| start(index, KeySignal::DenseRow))
}

/// Collects pairs from the located line onward, through the start page and
/// the page after it.
///
/// Lines on the start page above the located line are not scanned: they are
/// usually the tail of the question body. For a header-less key this also
/// drops sparse key rows printed above the first dense row.
pub fn parse_answer_key(lines: &[Line], start: &KeyStart) -> AnswerKey {
    let mut key = AnswerKey::new();
    let region = lines
        .iter()
        .skip(start.index)
        .take_while(|line| line.page <= start.page + 1);
    for line in region {
        for (number, letter) in key_pairs(&line.text) {
            if let Some(previous) = key.insert(number, letter) {
                if previous != letter {
                    debug!(number, ?previous, ?letter, "key entry overwritten");
                }
            }
        }
    }
    key
}
