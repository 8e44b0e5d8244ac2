use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::layout::Line;

use super::{OptionLabel, QuestionDraft, append_text};

static QUESTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s*[.)\-]\s*(.*)$").expect("question pattern compiles")
});
static OPTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\(?([A-Ea-e])\s*[.)\-]\s*(.*)$").expect("option pattern compiles")
});

#[derive(Debug, Default)]
pub struct ParsedQuestions {
    pub drafts: Vec<QuestionDraft>,
    /// Drafts that never captured an option.
    pub rejected: usize,
}

#[derive(Debug, Default)]
struct ScanState {
    live: Option<QuestionDraft>,
    parsed: ParsedQuestions,
}

impl ScanState {
    fn finalize_live(&mut self) {
        let Some(draft) = self.live.take() else {
            return;
        };
        if draft.has_options() {
            self.parsed.drafts.push(draft);
        } else {
            debug!(number = draft.number, "draft without options dropped");
            self.parsed.rejected += 1;
        }
    }

    fn step(mut self, line: &Line) -> Self {
        if let Some(caps) = QUESTION_LINE.captures(&line.text) {
            if let Ok(number) = caps[1].parse::<u32>() {
                self.finalize_live();
                self.live = Some(QuestionDraft::new(number, &caps[2]));
                return self;
            }
        }
        let Some(draft) = self.live.as_mut() else {
            return self;
        };
        let option = OPTION_LINE.captures(&line.text).and_then(|caps| {
            let label = caps[1].chars().next().and_then(OptionLabel::from_char)?;
            Some((label, caps[2].to_string()))
        });
        match option {
            Some((label, text)) => open_option(draft, label, &text),
            None => match draft.last_option {
                None => append_text(&mut draft.stem, &line.text),
                Some(label) => continue_option(draft, label, &line.text),
            },
        }
        self
    }

    fn finish(mut self) -> ParsedQuestions {
        self.finalize_live();
        self.parsed
    }
}

fn open_option(draft: &mut QuestionDraft, label: OptionLabel, text: &str) {
    draft.last_option = Some(label);
    continue_option(draft, label, text);
}

fn continue_option(draft: &mut QuestionDraft, label: OptionLabel, text: &str) {
    if let OptionLabel::Slot(letter) = label {
        let slot = draft.options.slot_mut(letter);
        append_text(slot.get_or_insert_with(String::new), text);
    }
}

/// Scans body lines in reading order into question drafts. Lines before the
/// first numbered line are ignored; drafts without any option are rejected.
pub fn parse_questions<'a>(lines: impl IntoIterator<Item = &'a Line>) -> ParsedQuestions {
    lines
        .into_iter()
        .fold(ScanState::default(), ScanState::step)
        .finish()
}
