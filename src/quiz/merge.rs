use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::IncompleteQuestion;

use super::answer_key::AnswerKey;
use super::{FinalQuestion, QuestionDraft};

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub questions: Vec<FinalQuestion>,
    pub dropped_missing_key: usize,
    pub dropped_missing_option: usize,
    /// Numbers emitted more than once, ascending.
    pub duplicate_numbers: Vec<u32>,
}

impl MergeOutcome {
    fn record(&mut self, reason: IncompleteQuestion) {
        match reason {
            IncompleteQuestion::MissingKeyEntry => self.dropped_missing_key += 1,
            IncompleteQuestion::MissingOption => self.dropped_missing_option += 1,
        }
    }
}

pub fn finalize(draft: QuestionDraft, key: &AnswerKey) -> Result<FinalQuestion, IncompleteQuestion> {
    let correct_answer = *key
        .get(&draft.number)
        .ok_or(IncompleteQuestion::MissingKeyEntry)?;
    let [option_a, option_b, option_c, option_d] = draft
        .options
        .complete()
        .ok_or(IncompleteQuestion::MissingOption)?;
    Ok(FinalQuestion {
        number: draft.number,
        stem: draft.stem,
        option_a,
        option_b,
        option_c,
        option_d,
        correct_answer,
    })
}

/// Joins drafts with the key in draft order. Drafts without a key entry or
/// with any of options A-D missing are dropped and counted.
pub fn merge(drafts: Vec<QuestionDraft>, key: &AnswerKey) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    for draft in drafts {
        let number = draft.number;
        match finalize(draft, key) {
            Ok(question) => outcome.questions.push(question),
            Err(reason) => {
                debug!(number, ?reason, "question dropped");
                outcome.record(reason);
            }
        }
    }

    let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
    for question in &outcome.questions {
        *seen.entry(question.number).or_default() += 1;
    }
    outcome.duplicate_numbers = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(number, _)| number)
        .collect();
    if !outcome.duplicate_numbers.is_empty() {
        warn!(numbers = ?outcome.duplicate_numbers, "duplicate question numbers kept");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{AnswerLetter, OptionLabel};

    fn draft(number: u32, options: &[&str]) -> QuestionDraft {
        let mut draft = QuestionDraft::new(number, &format!("Question {number}"));
        let letters = [AnswerLetter::A, AnswerLetter::B, AnswerLetter::C, AnswerLetter::D];
        for (letter, text) in letters.into_iter().zip(options) {
            *draft.options.slot_mut(letter) = Some(text.to_string());
            draft.last_option = Some(OptionLabel::Slot(letter));
        }
        draft
    }

    #[test]
    fn complete_keyed_drafts_are_emitted_in_order() {
        let key = AnswerKey::from([(2, AnswerLetter::C), (1, AnswerLetter::A)]);
        let outcome = merge(
            vec![draft(1, &["a", "b", "c", "d"]), draft(2, &["e", "f", "g", "h"])],
            &key,
        );
        let got = outcome
            .questions
            .iter()
            .map(|q| (q.number, q.correct_answer))
            .collect::<Vec<_>>();
        assert_eq!(got, vec![(1, AnswerLetter::A), (2, AnswerLetter::C)]);
        assert_eq!(outcome.questions[1].option_d, "h");
    }

    #[test]
    fn incomplete_drafts_are_counted_by_reason() {
        let key = AnswerKey::from([(1, AnswerLetter::A), (2, AnswerLetter::B)]);
        let outcome = merge(
            vec![
                draft(1, &["a", "b", "c"]),
                draft(2, &["a", "b", "c", "d"]),
                draft(3, &["a", "b", "c", "d"]),
            ],
            &key,
        );
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].number, 2);
        assert_eq!(outcome.dropped_missing_option, 1);
        assert_eq!(outcome.dropped_missing_key, 1);
    }

    #[test]
    fn duplicate_numbers_are_kept_and_flagged() {
        let key = AnswerKey::from([(4, AnswerLetter::D)]);
        let outcome = merge(
            vec![draft(4, &["a", "b", "c", "d"]), draft(4, &["w", "x", "y", "z"])],
            &key,
        );
        assert_eq!(outcome.questions.len(), 2);
        assert_eq!(outcome.duplicate_numbers, vec![4]);
    }
}
