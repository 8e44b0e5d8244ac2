use crate::extract::Word;

const SEPARATOR_GLYPHS: &[char] = &['|', '¦', '│', '｜'];
const TRIMMED: &[char] = &[':', ';', ',', '|', '¦', '│', '｜', '•', '·', '_', '~'];

/// Joins line words with single spaces, dropping isolated separator glyphs
/// and trimming stray separators from both ends.
pub(super) fn normalize_line_text(words: &[Word]) -> String {
    let joined = words
        .iter()
        .map(|word| word.text.trim())
        .filter(|text| !is_separator_token(text))
        .collect::<Vec<_>>()
        .join(" ");
    normalize_text(&joined)
}

fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|ch: char| ch.is_whitespace() || TRIMMED.contains(&ch))
        .to_string()
}

fn is_separator_token(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| SEPARATOR_GLYPHS.contains(&ch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::word;

    #[test]
    fn drops_bars_and_trims_colons() {
        let words = vec![
            word("|", 10.0, 10.0, 1),
            word("Answer", 20.0, 10.0, 1),
            word("Key:", 70.0, 10.0, 1),
            word("||", 110.0, 10.0, 1),
        ];
        assert_eq!(normalize_line_text(&words), "Answer Key");
    }

    #[test]
    fn collapses_inner_whitespace() {
        assert_eq!(normalize_text("  a.\t Paris   France ,"), "a. Paris France");
    }

    #[test]
    fn keeps_question_marks_and_periods() {
        assert_eq!(normalize_text("1. What is 2+2?"), "1. What is 2+2?");
    }
}
