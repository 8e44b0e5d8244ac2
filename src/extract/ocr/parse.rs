use anyhow::{Result, anyhow};
use std::collections::HashMap;

use crate::extract::Word;

/// Reads word rows (`level == 5`) out of tesseract TSV output covering one
/// or more pages. TSV `page_num` n is the n-th entry of `page_numbers`; each
/// page row (`level == 1`) supplies that page's width in pixels.
pub(super) fn parse_tsv_words(
    tsv: &str,
    page_numbers: &[u32],
    min_confidence: f32,
) -> Result<Vec<Word>> {
    let mut widths: HashMap<u32, f32> = HashMap::new();
    let mut words = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 11 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        let tsv_page: usize = cols[1].parse().unwrap_or(0);
        let left: f32 = cols[6].parse().unwrap_or(0.0);
        let top: f32 = cols[7].parse().unwrap_or(0.0);
        let width: f32 = cols[8].parse().unwrap_or(0.0);
        let height: f32 = cols[9].parse().unwrap_or(0.0);
        if level != 1 && level != 5 {
            continue;
        }
        let page = tsv_page
            .checked_sub(1)
            .and_then(|slot| page_numbers.get(slot))
            .copied()
            .ok_or_else(|| {
                anyhow!(
                    "tesseract reported page {} for {} submitted pages",
                    cols[1],
                    page_numbers.len()
                )
            })?;
        if level == 1 {
            widths.insert(page, width);
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols.get(11).map(|value| value.trim()).unwrap_or("");
        if !should_keep_word(text, conf, width, min_confidence) {
            continue;
        }
        words.push(Word {
            text: text.to_string(),
            x: left,
            y: top,
            width,
            height,
            page,
            page_width: 0.0,
        });
    }

    for word in &mut words {
        word.page_width = widths.get(&word.page).copied().unwrap_or(0.0);
    }
    Ok(words)
}

fn should_keep_word(text: &str, conf: f32, width: f32, min_confidence: f32) -> bool {
    if text.is_empty() || conf < 0.0 || width <= 0.0 {
        return false;
    }
    if conf < min_confidence {
        return false;
    }
    if conf < 40.0 && !text.chars().any(|ch| ch.is_alphanumeric()) {
        return false;
    }
    true
}
