use std::collections::BTreeMap;

use crate::extract::Word;

use super::Line;
use super::text::normalize_line_text;

struct Cluster {
    reference_y: f32,
    words: Vec<Word>,
}

/// Clusters words into lines page by page. A word joins the nearest line
/// whose reference y is within `tolerance`, otherwise it opens a new line.
/// Lines are returned in (page, y) order.
pub fn group_lines(words: Vec<Word>, tolerance: f32, gutter_gap: f32) -> Vec<Line> {
    let mut pages: BTreeMap<u32, Vec<Word>> = BTreeMap::new();
    for word in words {
        pages.entry(word.page).or_default().push(word);
    }

    let mut lines = Vec::new();
    for (page, mut page_words) in pages {
        page_words.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

        let mut clusters: Vec<Cluster> = Vec::new();
        for word in page_words {
            let nearest = clusters
                .iter_mut()
                .filter(|cluster| (word.y - cluster.reference_y).abs() <= tolerance)
                .min_by(|a, b| {
                    (word.y - a.reference_y)
                        .abs()
                        .total_cmp(&(word.y - b.reference_y).abs())
                });
            match nearest {
                Some(cluster) => cluster.words.push(word),
                None => clusters.push(Cluster {
                    reference_y: word.y,
                    words: vec![word],
                }),
            }
        }

        for cluster in clusters {
            let mut cluster_words = cluster.words;
            cluster_words.sort_by(|a, b| a.x.total_cmp(&b.x));
            for segment in split_at_gutter(cluster_words, gutter_gap) {
                if let Some(line) = build_line(page, cluster.reference_y, segment) {
                    lines.push(line);
                }
            }
        }
    }

    lines.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.y.total_cmp(&b.y))
            .then(a.left().total_cmp(&b.left()))
    });
    lines
}

/// Fraction of the median word height a gutter must always exceed, so rows
/// of touching glyphs never split on a tiny absolute gap.
const MIN_GUTTER_HEIGHTS: f32 = 0.75;

/// Splits a row at the gap that straddles the page midpoint when that gap
/// is wider than `gutter_gap` times the row's median inter-word gap (and
/// wider than `MIN_GUTTER_HEIGHTS` median word heights): the two halves
/// belong to different columns. Rows without such a gap are kept whole.
fn split_at_gutter(words: Vec<Word>, gutter_gap: f32) -> Vec<Vec<Word>> {
    let Some(first) = words.first() else {
        return Vec::new();
    };
    let midpoint = first.page_width / 2.0;
    if midpoint <= 0.0 || words.len() < 2 {
        return vec![words];
    }
    let Some(idx) = words
        .windows(2)
        .position(|pair| pair[0].right() < midpoint && pair[1].x > midpoint)
    else {
        return vec![words];
    };

    let gaps = words
        .windows(2)
        .map(|pair| (pair[1].x - pair[0].right()).max(0.0))
        .collect::<Vec<_>>();
    let spacing = gaps
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, gap)| *gap)
        .collect::<Vec<_>>();
    let heights = words.iter().map(|word| word.height).collect::<Vec<_>>();
    let floor = median(heights).unwrap_or(0.0).max(1.0) * MIN_GUTTER_HEIGHTS;
    let threshold = match median(spacing) {
        Some(spacing) => (spacing * gutter_gap).max(floor),
        None => floor,
    };
    if gaps[idx] <= threshold {
        return vec![words];
    }

    let mut left = words;
    let right = left.split_off(idx + 1);
    vec![left, right]
}

fn median(mut values: Vec<f32>) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

fn build_line(page: u32, y: f32, words: Vec<Word>) -> Option<Line> {
    let text = normalize_line_text(&words);
    if text.is_empty() {
        return None;
    }
    Some(Line {
        page,
        y,
        text,
        words,
    })
}
