use std::collections::BTreeMap;

use super::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
    /// Crosses the gutter band; read with the left column.
    Full,
}

/// Places a line in the left or right column by where its leftmost word
/// starts, or marks it full-width when it runs through the band of
/// `margin * page_width` around the midpoint.
pub fn classify(line: &Line, margin: f32) -> Column {
    let page_width = line.page_width();
    if page_width <= 0.0 {
        return Column::Left;
    }
    let midpoint = page_width / 2.0;
    let band = margin * page_width;
    if line.left() > midpoint {
        Column::Right
    } else if line.left() < midpoint - band && line.right() > midpoint + band {
        Column::Full
    } else {
        Column::Left
    }
}

/// Reorders y-sorted lines so that each page reads its left column (full
/// width lines included) top to bottom before its right column.
pub fn split_columns(lines: Vec<Line>, margin: f32) -> Vec<Line> {
    let mut pages: BTreeMap<u32, (Vec<Line>, Vec<Line>)> = BTreeMap::new();
    for line in lines {
        let column = classify(&line, margin);
        let (left, right) = pages.entry(line.page).or_default();
        match column {
            Column::Right => right.push(line),
            Column::Left | Column::Full => left.push(line),
        }
    }
    pages
        .into_values()
        .flat_map(|(left, right)| left.into_iter().chain(right))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::lines::group_lines;
    use crate::test_util::words_for_line;

    fn lines_of(rows: &[(&str, f32, f32, u32)]) -> Vec<Line> {
        let words = rows
            .iter()
            .flat_map(|(text, x, y, page)| words_for_line(text, *x, *y, *page))
            .collect();
        group_lines(words, 3.0, 2.5)
    }

    #[test]
    fn classifies_by_leftmost_word() {
        let lines = lines_of(&[
            ("left side", 40.0, 10.0, 1),
            ("right side", 330.0, 30.0, 1),
            (
                "a heading that runs straight across the whole page width here",
                40.0,
                50.0,
                1,
            ),
        ]);
        let columns = lines.iter().map(|line| classify(line, 0.08)).collect::<Vec<_>>();
        assert_eq!(columns, vec![Column::Left, Column::Right, Column::Full]);
    }

    #[test]
    fn reads_left_column_before_right_per_page() {
        let lines = lines_of(&[
            ("1. one", 40.0, 100.0, 1),
            ("3. three", 330.0, 100.0, 1),
            ("2. two", 40.0, 120.0, 1),
            ("4. four", 330.0, 120.0, 1),
            ("5. five", 40.0, 100.0, 2),
            ("6. six", 330.0, 100.0, 2),
        ]);
        let ordered = split_columns(lines, 0.08);
        let texts = ordered.iter().map(|line| line.text.as_str()).collect::<Vec<_>>();
        assert_eq!(
            texts,
            vec!["1. one", "2. two", "3. three", "4. four", "5. five", "6. six"]
        );
    }

    #[test]
    fn zero_width_pages_stay_in_one_column() {
        let mut lines = lines_of(&[("only", 400.0, 10.0, 1)]);
        for line in &mut lines {
            for word in &mut line.words {
                word.page_width = 0.0;
            }
        }
        assert_eq!(classify(&lines[0], 0.08), Column::Left);
    }
}
