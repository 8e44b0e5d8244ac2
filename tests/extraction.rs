use lopdf::{Object, Stream, dictionary};
use quiz_sheet_extract::{
    Document, PipelineError, Settings, SourceKind, Word, WordSource, WordsFuture,
    extract_with_chain,
};

fn blank_pdf(pages: u32) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn line_words(text: &str, x: f32, y: f32, page: u32) -> Vec<Word> {
    let mut cursor = x;
    text.split_whitespace()
        .map(|token| {
            let width = token.chars().count() as f32 * 6.0;
            let word = Word {
                text: token.to_string(),
                x: cursor,
                y,
                width,
                height: 10.0,
                page,
                page_width: 612.0,
            };
            cursor += width + 4.0;
            word
        })
        .collect()
}

struct ScriptedSource {
    kind: SourceKind,
    words: Vec<Word>,
}

impl WordSource for ScriptedSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn line_tolerance(&self, settings: &Settings) -> f32 {
        match self.kind {
            SourceKind::TextLayer => settings.line_tolerance_text,
            SourceKind::Ocr => settings.line_tolerance_ocr,
        }
    }

    fn extract_words<'a>(
        &'a self,
        _document: &'a Document,
        _settings: &'a Settings,
    ) -> WordsFuture<'a> {
        let words = self.words.clone();
        Box::pin(async move { Ok::<_, PipelineError>(words) })
    }
}

/// Page 1 in two columns (questions 1-2 left, 3-4 right), key on page 2.
/// Tokens are handed over in reverse so that nothing depends on raw order.
fn two_column_sheet() -> Vec<Word> {
    let left = [
        [
            "1. Which planet is largest?",
            "a) Mars",
            "b) Jupiter",
            "c) Venus",
            "d) Earth",
        ],
        [
            "2. What is H2O?",
            "a) Water",
            "b) Salt",
            "c) Sand",
            "d) Iron",
        ],
    ];
    let right = [
        [
            "3. How many legs does a spider have?",
            "a) Six",
            "b) Four",
            "c) Eight",
            "d) Ten",
        ],
        [
            "4. Which gas do we exhale?",
            "a) Helium",
            "b) Argon",
            "c) Neon",
            "d) Carbon dioxide",
        ],
    ];
    let mut words = Vec::new();
    for (block, (left_rows, right_rows)) in left.iter().zip(right.iter()).enumerate() {
        for (row, (left_text, right_text)) in left_rows.iter().zip(right_rows.iter()).enumerate() {
            let y = 40.0 + (block * 5 + row) as f32 * 14.0;
            words.extend(line_words(left_text, 40.0, y, 1));
            words.extend(line_words(right_text, 330.0, y, 1));
        }
    }
    words.extend(line_words("ANSWER KEY", 40.0, 40.0, 2));
    words.extend(line_words("1. B 2. A 3. C 4. D", 40.0, 60.0, 2));
    words.reverse();
    words
}

#[tokio::test]
async fn two_column_sheet_snapshot() {
    let document = Document::from_bytes(blank_pdf(2), Some("science-quiz.pdf")).unwrap();
    let chain: Vec<Box<dyn WordSource>> = vec![Box::new(ScriptedSource {
        kind: SourceKind::TextLayer,
        words: two_column_sheet(),
    })];
    let extraction = extract_with_chain(&document, &Settings::default(), &chain)
        .await
        .unwrap();

    assert_eq!(extraction.report.source, Some(SourceKind::TextLayer));
    assert_eq!(extraction.report.page_count, 2);
    assert_eq!(extraction.report.key_entries, 4);
    insta::assert_json_snapshot!(extraction.questions, @r###"
    [
      {
        "number": 1,
        "stem": "Which planet is largest?",
        "optionA": "Mars",
        "optionB": "Jupiter",
        "optionC": "Venus",
        "optionD": "Earth",
        "correctAnswer": "B"
      },
      {
        "number": 2,
        "stem": "What is H2O?",
        "optionA": "Water",
        "optionB": "Salt",
        "optionC": "Sand",
        "optionD": "Iron",
        "correctAnswer": "A"
      },
      {
        "number": 3,
        "stem": "How many legs does a spider have?",
        "optionA": "Six",
        "optionB": "Four",
        "optionC": "Eight",
        "optionD": "Ten",
        "correctAnswer": "C"
      },
      {
        "number": 4,
        "stem": "Which gas do we exhale?",
        "optionA": "Helium",
        "optionB": "Argon",
        "optionC": "Neon",
        "optionD": "Carbon dioxide",
        "correctAnswer": "D"
      }
    ]
    "###);
}

#[tokio::test]
async fn ocr_fallback_uses_its_own_tolerance() {
    let document = Document::from_bytes(blank_pdf(2), Some("scan.pdf")).unwrap();
    // Pixel coordinates at 324 dpi, with boxes jittering inside one printed line.
    let mut words = two_column_sheet();
    for (idx, word) in words.iter_mut().enumerate() {
        word.x *= 4.5;
        word.y = word.y * 4.5 + (idx % 3) as f32 * 3.0;
        word.width *= 4.5;
        word.height *= 4.5;
        word.page_width *= 4.5;
    }
    let chain: Vec<Box<dyn WordSource>> = vec![
        Box::new(ScriptedSource {
            kind: SourceKind::TextLayer,
            words: Vec::new(),
        }),
        Box::new(ScriptedSource {
            kind: SourceKind::Ocr,
            words,
        }),
    ];
    let extraction = extract_with_chain(&document, &Settings::default(), &chain)
        .await
        .unwrap();
    let numbers = extraction
        .questions
        .iter()
        .map(|question| question.number)
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(extraction.report.source, Some(SourceKind::Ocr));
}
