pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().expect("home lock");
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    if let Some(old) = old_home {
        unsafe { std::env::set_var("HOME", old) };
    } else {
        unsafe { std::env::remove_var("HOME") };
    }
    result
}

pub(crate) fn blank_pdf(pages: u32) -> Vec<u8> {
    use lopdf::{Object, Stream, dictionary};

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
    doc.save_to(&mut out).expect("save pdf");
    out
}

/// Word at `(x, y)` on a US-letter sized page, one unit of height per point.
pub(crate) fn word(text: &str, x: f32, y: f32, page: u32) -> crate::extract::Word {
    crate::extract::Word {
        text: text.to_string(),
        x,
        y,
        width: text.chars().count() as f32 * 6.0,
        height: 10.0,
        page,
        page_width: 612.0,
    }
}

/// Lays out space separated words of `text` left to right starting at `x`.
pub(crate) fn words_for_line(text: &str, x: f32, y: f32, page: u32) -> Vec<crate::extract::Word> {
    let mut out = Vec::new();
    let mut cursor = x;
    for token in text.split_whitespace() {
        let w = word(token, cursor, y, page);
        cursor += w.width + 4.0;
        out.push(w);
    }
    out
}
