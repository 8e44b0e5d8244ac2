use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::document::DocumentKind;
use crate::tools::command_exists;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PageRange {
    pub first: Option<u32>,
    pub last: Option<u32>,
}

impl PageRange {
    fn mutool_arg(&self) -> Option<String> {
        match (self.first, self.last) {
            (None, None) => None,
            (first, Some(last)) => Some(format!("{}-{}", first.unwrap_or(1), last)),
            (Some(first), None) => Some(format!("{}-N", first)),
        }
    }
}

/// Renders every requested page to `dir/page-NNN.png` and returns the page
/// images keyed by 1-based page number, in page order.
pub(super) fn render_pages(
    bytes: &[u8],
    kind: DocumentKind,
    dir: &Path,
    dpi: u32,
    range: PageRange,
) -> Result<Vec<(u32, PathBuf)>> {
    match kind {
        DocumentKind::Image => {
            let image =
                image::load_from_memory(bytes).with_context(|| "failed to decode image input")?;
            let path = dir.join("page-001.png");
            image
                .save_with_format(&path, image::ImageFormat::Png)
                .with_context(|| "failed to write image page")?;
            Ok(vec![(1, path)])
        }
        DocumentKind::Pdf => render_pdf_pages(bytes, dir, dpi, range),
    }
}

fn render_pdf_pages(
    pdf_bytes: &[u8],
    dir: &Path,
    dpi: u32,
    range: PageRange,
) -> Result<Vec<(u32, PathBuf)>> {
    let input_path = dir.join("input.pdf");
    fs::write(&input_path, pdf_bytes).with_context(|| "failed to write temp pdf")?;

    if command_exists("mutool") {
        let mut command = Command::new("mutool");
        command
            .arg("draw")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-o")
            .arg(dir.join("page-%03d.png"))
            .arg(&input_path);
        if let Some(pages) = range.mutool_arg() {
            command.arg(pages);
        }
        let output = command
            .output()
            .with_context(|| "failed to run mutool")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("mutool failed: {}", stderr.trim()));
        }
    } else if command_exists("pdftoppm") {
        let mut command = Command::new("pdftoppm");
        command.arg("-png").arg("-r").arg(dpi.to_string());
        if let Some(first) = range.first {
            command.arg("-f").arg(first.to_string());
        }
        if let Some(last) = range.last {
            command.arg("-l").arg(last.to_string());
        }
        let output = command
            .arg(&input_path)
            .arg(dir.join("page"))
            .output()
            .with_context(|| "failed to run pdftoppm")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("pdftoppm failed: {}", stderr.trim()));
        }
    } else {
        return Err(anyhow!(
            "pdf rendering requires mutool or pdftoppm (install mupdf or poppler)"
        ));
    }

    let pages = collect_page_images(dir)?;
    if pages.is_empty() {
        return Err(anyhow!("no pages rendered"));
    }
    Ok(pages)
}

fn collect_page_images(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut pages = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| "failed to read render directory")?;
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if let Some(page) = page_number(&path) {
            pages.push((page, path));
        }
    }
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages)
}

/// `page-7.png`, `page-07.png` and `page-007.png` all map to page 7.
fn page_number(path: &Path) -> Option<u32> {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if !is_png {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.strip_prefix("page-")?;
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers_from_renderer_names() {
        assert_eq!(page_number(Path::new("/tmp/x/page-007.png")), Some(7));
        assert_eq!(page_number(Path::new("/tmp/x/page-12.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-001.ocr.png")), None);
        assert_eq!(page_number(Path::new("/tmp/x/input.pdf")), None);
    }

    #[test]
    fn collects_pages_in_numeric_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["page-10.png", "page-2.png", "page-1.png", "notes.txt"] {
            fs::write(dir.path().join(name), b"").expect("write");
        }
        let pages = collect_page_images(dir.path()).expect("pages");
        let numbers = pages.iter().map(|(page, _)| *page).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn mutool_page_arguments() {
        let all = PageRange { first: None, last: None };
        assert_eq!(all.mutool_arg(), None);
        let tail = PageRange { first: Some(3), last: None };
        assert_eq!(tail.mutool_arg().as_deref(), Some("3-N"));
        let head = PageRange { first: None, last: Some(4) };
        assert_eq!(head.mutool_arg().as_deref(), Some("1-4"));
    }

    #[test]
    fn image_input_becomes_first_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::new_rgb8(5, 5)
            .write_to(&mut png, image::ImageFormat::Png)
            .expect("png");
        let range = PageRange { first: None, last: None };
        let pages =
            render_pages(&png.into_inner(), DocumentKind::Image, dir.path(), 300, range)
                .expect("pages");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, 1);
        assert!(pages[0].1.exists());
    }
}
