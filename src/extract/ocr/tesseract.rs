use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;
use tracing::warn;

pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let output = Command::new("tesseract")
        .arg("--list-langs")
        .output()
        .with_context(|| "failed to run tesseract --list-langs")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract --list-langs failed: {}", stderr.trim()));
    }
    Ok(parse_language_list(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_language_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

/// Picks the single recognition language to load. Extra languages in the
/// setting are ignored with a warning.
pub(super) fn resolve_language(requested: &str, available: Option<&[String]>) -> Result<String> {
    let mut requested_langs = requested
        .split(['+', ',', ' '])
        .map(|lang| lang.trim())
        .filter(|lang| !lang.is_empty());
    let Some(lang) = requested_langs.next() else {
        return Err(anyhow!("ocr language is empty"));
    };
    let ignored = requested_langs.collect::<Vec<_>>();
    if !ignored.is_empty() {
        warn!(
            language = lang,
            ignored = %ignored.join(", "),
            "only one ocr language is supported"
        );
    }

    if let Some(available) = available {
        if !available.iter().any(|value| value == lang) {
            return Err(anyhow!(
                "ocr language not available: {} (available: {})",
                lang,
                available.join(", ")
            ));
        }
    }
    Ok(lang.to_string())
}

/// Produces tesseract-style TSV for every image named in a page list file,
/// numbering pages from 1 in list order.
pub(super) trait TsvEngine: Send + Sync {
    fn recognize(&self, page_list: &Path) -> Result<String>;
}

pub(super) struct TesseractCli {
    pub language: String,
    pub psm: u32,
    pub dpi: u32,
}

impl TsvEngine for TesseractCli {
    fn recognize(&self, page_list: &Path) -> Result<String> {
        run_tesseract_tsv(page_list, &self.language, self.psm, self.dpi)
    }
}

/// `input` may be a single image or a `.txt` file listing one image per line;
/// tesseract loads the model once and reads the list in order.
fn run_tesseract_tsv(input: &Path, language: &str, psm: u32, dpi: u32) -> Result<String> {
    let output = Command::new("tesseract")
        .arg(input)
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .arg("--oem")
        .arg("1")
        .arg("--psm")
        .arg(psm.to_string())
        .arg("--dpi")
        .arg(dpi.to_string())
        .arg("tsv")
        .output()
        .with_context(|| "failed to run tesseract (is it installed?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
