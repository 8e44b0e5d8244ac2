use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::PipelineError;

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Pdf,
    Image,
}

#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    name: Option<String>,
    kind: DocumentKind,
    page_count: u32,
    protected: bool,
    fingerprint: String,
}

impl Document {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path).map_err(|source| PipelineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .map(|value| value.to_string());
        Self::from_bytes(bytes, name.as_deref())
    }

    pub fn from_bytes(bytes: Vec<u8>, name: Option<&str>) -> Result<Self, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::DocumentUnreadable("empty input".to_string()));
        }
        let mime = sniff_mime(&bytes).ok_or_else(|| {
            PipelineError::DocumentUnreadable(format!(
                "unsupported format for '{}'",
                name.unwrap_or("input")
            ))
        })?;
        let fingerprint = format!("{:x}", md5::compute(&bytes));

        let (kind, page_count, protected) = if mime == PDF_MIME {
            let (pages, protected) = inspect_pdf(&bytes)?;
            (DocumentKind::Pdf, pages, protected)
        } else {
            image::load_from_memory(&bytes).map_err(|err| {
                PipelineError::DocumentUnreadable(format!("failed to decode image: {}", err))
            })?;
            (DocumentKind::Image, 1, false)
        };
        debug!(
            name = name.unwrap_or("input"),
            mime, page_count, protected, "document opened"
        );

        Ok(Self {
            bytes,
            name: name.map(|value| value.to_string()),
            kind,
            page_count,
            protected,
            fingerprint,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("input")
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Zero when the page tree could not be read (encrypted documents).
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF-") {
        return Some(PDF_MIME);
    }
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    match detected {
        PDF_MIME => Some(PDF_MIME),
        "image/png" | "image/jpeg" | "image/tiff" | "image/bmp" | "image/gif" | "image/webp" => {
            Some(detected)
        }
        _ => None,
    }
}

fn inspect_pdf(bytes: &[u8]) -> Result<(u32, bool), PipelineError> {
    match lopdf::Document::load_mem(bytes) {
        Ok(doc) => {
            let protected = doc.trailer.get(b"Encrypt").is_ok();
            let pages = doc.get_pages().len() as u32;
            if pages == 0 && !protected {
                return Err(PipelineError::DocumentUnreadable(
                    "pdf has no pages".to_string(),
                ));
            }
            Ok((pages, protected))
        }
        Err(err) => {
            if contains_bytes(bytes, b"/Encrypt") {
                return Ok((0, true));
            }
            Err(PipelineError::DocumentUnreadable(format!(
                "failed to parse pdf: {}",
                err
            )))
        }
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

pub fn title_from_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or(name);
    stem.split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
