//! Text extraction: PDF, DOCX or plain-text bytes → a single string.
//!
//! ## Why spawn_blocking?
//!
//! PDF text extraction goes through pdfium (via `pdfium-render`), a C++
//! library that is CPU-bound and not async-safe. [`extract_text_async`] moves
//! the work onto Tokio's blocking pool so worker threads never stall. DOCX
//! unzipping is cheap but runs on the same path for uniformity.
//!
//! Magic bytes are checked before decoding (`%PDF`, `PK\x03\x04`) so a
//! mislabelled upload yields a meaningful error instead of a pdfium failure.

use crate::error::ExtractionError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";

/// A supported source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Map a MIME type; parameters such as `; charset=utf-8` are ignored.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractionError> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            MIME_PDF => Ok(DocumentFormat::Pdf),
            MIME_DOCX => Ok(DocumentFormat::Docx),
            MIME_TEXT => Ok(DocumentFormat::PlainText),
            _ => Err(ExtractionError::UnsupportedFormat {
                mime: mime.to_string(),
            }),
        }
    }

    /// Guess the format from a file extension (`pdf`, `docx`, `txt`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" | "text" | "md" => Some(DocumentFormat::PlainText),
            _ => None,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => MIME_PDF,
            DocumentFormat::Docx => MIME_DOCX,
            DocumentFormat::PlainText => MIME_TEXT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::Docx => "DOCX",
            DocumentFormat::PlainText => "Text",
        }
    }
}

/// Extract the text of a document of the given MIME type.
pub fn extract_text(bytes: &[u8], mime: &str) -> Result<String, ExtractionError> {
    let format = DocumentFormat::from_mime(mime)?;
    let text = match format {
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Docx => extract_docx(bytes)?,
        DocumentFormat::PlainText => String::from_utf8_lossy(bytes).into_owned(),
    };
    debug!("Extracted {} chars from {} document", text.len(), format.label());
    Ok(text)
}

/// [`extract_text`] on the blocking pool.
pub async fn extract_text_async(bytes: Vec<u8>, mime: String) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, &mime))
        .await
        .map_err(|e| ExtractionError::CorruptDocument {
            format: "document",
            detail: format!("extraction task panicked: {e}"),
        })?
}

/// Read a file and infer its MIME type from the extension.
pub async fn read_document(path: &Path) -> Result<(Vec<u8>, &'static str), ExtractionError> {
    let format = DocumentFormat::from_path(path).ok_or_else(|| ExtractionError::UnsupportedFormat {
        mime: path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_else(|| "(no extension)".to_string()),
    })?;
    let bytes = tokio::fs::read(path).await.map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Read {} ({} bytes, {})", path.display(), bytes.len(), format.label());
    Ok((bytes, format.mime()))
}

// ── PDF ──────────────────────────────────────────────────────────────────

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    check_magic(bytes, b"%PDF", "PDF")?;

    let pdfium = pdfium_auto::bind_pdfium_silent()
        .map_err(|e| ExtractionError::PdfEngineUnavailable(e.to_string()))?;

    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| ExtractionError::CorruptDocument {
            format: "PDF",
            detail: format!("{e:?}"),
        })?;

    let mut pages = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page.text().map_err(|e| ExtractionError::CorruptDocument {
            format: "PDF",
            detail: format!("page {}: {e:?}", idx + 1),
        })?;
        pages.push(text.all());
    }
    info!("PDF loaded: {} pages", pages.len());
    Ok(pages.join("\n\n"))
}

// ── DOCX ─────────────────────────────────────────────────────────────────

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractionError> {
    check_magic(bytes, b"PK\x03\x04", "DOCX")?;
    let corrupt = |detail: String| ExtractionError::CorruptDocument {
        format: "DOCX",
        detail,
    };

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(e.to_string()))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| corrupt(format!("word/document.xml: {e}")))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| corrupt(e.to_string()))?;

    Ok(docx_xml_to_text(&xml))
}

static RE_DOCX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:t\s*/>|<w:tab\s*/>|<w:br\b[^>]*/>|</w:p>")
        .unwrap()
});

/// Flatten WordprocessingML body text: text runs, tabs, breaks, paragraphs.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    for caps in RE_DOCX_TOKEN.captures_iter(xml) {
        if let Some(run) = caps.get(1) {
            out.push_str(&unescape_xml(run.as_str()));
            continue;
        }
        match &caps[0] {
            "</w:p>" => out.push('\n'),
            tok if tok.starts_with("<w:tab") => out.push('\t'),
            tok if tok.starts_with("<w:br") => out.push('\n'),
            _ => {}
        }
    }
    out.trim_end().to_string()
}

fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn check_magic(bytes: &[u8], magic: &[u8], format: &'static str) -> Result<(), ExtractionError> {
    if bytes.starts_with(magic) {
        Ok(())
    } else {
        let head: Vec<u8> = bytes.iter().take(4).copied().collect();
        Err(ExtractionError::CorruptDocument {
            format,
            detail: format!("unexpected leading bytes {head:?}"),
        })
    }
}
