//! Per-format text extraction.
//!
//! Each supported upload format is a [`SourceKind`] variant dispatched once at
//! pipeline entry. Adding a format means adding a variant plus one extraction
//! function; the heavy parsing is delegated to format libraries (`lopdf`,
//! `zip`, `calamine`).

mod docx;
mod excel;
mod pdf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Declared format of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// PDF document; pages concatenated in document order.
    Pdf,
    /// Word document (`.docx`); body text with formatting dropped.
    Docx,
    /// Spreadsheet workbook (`.xlsx`/`.xls`); rows rendered as delimited text.
    Excel,
    /// Raster image; textual content comes from an AI caption.
    Image,
    /// Plain text; passed through unchanged.
    Text,
}

impl SourceKind {
    /// Map a declared MIME type onto a source kind.
    ///
    /// Legacy binary Word files are rejected explicitly rather than silently
    /// degraded to a lossy extraction.
    pub fn from_mime(mime: &str) -> Result<Self, ExtractError> {
        match mime {
            "application/pdf" => Ok(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Ok(Self::Docx)
            }
            "application/msword" => Err(ExtractError::UnsupportedFormat(
                "legacy .doc files are not supported; upload a .docx instead".into(),
            )),
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Ok(Self::Excel)
            }
            "image/png" | "image/jpeg" => Ok(Self::Image),
            "text/plain" => Ok(Self::Text),
            other => Err(ExtractError::UnsupportedFormat(other.to_string())),
        }
    }

    /// MIME type reported to downstream providers for this kind.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Excel => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Image => "image/jpeg",
            Self::Text => "text/plain",
        }
    }

    /// Whether the pipeline requests a supplementary AI summary for this kind.
    pub fn wants_summary(self) -> bool {
        matches!(self, Self::Pdf | Self::Docx | Self::Image)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Excel => "excel",
            Self::Image => "image",
            Self::Text => "text",
        };
        f.write_str(label)
    }
}

/// Errors raised while extracting text from uploaded bytes.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// PDF bytes could not be parsed.
    #[error("Failed to parse PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// DOCX container or document XML could not be read.
    #[error("Failed to parse DOCX: {0}")]
    Docx(String),
    /// Spreadsheet bytes could not be parsed.
    #[error("Failed to parse spreadsheet: {0}")]
    Excel(#[from] calamine::Error),
    /// Plain-text bytes were not valid UTF-8.
    #[error("Document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    /// The declared format is not supported by any extractor.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),
}

/// Extract the raw textual content of `bytes` according to its declared kind.
///
/// Image uploads produce no text here; their content is an AI caption supplied
/// later by the pipeline.
pub fn extract(bytes: &[u8], kind: SourceKind) -> Result<String, ExtractError> {
    match kind {
        SourceKind::Pdf => pdf::extract_text(bytes),
        SourceKind::Docx => docx::extract_text(bytes),
        SourceKind::Excel => excel::extract_text(bytes),
        SourceKind::Image => Ok(String::new()),
        SourceKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
    }
}
