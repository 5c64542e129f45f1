//! Request-scoped data model: uploads in, content parts out.
//!
//! Nothing here outlives a single request. An [`UploadedDocument`] is built
//! from the multipart body, consumed by [`crate::pipeline::normalize`], and
//! dropped; the resulting [`ContentPart`] list is handed to the model client
//! and finally echoed in the [`AggregatedResult`] for logging.

use crate::error::FormServeError;
use bytes::Bytes;
use std::fmt;

/// MIME type of a DOCX document.
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Raster encoding of an [`ContentPart::Image`] payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// One unit of a multimodal prompt. Order in a prompt is significant.
#[derive(Clone, PartialEq, Eq)]
pub enum ContentPart {
    Image { data: Bytes, format: ImageFormat },
    Text(String),
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        ContentPart::Text(s.into())
    }

    pub fn png(data: impl Into<Bytes>) -> Self {
        ContentPart::Image {
            data: data.into(),
            format: ImageFormat::Png,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(s) => Some(s),
            ContentPart::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentPart::Image { .. })
    }
}

// Image payloads can be megabytes; print their size instead.
impl fmt::Debug for ContentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPart::Image { data, format } => f
                .debug_struct("Image")
                .field("format", format)
                .field("bytes", &data.len())
                .finish(),
            ContentPart::Text(s) => f.debug_tuple("Text").field(s).finish(),
        }
    }
}

/// A file received over HTTP, not yet decoded.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub bytes: Bytes,
    /// Declared `Content-Type` of the multipart field.
    pub mime_type: String,
    /// Client-side file name, for logging only.
    pub file_name: Option<String>,
}

impl UploadedDocument {
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }
}

/// The closed set of upload kinds the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
    Image,
}

impl DocumentKind {
    /// Resolve a declared MIME type, ignoring case and parameters such as
    /// `; charset=utf-8`.
    pub fn from_mime(mime_type: &str) -> Result<Self, FormServeError> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/pdf" => Ok(DocumentKind::Pdf),
            DOCX_MIME => Ok(DocumentKind::Docx),
            "text/plain" => Ok(DocumentKind::PlainText),
            s if s.starts_with("image/") && s.len() > "image/".len() => Ok(DocumentKind::Image),
            _ => Err(FormServeError::UnsupportedFileType {
                mime_type: mime_type.to_string(),
            }),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::PlainText => "text",
            DocumentKind::Image => "image",
        }
    }
}

/// The final model answer plus the prompt that produced it.
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    pub text: String,
    pub parts: Vec<ContentPart>,
}
