//! Error type for the edgequake-formserve library.
//!
//! A single enum covers every failure a request can hit. The caller can fix
//! only a few of them:
//!
//! * [`FormServeError::UnsupportedFileType`]: the upload's declared MIME
//!   type is outside the supported set (HTTP 400).
//! * [`FormServeError::MissingField`] and [`FormServeError::MalformedUpload`]:
//!   the multipart body is incomplete or unparseable (HTTP 400).
//! * [`FormServeError::UploadTooLarge`]: the body exceeds the limit (HTTP 413).
//!
//! Everything else (upstream model failures, decode failures, temp-file I/O)
//! is reported as a generic HTTP 500. The mapping lives in
//! [`FormServeError::status_code`] so the server layer stays a thin shim.

use axum::http::StatusCode;
use thiserror::Error;

/// All errors returned by the edgequake-formserve library.
#[derive(Debug, Error)]
pub enum FormServeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The declared MIME type is not one the normalizer can handle.
    #[error("Unsupported file type: '{mime_type}'")]
    UnsupportedFileType { mime_type: String },

    /// A required multipart form field was not supplied.
    #[error("Missing field '{field}'")]
    MissingField { field: String },

    /// The multipart body itself could not be parsed.
    #[error("Malformed multipart body: {detail}")]
    MalformedUpload { detail: String },

    /// The request body exceeded the configured upload limit.
    #[error("Upload exceeds the {limit}-byte limit")]
    UploadTooLarge { limit: usize },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// The file matched a supported kind but its content could not be decoded.
    #[error("Failed to decode {kind} upload: {detail}")]
    DecodeFailed { kind: &'static str, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Temp-file errors ──────────────────────────────────────────────────
    /// Writing, reading, or deleting the request-scoped temporary file failed.
    #[error("Temporary file I/O failed: {source}")]
    TempFileIo {
        #[source]
        source: std::io::Error,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model client failed (auth, quota, network, malformed stream).
    #[error("Upstream model failure: {message}")]
    UpstreamModel { message: String },

    /// The model call did not finish within the configured timeout.
    #[error("Upstream model call timed out after {secs}s")]
    UpstreamTimeout { secs: u64 },

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FormServeError {
    /// HTTP status the server reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedFileType { .. }
            | Self::MissingField { .. }
            | Self::MalformedUpload { .. } => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn upstream(err: impl std::fmt::Display) -> Self {
        Self::UpstreamModel {
            message: err.to_string(),
        }
    }

    pub(crate) fn temp_io(source: std::io::Error) -> Self {
        Self::TempFileIo { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_type_carries_mime() {
        let e = FormServeError::UnsupportedFileType {
            mime_type: "application/zip".into(),
        };
        assert!(e.to_string().contains("application/zip"));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_field_is_client_error() {
        let e = FormServeError::MissingField {
            field: "prompt".into(),
        };
        assert_eq!(e.to_string(), "Missing field 'prompt'");
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_and_io_are_server_errors() {
        let e = FormServeError::upstream("quota exceeded");
        assert!(e.to_string().contains("quota exceeded"));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let e = FormServeError::temp_io(std::io::Error::other("disk full"));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn timeout_display() {
        let e = FormServeError::UpstreamTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }
}
