//! Multipart form collection.
//!
//! A part with a `filename` is a file, everything else is a text field.
//! Browsers send an empty file part when a file input is left blank, so a
//! part with an empty filename and an empty body counts as absent.

use crate::content::UploadedDocument;
use crate::error::FormServeError;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use tracing::debug;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Every field of one multipart request, keyed by field name.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedDocument>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain `multipart` into memory. `limit` is only used for the error
    /// message when the body limit trips.
    pub async fn from_multipart(mut multipart: Multipart, limit: usize) -> Result<Self, FormServeError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let mime_type = field.content_type().unwrap_or(FALLBACK_MIME).to_string();
                    let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

                    if file_name.is_empty() && bytes.is_empty() {
                        debug!("Ignoring empty file part '{}'", name);
                        continue;
                    }

                    debug!(
                        "File part '{}': {:?} {} ({} bytes)",
                        name,
                        file_name,
                        mime_type,
                        bytes.len()
                    );
                    let doc = UploadedDocument::new(bytes, mime_type).with_file_name(file_name);
                    form.files.insert(name, doc);
                }
                None => {
                    let value = field.text().await.map_err(|e| multipart_error(e, limit))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Remove and return the file part called `name`, if any.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedDocument> {
        self.files.remove(name)
    }

    pub fn require_file(&mut self, name: &str) -> Result<UploadedDocument, FormServeError> {
        self.take_file(name).ok_or_else(|| missing(name))
    }

    pub fn require_text(&mut self, name: &str) -> Result<String, FormServeError> {
        self.fields.remove(name).ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> FormServeError {
    FormServeError::MissingField {
        field: name.to_string(),
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> FormServeError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FormServeError::UploadTooLarge { limit }
    } else {
        FormServeError::MalformedUpload {
            detail: err.body_text(),
        }
    }
}
