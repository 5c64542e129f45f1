//! Content normalisation: one upload + one instruction → ordered prompt parts.
//!
//! | Upload | Parts |
//! |--------|-------|
//! | none | `[Text(instruction)]` |
//! | `text/plain` | `[Text(instruction + "\n" + text)]` |
//! | DOCX | `[Text(instruction + "\n" + paragraphs.join("\n"))]` |
//! | `image/*` | `[Image(png), Text(instruction)]` |
//! | `application/pdf` | `[Image(page 1), …, Image(page N), Text(instruction)]` |
//!
//! The MIME type is resolved to a [`DocumentKind`] before anything touches
//! disk, so unsupported uploads are rejected without creating a file.
//! Supported uploads are written to a [`ScratchFile`] and decoded inside
//! `spawn_blocking`; the file is removed on every exit path.

use crate::config::ServerConfig;
use crate::content::{ContentPart, DocumentKind, UploadedDocument};
use crate::error::FormServeError;
use crate::pipeline::scratch::ScratchFile;
use crate::pipeline::{docx, encode, render};
use bytes::Bytes;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Decoder settings copied out of [`ServerConfig`] for the blocking task.
#[derive(Debug, Clone)]
struct DecodeOptions {
    max_image_edge: u32,
    scratch_dir: Option<PathBuf>,
    pdfium_lib_path: Option<PathBuf>,
}

/// Build the prompt for `doc` (if any) and `instruction`.
///
/// The returned vector is never empty.
pub async fn normalize(
    doc: Option<UploadedDocument>,
    instruction: &str,
    config: &ServerConfig,
) -> Result<Vec<ContentPart>, FormServeError> {
    let Some(doc) = doc else {
        debug!("No upload; text-only prompt");
        return Ok(vec![ContentPart::text(instruction)]);
    };

    let kind = DocumentKind::from_mime(&doc.mime_type)?;
    info!(
        "Normalising {} upload {:?} ({} bytes)",
        kind.label(),
        doc.file_name.as_deref().unwrap_or("<unnamed>"),
        doc.bytes.len()
    );

    let opts = DecodeOptions {
        max_image_edge: config.max_image_edge,
        scratch_dir: config.scratch_dir.clone(),
        pdfium_lib_path: config.pdfium_lib_path.clone(),
    };
    let instruction = instruction.to_string();
    let bytes = doc.bytes;

    let start = Instant::now();
    let parts = tokio::task::spawn_blocking(move || decode_scoped(kind, &bytes, &instruction, &opts))
        .await
        .map_err(|e| FormServeError::Internal(format!("Decode task panicked: {}", e)))??;

    debug!(
        "Normalised into {} parts in {}ms",
        parts.len(),
        start.elapsed().as_millis()
    );
    Ok(parts)
}

/// Write the upload to a scratch file, decode it, and remove the file.
///
/// A decode error takes precedence over a cleanup error; the latter is
/// only logged in that case.
fn decode_scoped(
    kind: DocumentKind,
    bytes: &Bytes,
    instruction: &str,
    opts: &DecodeOptions,
) -> Result<Vec<ContentPart>, FormServeError> {
    let scratch = ScratchFile::create(bytes, opts.scratch_dir.as_deref())?;
    let decoded = decode_file(kind, scratch.path(), instruction, opts);

    match (decoded, scratch.close()) {
        (Ok(parts), Ok(())) => Ok(parts),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), cleanup) => {
            if let Err(ce) = cleanup {
                warn!("Scratch cleanup failed after decode error: {}", ce);
            }
            Err(e)
        }
    }
}

fn decode_file(
    kind: DocumentKind,
    path: &Path,
    instruction: &str,
    opts: &DecodeOptions,
) -> Result<Vec<ContentPart>, FormServeError> {
    match kind {
        DocumentKind::PlainText => {
            let raw = std::fs::read(path).map_err(FormServeError::temp_io)?;
            let text = String::from_utf8_lossy(&raw);
            let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);
            Ok(vec![ContentPart::Text(format!("{}\n{}", instruction, text))])
        }

        DocumentKind::Docx => {
            let file = File::open(path).map_err(FormServeError::temp_io)?;
            let paragraphs = docx::extract_paragraphs(BufReader::new(file))?;
            debug!("DOCX: {} paragraphs", paragraphs.len());
            Ok(vec![ContentPart::Text(format!(
                "{}\n{}",
                instruction,
                paragraphs.join("\n")
            ))])
        }

        DocumentKind::Image => {
            let img = image::ImageReader::open(path)
                .map_err(FormServeError::temp_io)?
                .with_guessed_format()
                .map_err(FormServeError::temp_io)?
                .decode()
                .map_err(|e| FormServeError::DecodeFailed {
                    kind: "image",
                    detail: e.to_string(),
                })?;
            debug!("Image: {}x{} {:?}", img.width(), img.height(), img.color());

            let png = encode::encode_image(&img, opts.max_image_edge).map_err(|e| {
                FormServeError::DecodeFailed {
                    kind: "image",
                    detail: format!("re-encoding failed: {}", e),
                }
            })?;
            Ok(vec![ContentPart::png(png), ContentPart::text(instruction)])
        }

        DocumentKind::Pdf => {
            let pages = render::render_pdf(path, opts.max_image_edge, opts.pdfium_lib_path.as_deref())?;

            let mut parts = Vec::with_capacity(pages.len() + 1);
            for (idx, page) in pages.iter().enumerate() {
                let png = encode::encode_image(page, opts.max_image_edge).map_err(|e| {
                    FormServeError::RasterisationFailed {
                        page: idx + 1,
                        detail: format!("Image encoding failed: {}", e),
                    }
                })?;
                parts.push(ContentPart::png(png));
            }
            parts.push(ContentPart::text(instruction));
            Ok(parts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::DOCX_MIME;
    use crate::pipeline::docx::tests::build_docx;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn scratch_config() -> (TempDir, ServerConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::builder().scratch_dir(dir.path()).build().unwrap();
        (dir, config)
    }

    fn assert_scratch_empty(dir: &TempDir) {
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(left.is_empty(), "scratch files left behind: {left:?}");
    }

    fn rgba_png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([0, 128, 255, 64])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png).unwrap();
        buf
    }

    #[tokio::test]
    async fn no_upload_is_instruction_only() {
        let (_dir, config) = scratch_config();
        let parts = normalize(None, "hello there", &config).await.unwrap();
        assert_eq!(parts, vec![ContentPart::text("hello there")]);
    }

    #[tokio::test]
    async fn plain_text_prepends_instruction() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(&b"abc"[..], "text/plain");

        let parts = normalize(Some(doc), "summarize", &config).await.unwrap();

        assert_eq!(parts, vec![ContentPart::text("summarize\nabc")]);
        assert_scratch_empty(&dir);
    }

    #[tokio::test]
    async fn plain_text_strips_bom_and_tolerates_bad_utf8() {
        let (_dir, config) = scratch_config();
        let doc = UploadedDocument::new(&b"\xEF\xBB\xBFok\xFF"[..], "text/plain; charset=utf-8");

        let parts = normalize(Some(doc), "x", &config).await.unwrap();
        assert_eq!(parts, vec![ContentPart::text("x\nok\u{FFFD}")]);
    }

    #[tokio::test]
    async fn docx_joins_paragraphs() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(build_docx(&["Line one", "Line two"]), DOCX_MIME);

        let parts = normalize(Some(doc), "Summarise this", &config).await.unwrap();

        assert_eq!(parts, vec![ContentPart::text("Summarise this\nLine one\nLine two")]);
        assert_scratch_empty(&dir);
    }

    #[tokio::test]
    async fn image_becomes_rgb_png_then_instruction() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(rgba_png(8, 6), "image/png").with_file_name("form.png");

        let parts = normalize(Some(doc), "Read the form", &config).await.unwrap();

        assert_eq!(parts.len(), 2);
        match &parts[0] {
            ContentPart::Image { data, format } => {
                assert_eq!(*format, crate::content::ImageFormat::Png);
                let decoded = image::load_from_memory(data).unwrap();
                assert_eq!(decoded.color(), image::ColorType::Rgb8);
                assert_eq!((decoded.width(), decoded.height()), (8, 6));
            }
            other => panic!("expected image part, got {other:?}"),
        }
        assert_eq!(parts[1].as_text(), Some("Read the form"));
        assert_scratch_empty(&dir);
    }

    #[tokio::test]
    async fn image_container_is_sniffed() {
        // A JPEG declared as image/png still decodes.
        let (_dir, config) = scratch_config();
        let mut jpeg = Vec::new();
        DynamicImage::new_rgb8(4, 4)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();
        let doc = UploadedDocument::new(jpeg, "image/png");

        let parts = normalize(Some(doc), "x", &config).await.unwrap();
        assert!(parts[0].is_image());
    }

    #[tokio::test]
    async fn unsupported_type_creates_no_file() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(&b"PK\x03\x04"[..], "application/zip");

        let err = normalize(Some(doc), "x", &config).await.unwrap_err();

        match err {
            FormServeError::UnsupportedFileType { mime_type } => assert_eq!(mime_type, "application/zip"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_scratch_empty(&dir);
    }

    #[tokio::test]
    async fn corrupt_image_fails_and_cleans_up() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(&b"definitely not pixels"[..], "image/jpeg");

        let err = normalize(Some(doc), "x", &config).await.unwrap_err();

        assert!(matches!(err, FormServeError::DecodeFailed { kind: "image", .. }), "got {err:?}");
        assert_scratch_empty(&dir);
    }

    #[tokio::test]
    async fn corrupt_docx_fails_and_cleans_up() {
        let (dir, config) = scratch_config();
        let doc = UploadedDocument::new(&b"not a zip"[..], DOCX_MIME);

        let err = normalize(Some(doc), "x", &config).await.unwrap_err();

        assert!(matches!(err, FormServeError::DecodeFailed { kind: "DOCX", .. }));
        assert_scratch_empty(&dir);
    }
}
