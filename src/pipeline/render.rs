//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state, so everything here is
//! blocking and must be called from `spawn_blocking` (the normalizer does
//! this for the whole decode step).
//!
//! Page size is capped in pixels rather than DPI: an A0 scan at 150 DPI would
//! come out at 12 000 × 17 000 px, far beyond what a vision model reads well.

use crate::error::FormServeError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

#[cfg(target_os = "windows")]
const PDFIUM_LIB_NAME: &str = "pdfium.dll";
#[cfg(target_os = "macos")]
const PDFIUM_LIB_NAME: &str = "libpdfium.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const PDFIUM_LIB_NAME: &str = "libpdfium.so";

/// Bind to pdfium: the explicit `lib_path` (file or directory) if given,
/// otherwise `./` and then the system library search path.
pub fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, FormServeError> {
    if let Some(path) = lib_path {
        let file = if path.is_dir() {
            path.join(PDFIUM_LIB_NAME)
        } else {
            path.to_path_buf()
        };
        return Pdfium::bind_to_library(&file)
            .map(Pdfium::new)
            .map_err(|e| {
                FormServeError::PdfiumBindingFailed(format!("{}: {}", file.display(), e))
            });
    }

    let local = Path::new(".").join(PDFIUM_LIB_NAME);
    Pdfium::bind_to_library(&local)
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| FormServeError::PdfiumBindingFailed(e.to_string()))
}

/// Rasterise every page of the PDF at `pdf_path`, in page order.
///
/// A document with zero pages yields an empty vector, not an error.
pub fn render_pdf(
    pdf_path: &Path,
    max_edge: u32,
    lib_path: Option<&Path>,
) -> Result<Vec<DynamicImage>, FormServeError> {
    let pdfium = bind_pdfium(lib_path)?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| FormServeError::DecodeFailed {
            kind: "PDF",
            detail: format!("{:?}", e),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_edge as i32)
        .set_maximum_height(max_edge as i32);

    let mut images = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            FormServeError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        images.push(image);
    }

    Ok(images)
}
