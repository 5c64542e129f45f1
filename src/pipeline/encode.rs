//! Image normalisation: any decoded raster → RGB8 PNG bytes.
//!
//! Some model backends reject alpha or palette images, so every image part is
//! flattened to three-channel RGB before encoding. PNG is lossless, which
//! keeps handwriting strokes crisp; oversized scans are downscaled to
//! `max_edge` on their longest side first.

use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Flatten `img` to RGB8, cap its longest edge at `max_edge`, and PNG-encode it.
pub fn encode_image(img: &DynamicImage, max_edge: u32) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let rgb = if rgb.width() > max_edge || rgb.height() > max_edge {
        let scaled = rgb.resize(max_edge, max_edge, FilterType::Lanczos3);
        debug!(
            "Downscaled {}x{} → {}x{} px",
            rgb.width(),
            rgb.height(),
            scaled.width(),
            scaled.height()
        );
        scaled
    } else {
        rgb
    };

    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!("Encoded image → {} bytes PNG", buf.len());

    Ok(buf)
}
