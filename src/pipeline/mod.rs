//! Pipeline stages between an upload and the model's answer.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ scratch ──▶ docx / render ──▶ encode ──▶ [parts] ··▶ aggregate
//!            (tmpfile)   (decode)          (PNG)               (fragments)
//! ```
//!
//! 1. [`normalize`]: resolve the MIME kind, then drive the decoders below
//! 2. [`scratch`]:   request-scoped temporary file, removed on drop
//! 3. [`docx`]:      paragraph text from `word/document.xml`
//! 4. [`render`]:    rasterise every PDF page via pdfium; blocking, so
//!    callers run it inside `spawn_blocking`
//! 5. [`encode`]:    RGB-convert, downscale, and PNG-encode a `DynamicImage`
//! 6. [`aggregate`]: fold the model's fragment stream into one string

pub mod aggregate;
pub mod docx;
pub mod encode;
pub mod normalize;
pub mod render;
pub mod scratch;
