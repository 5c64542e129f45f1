//! # edgequake-formserve
//!
//! HTTP service that turns an uploaded form or document plus an instruction
//! into a multimodal LLM prompt, and returns the model's streamed answer as
//! one JSON string.
//!
//! Handwritten forms are hard for OCR and easy for a vision model. Each
//! upload is normalised into an ordered list of image and text parts, sent
//! to the model once, and the generated fragments are concatenated.
//!
//! ## Request Flow
//!
//! ```text
//! multipart upload
//!  │
//!  ├─ 1. Upload     collect `image` / `file` / `prompt` fields
//!  ├─ 2. Normalise  MIME → {text, DOCX, image, PDF} → [Image…, Text]
//!  │                (scratch file, decode in spawn_blocking, always removed)
//!  ├─ 3. Generate   ModelClient::generate → stream of text fragments
//!  ├─ 4. Aggregate  concatenate fragments in arrival order
//!  └─ 5. Respond    {"extracted_text": …} or {"response": …}
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_formserve::{build_client, router, AppState, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder()
//!         .project_id("my-project")
//!         .access_token(std::env::var("VERTEX_ACCESS_TOKEN")?)
//!         .build()?;
//!     let client = build_client(&config)?;
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     axum::serve(listener, router(AppState::new(client, config))).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `formserve` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod respond;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Backend, ServerConfig, ServerConfigBuilder};
pub use content::{AggregatedResult, ContentPart, DocumentKind, ImageFormat, UploadedDocument};
pub use error::FormServeError;
pub use model::{build_client, FragmentStream, ModelClient, ProviderClient, VertexClient};
pub use pipeline::aggregate::{aggregate, FragmentObserver, LogObserver};
pub use pipeline::normalize::normalize;
pub use respond::respond;
pub use server::{router, AppState};
