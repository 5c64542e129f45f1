//! Model clients: the boundary to the hosted multimodal LLM.
//!
//! Every backend implements [`ModelClient`]: take an ordered prompt of
//! [`ContentPart`]s, return a lazy [`FragmentStream`] of generated text. The
//! server builds exactly one client at startup via [`build_client`] and
//! shares it read-only across requests.
//!
//! | Backend | Streaming | Module |
//! |---------|-----------|--------|
//! | Vertex AI Gemini | token-level (`alt=sse`) | [`vertex`] |
//! | `edgequake-llm` providers | single fragment | [`provider`] |

pub mod provider;
pub mod sse;
pub mod vertex;

use crate::config::{Backend, ServerConfig};
use crate::content::ContentPart;
use crate::error::FormServeError;
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

pub use provider::ProviderClient;
pub use vertex::VertexClient;

/// A boxed, finite, non-restartable stream of generated text fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, FormServeError>> + Send>>;

/// A generative model that accepts multimodal prompts.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Start generation for `parts` and return the response as it streams in.
    ///
    /// Errors before the first fragment (auth, bad request) are returned
    /// directly; errors after that arrive as an `Err` item in the stream.
    async fn generate(&self, parts: &[ContentPart]) -> Result<FragmentStream, FormServeError>;

    /// Short backend/model label for logs.
    fn name(&self) -> String;
}

/// Construct the configured model client.
pub fn build_client(config: &ServerConfig) -> Result<Arc<dyn ModelClient>, FormServeError> {
    let client: Arc<dyn ModelClient> = match config.backend {
        Backend::Vertex => Arc::new(VertexClient::from_config(config)?),
        Backend::Provider => Arc::new(ProviderClient::from_config(config)?),
    };
    Ok(client)
}
