//! Configuration types for the form-extraction server.
//!
//! All server behaviour is controlled through [`ServerConfig`], built via its
//! [`ServerConfigBuilder`]. The config is created once at startup, wrapped in
//! an `Arc`, and shared read-only by every request handler.

use crate::error::FormServeError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Which model client the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Vertex AI Gemini via `streamGenerateContent` (true token streaming).
    #[default]
    Vertex,
    /// Any `edgequake-llm` provider (OpenAI, Anthropic, Gemini, Ollama, …).
    Provider,
}

/// Configuration for the form-extraction server.
///
/// # Example
/// ```rust
/// use edgequake_formserve::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .port(8080)
///     .project_id("my-project")
///     .location("europe-west4")
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 8080);
/// ```
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address. Default: `0.0.0.0`.
    pub host: String,

    /// Bind port. Default: 5555.
    pub port: u16,

    /// Model backend. Default: [`Backend::Vertex`].
    pub backend: Backend,

    /// Model identifier. If None, the backend default is used
    /// (`gemini-1.5-flash` for Vertex, `gpt-4.1-nano` for providers).
    pub model: Option<String>,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Google Cloud project hosting the Vertex AI endpoint.
    pub project_id: Option<String>,

    /// Vertex AI region. Default: `asia-south1`.
    pub location: String,

    /// OAuth bearer token for Vertex AI. Treated as opaque.
    pub access_token: Option<String>,

    /// Override for the Vertex AI endpoint base URL (tests, private endpoints).
    pub vertex_endpoint: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Form extraction is transcription; low temperature keeps the model
    /// faithful to what is written on the page.
    pub temperature: f32,

    /// Maximum tokens the model may generate per request. Default: 4096.
    pub max_tokens: usize,

    /// Longest edge, in pixels, of any image or rendered PDF page sent to the
    /// model. Larger inputs are downscaled preserving aspect ratio. Default: 2000.
    pub max_image_edge: u32,

    /// Maximum accepted multipart body size in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,

    /// Per-request model call timeout in seconds; 0 disables it. Default: 0.
    pub api_timeout_secs: u64,

    /// Log every streamed fragment at DEBUG level as it arrives. Default: true.
    pub echo_stream: bool,

    /// Directory for request-scoped temporary files. Default: system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// Path to a pdfium shared library, or a directory containing one.
    /// If None, `./` and then system library paths are searched.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5555,
            backend: Backend::default(),
            model: None,
            provider_name: None,
            provider: None,
            project_id: None,
            location: "asia-south1".to_string(),
            access_token: None,
            vertex_endpoint: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_image_edge: 2000,
            max_upload_bytes: 20 * 1024 * 1024,
            api_timeout_secs: 0,
            echo_stream: true,
            scratch_dir: None,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_image_edge", &self.max_image_edge)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("echo_stream", &self.echo_stream)
            .field("vertex_endpoint", &self.vertex_endpoint)
            .field("scratch_dir", &self.scratch_dir)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }

    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn project_id(mut self, id: impl Into<String>) -> Self {
        self.config.project_id = Some(id.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = location.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn vertex_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vertex_endpoint = Some(url.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_image_edge(mut self, px: u32) -> Self {
        self.config.max_image_edge = px.max(100);
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn echo_stream(mut self, v: bool) -> Self {
        self.config.echo_stream = v;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, FormServeError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(FormServeError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(FormServeError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.location.trim().is_empty() {
            return Err(FormServeError::InvalidConfig(
                "Vertex location must not be empty".into(),
            ));
        }
        if let Some(ref dir) = c.scratch_dir {
            if !dir.is_dir() {
                return Err(FormServeError::InvalidConfig(format!(
                    "scratch_dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.config)
    }
}
