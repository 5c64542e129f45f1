//! CLI binary for edgequake-formserve.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServerConfig`, builds the model client once, and serves the router.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use edgequake_formserve::pipeline::render::bind_pdfium;
use edgequake_formserve::{build_client, router, AppState, Backend, ServerConfig};
use std::io;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Vertex AI Gemini (default backend)
  formserve --project-id my-project --access-token "$(gcloud auth print-access-token)"

  # Any edgequake-llm provider, auto-detected from API key env vars
  formserve --backend provider

  # A specific provider and model on a custom port
  formserve --backend provider --provider anthropic --model claude-sonnet-4-20250514 --port 8080

  # Try it
  curl -F image=@form.jpg http://localhost:5555/enquiry_form
  curl -F file=@notes.docx -F prompt='Summarise this' http://localhost:5555/chat_assisstant

ROUTES (all POST, multipart):
  /enquiry_form                    image              → {"extracted_text": …}
  /schedule_meeting                image              → {"extracted_text": …}
  /todo_form                       image              → {"extracted_text": …}
  /chat_assisstant                 file, prompt       → {"response": …}
  /chat_assisstant_only_language   [file], prompt     → {"response": …}
  /hello                           image, text        → {"response": …}

ENVIRONMENT VARIABLES:
  RUST_LOG             Log filter, overrides --verbose/--quiet
  VERTEX_PROJECT_ID    Google Cloud project for Vertex AI
  VERTEX_LOCATION      Vertex AI region
  VERTEX_ACCESS_TOKEN  OAuth bearer token for Vertex AI
  EDGEQUAKE_PROVIDER   edgequake-llm provider name
  EDGEQUAKE_MODEL      Model ID for either backend
  PDFIUM_LIB_PATH      pdfium shared library, or a directory containing it
"#;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Vertex AI Gemini with token streaming.
    Vertex,
    /// Any edgequake-llm provider.
    Provider,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Vertex => Backend::Vertex,
            BackendArg::Provider => Backend::Provider,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "formserve",
    version,
    about = "Serve form extraction and document chat over HTTP using multimodal LLMs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Bind address.
    #[arg(long, env = "FORMSERVE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Bind port.
    #[arg(short, long, env = "FORMSERVE_PORT", default_value_t = 5555)]
    port: u16,

    /// Model backend.
    #[arg(long, env = "FORMSERVE_BACKEND", value_enum, default_value = "vertex")]
    backend: BackendArg,

    /// Model ID (default: gemini-1.5-flash for Vertex, gpt-4.1-nano for providers).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider for --backend provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Google Cloud project hosting Vertex AI.
    #[arg(long, env = "VERTEX_PROJECT_ID")]
    project_id: Option<String>,

    /// Vertex AI region.
    #[arg(long, env = "VERTEX_LOCATION", default_value = "asia-south1")]
    location: String,

    /// OAuth bearer token for Vertex AI.
    #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Override the Vertex AI endpoint base URL.
    #[arg(long, env = "FORMSERVE_VERTEX_ENDPOINT")]
    vertex_endpoint: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "FORMSERVE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens per request.
    #[arg(long, env = "FORMSERVE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Longest edge in pixels for images and rendered PDF pages.
    #[arg(long, env = "FORMSERVE_MAX_IMAGE_EDGE", default_value_t = 2000)]
    max_image_edge: u32,

    /// Maximum multipart body size in bytes.
    #[arg(long, env = "FORMSERVE_MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    max_upload_bytes: usize,

    /// Per-request model timeout in seconds (0 = none).
    #[arg(long, env = "FORMSERVE_API_TIMEOUT", default_value_t = 0)]
    api_timeout: u64,

    /// Do not log streamed fragments as they arrive.
    #[arg(long, env = "FORMSERVE_NO_ECHO")]
    no_echo: bool,

    /// Directory for request-scoped temporary files.
    #[arg(long, env = "FORMSERVE_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// pdfium shared library, or a directory containing it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, env = "FORMSERVE_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, env = "FORMSERVE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    info!("{:?}", config);

    // PDF uploads fail per request without pdfium; everything else still works.
    let lib_path = config.pdfium_lib_path.clone();
    match tokio::task::spawn_blocking(move || bind_pdfium(lib_path.as_deref()).map(|_| ()))
        .await
        .context("pdfium probe task failed")?
    {
        Ok(()) => info!("pdfium available; PDF uploads enabled"),
        Err(e) => warn!("{e}"),
    }

    let client = build_client(&config).context("Failed to initialise model client")?;
    info!("Model client: {}", client.name());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    let app = router(AppState::new(client, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shut down");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ServerConfig> {
    let mut builder = ServerConfig::builder()
        .host(cli.host.clone())
        .port(cli.port)
        .backend(cli.backend.into())
        .location(cli.location.clone())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_image_edge(cli.max_image_edge)
        .max_upload_bytes(cli.max_upload_bytes)
        .api_timeout_secs(cli.api_timeout)
        .echo_stream(!cli.no_echo);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref project) = cli.project_id {
        builder = builder.project_id(project.clone());
    }
    if let Some(ref token) = cli.access_token {
        builder = builder.access_token(token.clone());
    }
    if let Some(ref endpoint) = cli.vertex_endpoint {
        builder = builder.vertex_endpoint(endpoint.clone());
    }
    if let Some(ref dir) = cli.scratch_dir {
        builder = builder.scratch_dir(dir.clone());
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path.clone());
    }

    builder.build().context("Invalid configuration")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received, draining connections");
}
