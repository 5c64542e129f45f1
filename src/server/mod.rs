//! HTTP surface: an axum [`Router`] over the shared model client.
//!
//! Every route is `POST` with a multipart body. The handlers in [`routes`]
//! read their fields through [`upload::UploadForm`] and hand off to
//! [`crate::respond::respond`].

pub mod routes;
pub mod upload;

use crate::config::ServerConfig;
use crate::error::FormServeError;
use crate::model::ModelClient;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ModelClient>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(client: Arc<dyn ModelClient>, config: ServerConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/enquiry_form", post(routes::enquiry_form))
        .route("/schedule_meeting", post(routes::schedule_meeting))
        .route("/todo_form", post(routes::todo_form))
        .route("/chat_assisstant", post(routes::chat_assistant))
        .route(
            "/chat_assisstant_only_language",
            post(routes::chat_assistant_only_language),
        )
        .route("/hello", post(routes::hello))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for FormServeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::UnsupportedFileType { mime_type } => {
                info!("Rejected upload with MIME type '{}'", mime_type);
                let body = ErrorResponse {
                    error: "Unsupported file type".to_string(),
                };
                (status, Json(body)).into_response()
            }
            Self::MissingField { .. } | Self::MalformedUpload { .. } | Self::UploadTooLarge { .. } => {
                let body = ErrorResponse {
                    error: self.to_string(),
                };
                (status, Json(body)).into_response()
            }
            _ => {
                error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
