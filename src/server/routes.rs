//! Route handlers.
//!
//! The three form routes send a fixed extraction template with the uploaded
//! form; the chat routes forward the caller's own prompt. All of them return
//! the raw model output unparsed.

use crate::content::UploadedDocument;
use crate::error::FormServeError;
use crate::prompts::{ENQUIRY_FORM_PROMPT, SCHEDULE_MEETING_PROMPT, TODO_FORM_PROMPT};
use crate::respond::respond;
use crate::server::upload::UploadForm;
use crate::server::AppState;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub extracted_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn enquiry_form(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractionResponse>, FormServeError> {
    extract_form(&state, multipart, "enquiry_form", ENQUIRY_FORM_PROMPT).await
}

pub async fn schedule_meeting(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractionResponse>, FormServeError> {
    extract_form(&state, multipart, "schedule_meeting", SCHEDULE_MEETING_PROMPT).await
}

pub async fn todo_form(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractionResponse>, FormServeError> {
    extract_form(&state, multipart, "todo_form", TODO_FORM_PROMPT).await
}

/// `file` + `prompt`; the file is required.
pub async fn chat_assistant(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, FormServeError> {
    let mut form = read_form(&state, multipart).await?;
    let doc = form.require_file("file")?;
    let prompt = form.require_text("prompt")?;

    chat(&state, "chat_assisstant", Some(doc), &prompt).await
}

/// `prompt` with an optional `file`.
pub async fn chat_assistant_only_language(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, FormServeError> {
    let mut form = read_form(&state, multipart).await?;
    let doc = form.take_file("file");
    let prompt = form.require_text("prompt")?;

    chat(&state, "chat_assisstant_only_language", doc, &prompt).await
}

/// `image` + `text`.
pub async fn hello(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, FormServeError> {
    let mut form = read_form(&state, multipart).await?;
    let doc = form.require_file("image")?;
    let text = form.require_text("text")?;

    chat(&state, "hello", Some(doc), &text).await
}

async fn read_form(state: &AppState, multipart: Multipart) -> Result<UploadForm, FormServeError> {
    UploadForm::from_multipart(multipart, state.config.max_upload_bytes).await
}

async fn extract_form(
    state: &AppState,
    multipart: Multipart,
    route: &str,
    template: &str,
) -> Result<Json<ExtractionResponse>, FormServeError> {
    let mut form = read_form(state, multipart).await?;
    let doc = form.require_file("image")?;
    info!("{}: {}", route, describe(&doc));

    let result = respond(state.client.as_ref(), Some(doc), template, &state.config).await?;
    Ok(Json(ExtractionResponse {
        extracted_text: result.text,
    }))
}

async fn chat(
    state: &AppState,
    route: &str,
    doc: Option<UploadedDocument>,
    prompt: &str,
) -> Result<Json<ChatResponse>, FormServeError> {
    match &doc {
        Some(d) => info!("{}: {} with {}-char prompt", route, describe(d), prompt.len()),
        None => info!("{}: text-only, {}-char prompt", route, prompt.len()),
    }

    let result = respond(state.client.as_ref(), doc, prompt, &state.config).await?;
    Ok(Json(ChatResponse {
        response: result.text,
    }))
}

fn describe(doc: &UploadedDocument) -> String {
    format!(
        "{} {:?} ({} bytes)",
        doc.mime_type,
        doc.file_name.as_deref().unwrap_or("<unnamed>"),
        doc.bytes.len()
    )
}
