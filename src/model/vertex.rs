//! Vertex AI Gemini client with true token streaming.
//!
//! Calls `…/publishers/google/models/{model}:streamGenerateContent?alt=sse`,
//! which returns one SSE `data:` event per generated chunk. Each event is a
//! `GenerateContentResponse`; the text of its first candidate becomes one
//! fragment.
//!
//! Authentication is an opaque OAuth bearer token (e.g. the output of
//! `gcloud auth print-access-token`); minting and refreshing it is left to
//! the deployment.

use crate::config::ServerConfig;
use crate::content::ContentPart;
use crate::error::FormServeError;
use crate::model::{sse, FragmentStream, ModelClient};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_VERTEX_MODEL: &str = "gemini-1.5-flash";

pub struct VertexClient {
    http: reqwest::Client,
    url: String,
    model: String,
    access_token: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl VertexClient {
    pub fn from_config(config: &ServerConfig) -> Result<Self, FormServeError> {
        let project = config
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| FormServeError::ProviderNotConfigured {
                provider: "vertex".to_string(),
                hint: "Set --project-id or VERTEX_PROJECT_ID.".to_string(),
            })?;
        let location = config.location.trim();
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_VERTEX_MODEL.to_string());

        let base = config
            .vertex_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", location));
        let url = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:streamGenerateContent?alt=sse",
            base.trim_end_matches('/'),
            project,
            location,
            model
        );

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| FormServeError::Internal(format!("HTTP client: {}", e)))?;

        info!("Vertex AI client: model={} location={}", model, location);

        Ok(Self {
            http,
            url,
            model,
            access_token: config.access_token.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ModelClient for VertexClient {
    async fn generate(&self, parts: &[ContentPart]) -> Result<FragmentStream, FormServeError> {
        let body = build_request(parts, self.temperature, self.max_tokens);

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(ref token) = self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(FormServeError::upstream)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FormServeError::UpstreamModel {
                message: format!("Vertex AI returned HTTP {}: {}", status, body.trim()),
            });
        }

        debug!("Vertex AI stream opened ({})", self.model);
        Ok(sse::data_events(response.bytes_stream(), parse_event))
    }

    fn name(&self) -> String {
        format!("vertex/{}", self.model)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

/// Build the `generateContent` body, preserving prompt order.
pub(crate) fn build_request(parts: &[ContentPart], temperature: f32, max_tokens: usize) -> GenerateRequest {
    let wire_parts = parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WirePart::Text { text: text.clone() },
            ContentPart::Image { data, format } => WirePart::InlineData {
                inline_data: InlineData {
                    mime_type: format.mime_type(),
                    data: STANDARD.encode(data),
                },
            },
        })
        .collect();

    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: wire_parts,
        }],
        generation_config: GenerationConfig {
            temperature,
            max_output_tokens: max_tokens,
        },
    }
}

/// Extract the text carried by one streamed `GenerateContentResponse`.
fn parse_event(data: &str) -> Result<Option<String>, FormServeError> {
    let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| FormServeError::UpstreamModel {
        message: format!("malformed stream event: {}", e),
    })?;

    if let Some(err) = chunk.error {
        return Err(FormServeError::UpstreamModel {
            message: err.message.unwrap_or_else(|| "unknown Vertex AI error".to_string()),
        });
    }

    if chunk.candidates.is_empty() {
        if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(FormServeError::UpstreamModel {
                message: format!("prompt blocked: {}", reason),
            });
        }
        return Ok(None);
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_keeps_part_order_and_encodes_images() {
        let parts = vec![
            ContentPart::png(vec![1u8, 2, 3]),
            ContentPart::text("Read the form"),
        ];
        let body = serde_json::to_value(build_request(&parts, 0.1, 256)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                        {"text": "Read the form"}
                    ]
                }],
                "generationConfig": {"temperature": 0.1f32, "maxOutputTokens": 256}
            })
        );
    }

    #[test]
    fn parses_candidate_text() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(parse_event(data).unwrap().as_deref(), Some("Hello"));
    }

    #[test]
    fn usage_only_event_has_no_text() {
        let data = r#"{"usageMetadata":{"promptTokenCount":10}}"#;
        assert_eq!(parse_event(data).unwrap(), None);
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let data = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(parse_event(data).unwrap_err().to_string().contains("SAFETY"));
    }

    #[test]
    fn error_event_is_an_error() {
        let data = r#"{"error":{"code":429,"message":"Quota exceeded"}}"#;
        assert!(parse_event(data).unwrap_err().to_string().contains("Quota exceeded"));
    }

    #[test]
    fn malformed_event_is_an_error() {
        assert!(parse_event("{not json").is_err());
    }

    #[test]
    fn url_uses_project_location_and_model() {
        let config = ServerConfig::builder()
            .project_id("demo-project")
            .location("asia-south1")
            .model("gemini-1.5-pro")
            .build()
            .unwrap();
        let client = VertexClient::from_config(&config).unwrap();
        assert_eq!(
            client.url(),
            "https://asia-south1-aiplatform.googleapis.com/v1/projects/demo-project/locations/asia-south1/publishers/google/models/gemini-1.5-pro:streamGenerateContent?alt=sse"
        );
        assert_eq!(client.name(), "vertex/gemini-1.5-pro");
    }

    #[test]
    fn missing_project_is_not_configured() {
        let config = ServerConfig::builder().project_id("  ").build().unwrap();
        assert!(matches!(
            VertexClient::from_config(&config),
            Err(FormServeError::ProviderNotConfigured { .. })
        ));
    }
}
