//! `edgequake-llm` backend: any chat provider with vision support.
//!
//! The prompt is sent as one user turn: every image part becomes a base64
//! `ImageData` attachment and the text parts, in order, form the message
//! body. The provider API is request/response, so the whole completion is
//! yielded as a single fragment.

use crate::config::ServerConfig;
use crate::content::ContentPart;
use crate::error::FormServeError;
use crate::model::{FragmentStream, ModelClient};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::stream;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
}

impl ProviderClient {
    pub fn from_config(config: &ServerConfig) -> Result<Self, FormServeError> {
        let provider = resolve_provider(config)?;
        let label = format!(
            "{}/{}",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model.as_deref().unwrap_or("default")
        );
        info!("LLM provider client: {}", label);

        Ok(Self {
            provider,
            label,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ModelClient for ProviderClient {
    async fn generate(&self, parts: &[ContentPart]) -> Result<FragmentStream, FormServeError> {
        let (text, images) = split_parts(parts);
        let messages = vec![ChatMessage::user_with_images(text.as_str(), images)];

        let response = self
            .provider
            .chat(&messages, Some(&self.build_options()))
            .await
            .map_err(FormServeError::upstream)?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        let content = response.content;
        Ok(Box::pin(stream::iter(vec![Ok(content)])))
    }

    fn name(&self) -> String {
        self.label.clone()
    }
}

/// Separate a prompt into the message text (text parts joined by blank lines,
/// in order) and the image attachments (in order).
fn split_parts(parts: &[ContentPart]) -> (String, Vec<ImageData>) {
    let mut texts = Vec::new();
    let mut images = Vec::new();

    for part in parts {
        match part {
            ContentPart::Text(t) => texts.push(t.as_str()),
            ContentPart::Image { data, format } => {
                images.push(ImageData::new(STANDARD.encode(data), format.mime_type()).with_detail("high"))
            }
        }
    }

    (texts.join("\n\n"), images)
}

/// Resolve the LLM provider from config, then environment.
fn resolve_provider(config: &ServerConfig) -> Result<Arc<dyn LLMProvider>, FormServeError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        return create_provider(name, model);
    }

    // Honour EDGEQUAKE_LLM_PROVIDER + EDGEQUAKE_MODEL when both set
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    let (llm_provider, _) =
        ProviderFactory::from_env().map_err(|e| FormServeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!("No LLM provider auto-detected: {}", e),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, FormServeError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        FormServeError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_order_of_texts_and_images() {
        let parts = vec![
            ContentPart::png(vec![1u8]),
            ContentPart::png(vec![2u8]),
            ContentPart::text("first"),
            ContentPart::text("second"),
        ];
        let (text, images) = split_parts(&parts);

        assert_eq!(text, "first\n\nsecond");
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].mime_type, "image/png");
        assert_eq!(STANDARD.decode(&images[0].data).unwrap(), vec![1u8]);
        assert_eq!(STANDARD.decode(&images[1].data).unwrap(), vec![2u8]);
    }

    #[test]
    fn text_only_prompt_has_no_images() {
        let (text, images) = split_parts(&[ContentPart::text("hi")]);
        assert_eq!(text, "hi");
        assert!(images.is_empty());
    }
}
