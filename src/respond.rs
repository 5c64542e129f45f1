//! Request orchestration: normalise → generate → aggregate.
//!
//! Every route funnels through [`respond`]; the handlers only differ in which
//! multipart fields they read and which instruction they send.

use crate::config::ServerConfig;
use crate::content::{AggregatedResult, ContentPart, UploadedDocument};
use crate::error::FormServeError;
use crate::model::ModelClient;
use crate::pipeline::aggregate::{aggregate, FragmentObserver, LogObserver};
use crate::pipeline::normalize::normalize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Run one upload + instruction through the model and collect the answer.
pub async fn respond(
    client: &dyn ModelClient,
    doc: Option<UploadedDocument>,
    instruction: &str,
    config: &ServerConfig,
) -> Result<AggregatedResult, FormServeError> {
    let start = Instant::now();

    let parts = normalize(doc, instruction, config).await?;
    log_prompt(&parts);

    let observer: Option<&dyn FragmentObserver> = if config.echo_stream {
        Some(&LogObserver)
    } else {
        None
    };

    let call = async {
        let stream = client.generate(&parts).await?;
        aggregate(stream, observer).await
    };

    let text = if config.api_timeout_secs > 0 {
        let secs = config.api_timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), call)
            .await
            .map_err(|_| FormServeError::UpstreamTimeout { secs })??
    } else {
        call.await?
    };

    info!(
        "{}: {} parts → {} chars in {}ms",
        client.name(),
        parts.len(),
        text.len(),
        start.elapsed().as_millis()
    );

    Ok(AggregatedResult { text, parts })
}

/// Log the prompt part by part, images summarised by size.
fn log_prompt(parts: &[ContentPart]) {
    for (i, part) in parts.iter().enumerate() {
        match part {
            ContentPart::Image { data, format } => {
                debug!("prompt[{}]: image {} ({} bytes)", i, format.mime_type(), data.len())
            }
            ContentPart::Text(t) => debug!("prompt[{}]: text\n{}", i, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FragmentStream;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;

    struct Canned {
        fragments: Vec<&'static str>,
        delay: Option<Duration>,
        seen: Mutex<Vec<ContentPart>>,
    }

    impl Canned {
        fn new(fragments: Vec<&'static str>) -> Self {
            Self {
                fragments,
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for Canned {
        async fn generate(&self, parts: &[ContentPart]) -> Result<FragmentStream, FormServeError> {
            self.seen.lock().unwrap().extend_from_slice(parts);
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            let items: Vec<_> = self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(stream::iter(items)))
        }

        fn name(&self) -> String {
            "canned".into()
        }
    }

    #[tokio::test]
    async fn text_only_round_trip() {
        let client = Canned::new(vec!["Hel", "lo, ", "world"]);
        let config = ServerConfig::default();

        let result = respond(&client, None, "greet me", &config).await.unwrap();

        assert_eq!(result.text, "Hello, world");
        assert_eq!(result.parts, vec![ContentPart::text("greet me")]);
        assert_eq!(*client.seen.lock().unwrap(), result.parts);
    }

    #[tokio::test]
    async fn unsupported_upload_never_reaches_model() {
        let client = Canned::new(vec!["unused"]);
        let doc = UploadedDocument::new(&b"PK"[..], "application/zip");

        let err = respond(&client, Some(doc), "x", &ServerConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FormServeError::UnsupportedFileType { .. }));
        assert!(client.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out() {
        let mut client = Canned::new(vec!["late"]);
        client.delay = Some(Duration::from_secs(120));
        let config = ServerConfig::builder().api_timeout_secs(5).build().unwrap();

        let err = respond(&client, None, "x", &config).await.unwrap_err();
        assert!(matches!(err, FormServeError::UpstreamTimeout { secs: 5 }));
    }
}
