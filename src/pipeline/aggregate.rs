//! Response aggregation: fold a model's fragment stream into one string.
//!
//! Fragments are appended strictly in arrival order. There is no partial
//! result: if the stream yields an error, everything collected so far is
//! dropped and the error is returned.
//!
//! Callers that want to watch the answer grow (a live log, a progress UI)
//! pass a [`FragmentObserver`]; it sees each fragment before it is appended.

use crate::error::FormServeError;
use futures::{pin_mut, Stream, StreamExt};
use tracing::debug;

/// Receives each fragment as it arrives.
///
/// Implemented for any `Fn(&str) + Send + Sync` closure.
pub trait FragmentObserver: Send + Sync {
    fn on_fragment(&self, fragment: &str);
}

impl<F> FragmentObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_fragment(&self, fragment: &str) {
        self(fragment)
    }
}

/// Echoes fragments to the `tracing` DEBUG log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl FragmentObserver for LogObserver {
    fn on_fragment(&self, fragment: &str) {
        debug!(target: "formserve::stream", "{}", fragment);
    }
}

/// Concatenate every fragment of `stream` in order.
pub async fn aggregate<S>(
    stream: S,
    observer: Option<&dyn FragmentObserver>,
) -> Result<String, FormServeError>
where
    S: Stream<Item = Result<String, FormServeError>>,
{
    pin_mut!(stream);

    let mut text = String::new();
    let mut count = 0usize;

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if let Some(obs) = observer {
            obs.on_fragment(&fragment);
        }
        text.push_str(&fragment);
        count += 1;
    }

    debug!("Aggregated {} fragments → {} chars", count, text.len());
    Ok(text)
}
