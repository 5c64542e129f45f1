//! Server-sent-events decoding for streamed model responses.
//!
//! The HTTP body arrives as arbitrary byte chunks. Lines can straddle chunk
//! boundaries, and so can multi-byte UTF-8 characters, so bytes are buffered
//! until a full `\n`-terminated line is available. Each `data:` line is handed
//! to a backend-specific parser that returns the text it carries, if any.

use crate::error::FormServeError;
use crate::model::FragmentStream;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use tokio_stream::Stream;

/// Parses one `data:` payload into the text fragment it carries.
///
/// `Ok(None)` means the event carried no text (usage metadata, keep-alives).
pub type EventParser = fn(&str) -> Result<Option<String>, FormServeError>;

struct SseState<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    pending: VecDeque<Result<String, FormServeError>>,
    parse: EventParser,
    finished: bool,
}

impl<S> SseState<S> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.handle_line(&line);
        }
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.trim_start();
        if data.is_empty() || data == "[DONE]" {
            return;
        }

        match (self.parse)(data) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(e) => self.pending.push_back(Err(e)),
        }
    }
}

/// Turn a byte stream of SSE into a stream of text fragments.
///
/// A transport error ends the stream after yielding it as an `Err` item.
pub fn data_events<S, B, E>(bytes: S, parse: EventParser) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        inner: Box::pin(bytes),
        buf: Vec::new(),
        pending: VecDeque::new(),
        parse,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    st.buf.extend_from_slice(chunk.as_ref());
                    st.drain_lines();
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.pending.push_back(Err(FormServeError::upstream(e)));
                }
                None => {
                    st.finished = true;
                    st.flush();
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::aggregate::aggregate;

    fn echo(data: &str) -> Result<Option<String>, FormServeError> {
        match data {
            "skip" => Ok(None),
            "bad" => Err(FormServeError::upstream("bad event")),
            other => Ok(Some(other.to_string())),
        }
    }

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        stream::iter(parts.iter().map(|p| Ok(p.to_vec())).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn lines_split_across_chunks() {
        let s = data_events(
            chunks(&[b"data: Hel", b"lo\n\ndata: , wor", b"ld\r\n\n"]),
            echo,
        );
        assert_eq!(aggregate(s, None).await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn utf8_split_across_chunks() {
        let text = "data: café\n".as_bytes();
        let (a, b) = text.split_at(text.len() - 2); // splits the two-byte 'é'
        let s = data_events(chunks(&[a, b]), echo);
        assert_eq!(aggregate(s, None).await.unwrap(), "café");
    }

    #[tokio::test]
    async fn ignores_non_data_lines_and_done() {
        let s = data_events(
            chunks(&[b": keep-alive\nevent: message\ndata: skip\ndata: x\ndata: [DONE]\n"]),
            echo,
        );
        assert_eq!(aggregate(s, None).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed() {
        let s = data_events(chunks(&[b"data: a\ndata: b"]), echo);
        assert_eq!(aggregate(s, None).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn parser_error_surfaces() {
        let s = data_events(chunks(&[b"data: a\ndata: bad\ndata: c\n"]), echo);
        let err = aggregate(s, None).await.unwrap_err();
        assert!(err.to_string().contains("bad event"));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let s = stream::iter(vec![
            Ok(b"data: a\n".to_vec()),
            Err(std::io::Error::other("reset by peer")),
            Ok(b"data: never\n".to_vec()),
        ]);
        let mut events = data_events(s, echo);
        assert_eq!(events.next().await.unwrap().unwrap(), "a");
        assert!(events.next().await.unwrap().is_err());
        assert!(events.next().await.is_none());
    }
}
