//! Decoder for the extraction service's `text/event-stream` channel.
//!
//! Turns a raw byte stream into typed [`ProgressEvent`]s. Frames that
//! do not parse are skipped with a warning so one unrecognized event
//! cannot kill an otherwise healthy stream; transport errors end the
//! stream (the status poll takes over from there).

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use tracing::warn;

use crate::error::ServiceError;
use crate::traits::extractor::EventStream;
use crate::types::events::ProgressEvent;

/// Decode an SSE byte stream into progress events.
pub fn decode<S, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(try_stream! {
        let mut buffer = String::new();
        let mut event_name: Option<String> = None;
        let mut data = String::new();

        for await chunk in bytes {
            let chunk = chunk.map_err(|e| ServiceError::Stream(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);

                if line.is_empty() {
                    // Blank line terminates a frame.
                    if !data.is_empty() {
                        if let Some(event) = parse_frame(event_name.as_deref(), &data) {
                            yield event;
                        }
                    }
                    event_name = None;
                    data.clear();
                } else if let Some(name) = line.strip_prefix("event:") {
                    event_name = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    if !data.is_empty() {
                        data.push('\n');
                    }
                    data.push_str(payload.trim_start());
                }
                // Comments (":...") and unknown fields are ignored.
            }
        }
    })
}

/// Parse one frame's JSON payload, tagging it with the frame's event
/// name when the payload does not carry one itself.
fn parse_frame(event_name: Option<&str>, data: &str) -> Option<ProgressEvent> {
    let mut value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(error) => {
            warn!(error = %error, "skipping unparseable event frame");
            return None;
        }
    };

    if let (Some(name), Some(object)) = (event_name, value.as_object_mut()) {
        object
            .entry("event")
            .or_insert_with(|| serde_json::Value::String(name.to_string()));
    }

    match serde_json::from_value(value) {
        Ok(event) => Some(event),
        Err(error) => {
            warn!(
                event = event_name.unwrap_or("<unnamed>"),
                error = %error,
                "skipping unrecognized event frame"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_stream(chunks: Vec<&'static str>) -> impl Stream<Item = Result<Bytes, String>> {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))))
    }

    #[tokio::test]
    async fn decodes_framed_events() {
        let stream = byte_stream(vec![
            "event: page_queued\ndata: {\"url\":\"https://acme.com/a\"}\n\n",
            "event: session_completed\ndata: {\"stats\":{}}\n\n",
        ]);

        let events: Vec<_> = decode(stream).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0].as_ref().unwrap(),
            ProgressEvent::PageQueued { url } if url == "https://acme.com/a"
        ));
        assert!(matches!(
            events[1].as_ref().unwrap(),
            ProgressEvent::SessionCompleted { .. }
        ));
    }

    #[tokio::test]
    async fn reassembles_frames_split_across_chunks() {
        let stream = byte_stream(vec![
            "event: page_ex",
            "tracted\ndata: {\"url\":\"https://acme.com/b\",",
            "\"entities_found\":2}\n",
            "\n",
        ]);

        let events: Vec<_> = decode(stream).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].as_ref().unwrap(),
            ProgressEvent::PageExtracted { entities_found: 2, .. }
        ));
    }

    #[tokio::test]
    async fn skips_unrecognized_frames() {
        let stream = byte_stream(vec![
            "event: totally_new_event\ndata: {\"x\":1}\n\n",
            ": heartbeat comment\n\n",
            "event: error\ndata: {\"message\":\"boom\"}\n\n",
        ]);

        let events: Vec<_> = decode(stream).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].as_ref().unwrap(),
            ProgressEvent::Error { message } if message == "boom"
        ));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let chunks: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from_static(
                b"event: page_queued\ndata: {\"url\":\"https://acme.com/a\"}\n\n",
            )),
            Err("connection reset".to_string()),
        ];
        let stream = futures::stream::iter(chunks);

        let events: Vec<_> = decode(stream).collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(
            events[1].as_ref().unwrap_err(),
            ServiceError::Stream(message) if message.contains("connection reset")
        ));
    }
}
