//! Server-sent event decoding for the ask stream
//!
//! The backend answers `POST /api/ask` with an SSE body where every event's
//! `data` is a JSON [`AnswerFragment`]. Events are separated by blank lines;
//! multi-line `data` fields are joined with `\n`. Comment lines and other
//! fields are ignored, as are payloads that don't parse. Invalid UTF-8 is
//! replaced rather than treated as a read failure.

use bytes::Buf;
use futures::stream::Stream;
use std::borrow::Cow;
use std::io;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

use super::provider::{BackendError, FragmentStream};
use super::types::AnswerFragment;

/// Decode an SSE byte stream into answer fragments, in arrival order
///
/// The stream ends after the first read error, which is yielded as the last
/// item.
pub fn fragment_stream<S, B>(bytes: S) -> FragmentStream
where
    S: Stream<Item = io::Result<B>> + Send + 'static,
    B: Buf + Send + 'static,
{
    let stream_reader = StreamReader::new(Box::pin(bytes));
    let mut buf_reader = tokio::io::BufReader::new(stream_reader);

    let stream = async_stream::stream! {
        let mut raw: Vec<u8> = Vec::new();
        let mut data: Vec<String> = Vec::new();
        let mut event_index: usize = 0;

        loop {
            raw.clear();
            match buf_reader.read_until(b'\n', &mut raw).await {
                Ok(0) => {
                    if let Some(fragment) = take_event(&mut data, event_index) {
                        yield Ok(fragment);
                    }
                    tracing::debug!("SSE stream ended after {} events", event_index);
                    break;
                }
                Ok(_) => {
                    let line = decode_line(&raw);
                    if line.is_empty() {
                        if let Some(fragment) = take_event(&mut data, event_index) {
                            yield Ok(fragment);
                        }
                        event_index += 1;
                        continue;
                    }

                    if line.starts_with(':') {
                        continue;
                    }

                    let (field, value) = split_field(&line);
                    if field == "data" {
                        data.push(value.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!("SSE stream read failed: {}", e);
                    yield Err(BackendError::from(e));
                    break;
                }
            }
        }
    };

    Box::pin(stream)
}

/// One line without its `\n` or `\r\n` terminator
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

/// Split `field: value` per the SSE line format (one leading space dropped)
fn split_field(line: &str) -> (&str, &str) {
    match line.split_once(':') {
        Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    }
}

/// Dispatch the buffered event, if any
fn take_event(data: &mut Vec<String>, event_index: usize) -> Option<AnswerFragment> {
    if data.is_empty() {
        return None;
    }

    let payload = data.join("\n");
    data.clear();

    if payload.trim() == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<AnswerFragment>(&payload) {
        Ok(fragment) => Some(fragment),
        Err(e) => {
            tracing::warn!("Skipping unparsable SSE event #{}: {}", event_index, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::StreamExt;

    fn chunks(parts: &[&str]) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let owned: Vec<io::Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::from(p.to_string())))
            .collect();
        futures::stream::iter(owned)
    }

    async fn collect(stream: FragmentStream) -> Vec<Result<AnswerFragment, BackendError>> {
        stream.collect().await
    }

    async fn collect_ok(stream: FragmentStream) -> Vec<AnswerFragment> {
        collect(stream)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_decodes_events_in_order() {
        let body = chunks(&[
            "data: {\"isText\": true, \"content\": \"Hel\"}\n\n",
            "data: {\"isText\": true, \"content\": \"lo\"}\n\n",
            "data: {\"isText\": false, \"content\": \"SELECT 1\"}\n\n",
            "data: {\"isText\": true, \"content\": \" world\"}\n\n",
        ]);

        let fragments = collect_ok(fragment_stream(body)).await;
        assert_eq!(
            fragments,
            vec![
                AnswerFragment::text("Hel"),
                AnswerFragment::text("lo"),
                AnswerFragment::other("SELECT 1"),
                AnswerFragment::text(" world"),
            ]
        );
    }

    #[tokio::test]
    async fn test_events_split_across_chunks() {
        let body = chunks(&[
            "da",
            "ta: {\"isText\": tr",
            "ue, \"content\": \"abc\"}\r\n",
            "\r\ndata:{\"isText\":true,\"content\":\"def\"}\n",
            "\n",
        ]);

        let fragments = collect_ok(fragment_stream(body)).await;
        assert_eq!(
            fragments,
            vec![AnswerFragment::text("abc"), AnswerFragment::text("def")]
        );
    }

    #[tokio::test]
    async fn test_ignores_comments_fields_and_garbage() {
        let body = chunks(&[
            ": keep-alive\n\n",
            "event: message\nid: 7\nretry: 1000\n",
            "data: {\"isText\": true, \"content\": \"ok\"}\n\n",
            "data: not json\n\n",
            "data: [DONE]\n\n",
        ]);

        let fragments = collect_ok(fragment_stream(body)).await;
        assert_eq!(fragments, vec![AnswerFragment::text("ok")]);
    }

    #[tokio::test]
    async fn test_multiline_data_and_trailing_event() {
        let body = chunks(&[
            "data: {\"isText\": true,\n",
            "data:  \"content\": \"joined\"}\n\n",
            "data: {\"isText\": true, \"content\": \"tail\"}",
        ]);

        let fragments = collect_ok(fragment_stream(body)).await;
        assert_eq!(
            fragments,
            vec![AnswerFragment::text("joined"), AnswerFragment::text("tail")]
        );
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let parts: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from("data: {\"isText\": true, \"content\": \"a\"}\n\n")),
            Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
            Ok(Bytes::from("data: {\"isText\": true, \"content\": \"never\"}\n\n")),
        ];

        let items = collect(fragment_stream(futures::stream::iter(parts))).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), &AnswerFragment::text("a"));
        assert!(matches!(items[1], Err(BackendError::Timeout)));
    }

    #[tokio::test]
    async fn test_invalid_utf8_keeps_rest_of_answer() {
        let mut bad = b"data: {\"isText\": true, \"content\": \"caf".to_vec();
        bad.extend_from_slice(&[0xff]);
        bad.extend_from_slice(b"\"}\n\n");
        let parts: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from("data: {\"isText\": true, \"content\": \"Hel\"}\n\n")),
            Ok(Bytes::from(bad)),
            Ok(Bytes::from("data: {\"isText\": true, \"content\": \"lo\"}\n\n")),
        ];

        let fragments = collect_ok(fragment_stream(futures::stream::iter(parts))).await;
        assert_eq!(
            fragments,
            vec![
                AnswerFragment::text("Hel"),
                AnswerFragment::text("caf\u{FFFD}"),
                AnswerFragment::text("lo"),
            ]
        );
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"data: x\r\n"), "data: x");
        assert_eq!(decode_line(b"data: x\n"), "data: x");
        assert_eq!(decode_line(b"tail"), "tail");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn test_split_field() {
        assert_eq!(split_field("data: x"), ("data", "x"));
        assert_eq!(split_field("data:x"), ("data", "x"));
        assert_eq!(split_field("data:  x"), ("data", " x"));
        assert_eq!(split_field("data"), ("data", ""));
    }
}
