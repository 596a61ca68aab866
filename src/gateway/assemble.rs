//! Answer assembly
//!
//! Concatenates the text fragments of one streamed answer and bounds the
//! result to the outbound message limit.

use futures::StreamExt;

use crate::backend::{BackendError, FragmentStream};

use super::outcome::EMPTY_ANSWER_FALLBACK;

/// Appended to answers cut at the length limit
pub const TRUNCATION_MARKER: &str = "... (more)";

/// Consume `stream` to completion, concatenating text fragments in order
pub async fn collect_answer(mut stream: FragmentStream) -> Result<String, BackendError> {
    let mut buffer = String::new();
    let mut fragments = 0usize;

    while let Some(item) = stream.next().await {
        let fragment = item?;
        if fragment.is_text {
            buffer.push_str(&fragment.content);
            fragments += 1;
        }
    }

    tracing::debug!(
        "Assembled {} text fragments ({} chars)",
        fragments,
        buffer.chars().count()
    );
    Ok(buffer)
}

/// Trim, substitute the fallback for an empty answer, and enforce `max_chars`
pub fn finalize_answer(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return truncate_answer(EMPTY_ANSWER_FALLBACK, max_chars);
    }
    truncate_answer(trimmed, max_chars)
}

/// Cut `text` so it never exceeds `max_chars` characters
///
/// Oversized text keeps its first `max_chars - marker` characters followed by
/// [`TRUNCATION_MARKER`], so the result is exactly `max_chars` long.
pub fn truncate_answer(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_chars <= marker_len {
        return text.chars().take(max_chars).collect();
    }

    let mut truncated: String = text.chars().take(max_chars - marker_len).collect();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}
