//! Result of one `ask` call

use serde::Serialize;
use std::fmt;

/// Reply used when the backend streamed no text at all
pub const EMPTY_ANSWER_FALLBACK: &str =
    "I processed your request but have no specific response to share.";

/// Why an `ask` call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// The initial handshake failed
    SessionCreationFailed,
    /// The handshake after a rejected token failed
    SessionRetryFailed,
    /// A backend call exceeded its bounded wait
    Timeout,
    /// Any other transport or protocol fault
    RequestFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SessionCreationFailed => "SessionCreationFailed",
            ErrorKind::SessionRetryFailed => "SessionRetryFailed",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RequestFailed => "RequestFailed",
        }
    }

    /// User-presentable sentence sent in place of an answer
    pub fn fallback_message(&self) -> &'static str {
        match self {
            ErrorKind::SessionCreationFailed => {
                "Sorry, I couldn't establish a conversation session. Please try again."
            }
            ErrorKind::SessionRetryFailed => {
                "Sorry, I'm having trouble maintaining our conversation. Please try again."
            }
            ErrorKind::Timeout => "Sorry, the request took too long. Please try again.",
            ErrorKind::RequestFailed => "Sorry, something went wrong. Please try again.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome handed back to the transport layer
///
/// `answer_text` is always safe to send to the user, failure or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub success: bool,
    pub answer_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl QueryOutcome {
    /// A successful answer
    pub fn answered(answer_text: impl Into<String>) -> Self {
        Self {
            success: true,
            answer_text: answer_text.into(),
            error_kind: None,
        }
    }

    /// A failure carrying the fallback sentence for `kind`
    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            success: false,
            answer_text: kind.fallback_message().to_string(),
            error_kind: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_has_text() {
        for kind in [
            ErrorKind::SessionCreationFailed,
            ErrorKind::SessionRetryFailed,
            ErrorKind::Timeout,
            ErrorKind::RequestFailed,
        ] {
            let outcome = QueryOutcome::failed(kind);
            assert!(!outcome.success);
            assert!(!outcome.answer_text.is_empty());
            assert!(outcome.answer_text.contains("try again"));
            assert_eq!(outcome.error_kind, Some(kind));
        }
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(QueryOutcome::failed(ErrorKind::Timeout)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorKind"], "Timeout");

        let json = serde_json::to_value(QueryOutcome::answered("hi")).unwrap();
        assert_eq!(json["answerText"], "hi");
        assert!(json.get("errorKind").is_none());
    }
}
