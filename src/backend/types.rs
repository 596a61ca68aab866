//! Wire types for the AskYourDatabase API

use serde::{Deserialize, Deserializer, Serialize};

/// One streamed piece of an answer
///
/// Each SSE event of the ask stream carries one of these. Only fragments with
/// `is_text` set contribute to the answer; the rest (progress, SQL, charts)
/// are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFragment {
    #[serde(default)]
    pub is_text: bool,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl AnswerFragment {
    /// A text fragment
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            is_text: true,
            content: content.into(),
        }
    }

    /// A non-text fragment (ignored by answer assembly)
    pub fn other(content: impl Into<String>) -> Self {
        Self {
            is_text: false,
            content: content.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/chatbot/v2/session`
#[derive(Debug, Serialize)]
pub(crate) struct CreateSessionRequest<'a> {
    pub chatbotid: &'a str,
    pub name: String,
    pub email: String,
}

/// Response of `POST /api/chatbot/v2/session`
#[derive(Debug, Deserialize)]
pub(crate) struct CreateSessionResponse {
    /// Login callback that sets the access token cookie
    pub url: String,
}

/// Body of `POST /api/ask`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AskRequest<'a> {
    pub question: &'a str,
    pub file_urls: Vec<String>,
    pub botid: &'a str,
    pub debug: bool,
}
