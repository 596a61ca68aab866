//! Session record type

use chrono::{DateTime, Utc};
use std::fmt;

/// One identity's live backend session
///
/// The token is a bearer secret: `Debug` prints only a redacted prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// External user handle (e.g. `whatsapp:+15550001111`)
    pub identity: String,

    /// Access token issued by the backend
    pub token: String,

    /// Expiry as unix seconds; the session is valid iff `now < expires_at`
    pub expires_at: i64,

    /// When the record was written (diagnostic only)
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record stamped with the current time
    pub fn new(identity: impl Into<String>, token: impl Into<String>, expires_at: i64) -> Self {
        Self {
            identity: identity.into(),
            token: token.into(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Whether the session is still valid at the given unix time
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("identity", &self.identity)
            .field("token", &redact_token(&self.token))
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Render a token safely for logs: a short prefix plus its length
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{}…({} chars)", prefix, token.chars().count())
}
