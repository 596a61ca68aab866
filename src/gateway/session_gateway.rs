//! Session gateway
//!
//! Resolves a backend token for an identity, asks one question with it, and
//! renews the token once if the backend rejects it:
//!
//! ```text
//! resolve token ──hit──────────────┐
//!      │ miss                      ▼
//!      └─► handshake ──ok──► streamed query ──401──► remove + handshake ──ok──► streamed query
//!              │ err               │ ok / err               │ err                    │
//!              ▼                   ▼                        ▼                        ▼
//!     SessionCreationFailed     assemble           SessionRetryFailed        assemble / fail
//! ```
//!
//! Two concurrent calls for the same identity may both find no session and
//! both handshake; the later `save` wins and the other token keeps working
//! until the backend rejects it, at which point the renew path replaces it.
//! Calls are not serialised per identity.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::{BackendError, QueryBackend};
use crate::core::config::{DEFAULT_MAX_MESSAGE_CHARS, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SESSION_TTL};
use crate::core::GatewayConfig;
use crate::session::SessionStore;

use super::assemble::{collect_answer, finalize_answer};
use super::outcome::{ErrorKind, QueryOutcome};

/// Limits applied to every `ask`
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Maximum answer length in characters
    pub max_message_chars: usize,

    /// Upper bound on each backend call (handshake, query + stream)
    pub request_timeout: Duration,

    /// Lifetime of a newly created session
    pub session_ttl: Duration,
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_message_chars: config.max_message_chars,
            request_timeout: config.request_timeout,
            session_ttl: config.session_ttl,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

/// Why a streamed query attempt did not produce an answer
enum AttemptError {
    Unauthorized,
    Failed(ErrorKind),
}

/// Entry point for relaying questions on behalf of identities
///
/// Cheap to clone; clones share the store and backend. All per-call state
/// lives on the stack of `ask`.
#[derive(Clone)]
pub struct SessionGateway {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn QueryBackend>,
    settings: GatewaySettings,
}

impl SessionGateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn QueryBackend>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            store,
            backend,
            settings,
        }
    }

    /// Ask `question` on behalf of `identity`
    ///
    /// Never fails: every error is folded into the returned outcome together
    /// with a user-presentable sentence.
    pub async fn ask(&self, identity: &str, question: &str) -> QueryOutcome {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("ask", %request_id, identity = %identity);

        async {
            let outcome = self.run(identity, question.trim()).await;
            match outcome.error_kind {
                None => tracing::info!(
                    "Answered ({} chars)",
                    outcome.answer_text.chars().count()
                ),
                Some(kind) => tracing::warn!("Ask failed: {}", kind),
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, identity: &str, question: &str) -> QueryOutcome {
        let token = match self.store.get(identity) {
            Some(record) => {
                tracing::debug!("Reusing session {:?}", record);
                record.token
            }
            None => match self.handshake(identity).await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("Session creation failed: {}", e);
                    return QueryOutcome::failed(handshake_failure(&e, ErrorKind::SessionCreationFailed));
                }
            },
        };

        match self.attempt(&token, question).await {
            Ok(answer) => return self.finish(&answer),
            Err(AttemptError::Failed(kind)) => return QueryOutcome::failed(kind),
            Err(AttemptError::Unauthorized) => {
                tracing::info!("Session rejected by {}, renewing", self.backend.name());
            }
        }

        if !self.store.remove(identity) {
            tracing::warn!("Could not remove rejected session");
        }

        let token = match self.handshake(identity).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Session renewal failed: {}", e);
                return QueryOutcome::failed(handshake_failure(&e, ErrorKind::SessionRetryFailed));
            }
        };

        match self.attempt(&token, question).await {
            Ok(answer) => self.finish(&answer),
            Err(AttemptError::Unauthorized) => {
                tracing::warn!("Renewed session rejected as well, giving up");
                QueryOutcome::failed(ErrorKind::RequestFailed)
            }
            Err(AttemptError::Failed(kind)) => QueryOutcome::failed(kind),
        }
    }

    /// Create a session and persist it; nothing is saved unless it completes
    async fn handshake(&self, identity: &str) -> Result<String, BackendError> {
        let token = match timeout(
            self.settings.request_timeout,
            self.backend.create_session(identity),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(BackendError::Timeout),
        };

        let ttl = i64::try_from(self.settings.session_ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = Utc::now().timestamp().saturating_add(ttl);
        if !self.store.save(identity, &token, expires_at) {
            tracing::warn!("Session could not be stored; using it for this request only");
        }

        Ok(token)
    }

    /// One streamed query, bounded end to end by the request timeout
    async fn attempt(&self, token: &str, question: &str) -> Result<String, AttemptError> {
        let result = timeout(self.settings.request_timeout, async {
            let stream = self.backend.ask(token, question).await?;
            Ok::<_, BackendError>(collect_answer(stream).await?)
        })
        .await;

        match result {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(BackendError::Unauthorized)) => Err(AttemptError::Unauthorized),
            Ok(Err(BackendError::Timeout)) | Err(_) => {
                tracing::warn!("Query exceeded {:?}", self.settings.request_timeout);
                Err(AttemptError::Failed(ErrorKind::Timeout))
            }
            Ok(Err(e)) => {
                tracing::warn!("Query failed: {}", e);
                Err(AttemptError::Failed(ErrorKind::RequestFailed))
            }
        }
    }

    fn finish(&self, answer: &str) -> QueryOutcome {
        QueryOutcome::answered(finalize_answer(answer, self.settings.max_message_chars))
    }
}

/// A handshake that ran out of time is reported as a timeout
fn handshake_failure(error: &BackendError, otherwise: ErrorKind) -> ErrorKind {
    match error {
        BackendError::Timeout => ErrorKind::Timeout,
        _ => otherwise,
    }
}
