//! AskYourDatabase HTTP client
//!
//! Implements [`QueryBackend`] against the AskYourDatabase chatbot API:
//!
//! 1. `POST /api/chatbot/v2/session` (API key auth) returns a login callback URL
//! 2. `GET <callback>` (following redirects) sets an `accessToken` cookie
//! 3. `POST /api/ask` with `x-ayd-access-token` streams the answer as SSE
//!
//! ```ignore
//! let backend = AydBackend::new(&GatewayConfig::from_env()?)?;
//! let token = backend.create_session("whatsapp:+15550001111").await?;
//! let stream = backend.ask(&token, "How many rolls of linen are in stock?").await?;
//! ```

use futures::StreamExt;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode, Url};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{GatewayConfig, GatewayResult};
use crate::session::redact_token;

use super::provider::{BackendError, FragmentStream, QueryBackend};
use super::sse::fragment_stream;
use super::types::{AskRequest, CreateSessionRequest, CreateSessionResponse};

/// Cookie the login callback stores the access token in
const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Header the ask endpoint reads the access token from
const ACCESS_TOKEN_HEADER: &str = "x-ayd-access-token";

/// AskYourDatabase backend
#[derive(Debug, Clone)]
pub struct AydBackend {
    client: Client,
    api_key: String,
    bot_id: String,
    base_url: String,
    timeout: Duration,
}

impl AydBackend {
    /// Create a backend from the gateway configuration
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            bot_id: config.bot_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
        })
    }

    fn session_url(&self) -> String {
        format!("{}/api/chatbot/v2/session", self.base_url)
    }

    fn ask_url(&self) -> String {
        format!("{}/api/ask?debug=false", self.base_url)
    }

    /// Read a non-success body for diagnostics
    async fn error_status(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        BackendError::Status { status, body }
    }
}

#[async_trait::async_trait]
impl QueryBackend for AydBackend {
    async fn create_session(&self, identity: &str) -> Result<String, BackendError> {
        tracing::info!("[AYD] Creating session for {}", identity);

        // Each handshake gets its own jar so tokens never leak between identities
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .timeout(self.timeout)
            .build()?;

        let request = CreateSessionRequest {
            chatbotid: &self.bot_id,
            name: display_name(identity),
            email: placeholder_email(identity),
        };

        let response = client
            .post(self.session_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_status(response).await;
            tracing::error!("[AYD] Session creation failed: {}", err);
            return Err(err);
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| match BackendError::from(e) {
                BackendError::Timeout => BackendError::Timeout,
                other => BackendError::protocol(format!("invalid session response: {}", other)),
            })?;

        let callback = Url::parse(&created.url)
            .map_err(|e| BackendError::protocol(format!("invalid callback URL: {}", e)))?;
        tracing::debug!("[AYD] Following login callback on {}", callback.host_str().unwrap_or("?"));

        let login = client.get(callback.clone()).send().await?;
        if !login.status().is_success() {
            let err = Self::error_status(login).await;
            tracing::error!("[AYD] Login callback failed: {}", err);
            return Err(err);
        }

        let mut candidates = vec![login.url().clone(), callback];
        if let Ok(base) = Url::parse(&self.base_url) {
            candidates.push(base);
        }

        let token = candidates
            .iter()
            .filter_map(|url| jar.cookies(url))
            .find_map(|header| cookie_value(&header, ACCESS_TOKEN_COOKIE))
            .ok_or(BackendError::MissingToken)?;

        tracing::info!("[AYD] Session created (token {})", redact_token(&token));
        Ok(token)
    }

    async fn ask(&self, token: &str, question: &str) -> Result<FragmentStream, BackendError> {
        tracing::debug!("[AYD] Asking with token {}", redact_token(token));

        let request = AskRequest {
            question,
            file_urls: Vec::new(),
            botid: &self.bot_id,
            debug: false,
        };

        let response = self
            .client
            .post(self.ask_url())
            .header(ACCESS_TOKEN_HEADER, token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!("[AYD] Access token rejected");
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let err = Self::error_status(response).await;
            tracing::error!("[AYD] Ask failed: {}", err);
            return Err(err);
        }

        tracing::debug!("[AYD] Streaming response started");

        let byte_stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                if e.is_timeout() {
                    io::Error::new(io::ErrorKind::TimedOut, e)
                } else {
                    io::Error::other(e)
                }
            })
        });

        Ok(fragment_stream(byte_stream))
    }

    fn name(&self) -> &str {
        "askyourdatabase"
    }
}

/// Display name registered for an identity
fn display_name(identity: &str) -> String {
    format!("WhatsApp User {}", identity)
}

/// Synthetic email registered for an identity
///
/// The transport prefix (`whatsapp:`) and any non-alphanumeric characters are
/// dropped: `whatsapp:+15550001111` -> `wa15550001111@example.com`.
fn placeholder_email(identity: &str) -> String {
    let handle = identity.rsplit(':').next().unwrap_or(identity);
    let local: String = handle.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("wa{}@example.com", local)
}

/// Find `name=value` in a `Cookie` header value
fn cookie_value(header: &HeaderValue, name: &str) -> Option<String> {
    header
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
