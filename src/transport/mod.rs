//! Transport-facing surface
//!
//! The message provider (webhook, signature checks, outbound API) lives
//! outside this crate. It hands validated messages to a [`Dispatcher`], which
//! acknowledges immediately and answers each one on its own task through a
//! [`MessageSender`].

pub mod console;

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::gateway::SessionGateway;

pub use console::{parse_console_line, Console};

/// One inbound chat message, already validated by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender identity (e.g. `whatsapp:+15550001111`)
    pub sender: String,
    /// Message text
    pub body: String,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// Outbound delivery of a final answer
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Answers inbound messages on independent tasks
#[derive(Clone)]
pub struct Dispatcher {
    gateway: SessionGateway,
    sender: Arc<dyn MessageSender>,
}

impl Dispatcher {
    pub fn new(gateway: SessionGateway, sender: Arc<dyn MessageSender>) -> Self {
        Self { gateway, sender }
    }

    /// Spawn the ask-and-reply task for `message` and return immediately
    ///
    /// The task shares nothing with other tasks except the gateway.
    pub fn dispatch(&self, message: InboundMessage) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let sender = Arc::clone(&self.sender);

        tokio::spawn(async move {
            let outcome = gateway.ask(&message.sender, &message.body).await;
            if let Err(e) = sender.send(&message.sender, &outcome.answer_text).await {
                tracing::error!("Failed to deliver reply to {}: {:#}", message.sender, e);
            }
        })
    }
}
