pub mod core;
pub mod session;

// Remote API access
pub mod backend;

// Token lifecycle and answer assembly
pub mod gateway;

// Inbound/outbound message surface
pub mod transport;

pub mod logging;

pub use backend::{AydBackend, QueryBackend};
pub use crate::core::{GatewayConfig, GatewayError, GatewayResult};
pub use gateway::{ErrorKind, GatewaySettings, QueryOutcome, SessionGateway};
pub use session::{CsvSessionStore, MemorySessionStore, SessionRecord, SessionStore};
pub use transport::{Dispatcher, InboundMessage, MessageSender};
