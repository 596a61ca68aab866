//! Session-scoped conversational gateway
//!
//! `SessionGateway::ask` is the single entry point the transport layer uses:
//! it resolves (or creates) the identity's backend session, streams the
//! answer, renews a rejected session once, and returns a [`QueryOutcome`].

pub mod assemble;
pub mod outcome;
pub mod session_gateway;

pub use assemble::{finalize_answer, truncate_answer, TRUNCATION_MARKER};
pub use outcome::{ErrorKind, QueryOutcome, EMPTY_ANSWER_FALLBACK};
pub use session_gateway::{GatewaySettings, SessionGateway};
