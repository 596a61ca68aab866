//! Conversational query backend
//!
//! `QueryBackend` is the seam between the gateway and the remote API.
//! `AydBackend` talks to AskYourDatabase over HTTP; tests plug in fakes.

pub mod ayd;
pub mod provider;
pub mod sse;
pub mod types;

pub use ayd::AydBackend;
pub use provider::{BackendError, FragmentStream, QueryBackend};
pub use sse::fragment_stream;
pub use types::AnswerFragment;
