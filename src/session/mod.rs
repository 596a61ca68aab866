//! Session storage for backend access tokens
//!
//! This module maps an external identity (phone number or equivalent handle)
//! to the backend token issued for it, with expiry-aware reads.
//!
//! `SessionStore` is the contract the gateway depends on; `CsvSessionStore`
//! persists to a single file and `MemorySessionStore` keeps everything in
//! process.

pub mod csv_store;
pub mod record;
pub mod store;

pub use csv_store::CsvSessionStore;
pub use record::{redact_token, SessionRecord};
pub use store::{MemorySessionStore, SessionStore};
