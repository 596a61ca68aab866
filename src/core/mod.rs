//! Core types for the relay
//!
//! This module provides the fundamental types used throughout the crate:
//! - `GatewayConfig` - Environment-driven configuration
//! - `GatewayError` - Error types for internal plumbing

pub mod config;
pub mod error;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
