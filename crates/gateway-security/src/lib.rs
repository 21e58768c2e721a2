//! # Gateway Security
//!
//! Credential resolution, advisory rate limiting, and security audit
//! logging for the LLM safety gateway.
//!
//! This crate provides:
//! - Credential resolution from an opaque bearer key's hash to a tenant
//! - API key scopes
//! - Advisory per-key rate limiting
//! - Security audit logging

pub mod api_key;
pub mod audit;
pub mod credential;
pub mod error;
pub mod rate_limit;

pub use api_key::*;
pub use audit::*;
pub use credential::*;
pub use error::{Result, SecurityError};
pub use rate_limit::*;
