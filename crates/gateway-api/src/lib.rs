//! Gateway: the HTTP-facing stage. Authenticates the caller, normalizes the
//! request, dispatches to Sentinel and Guardian in turn, translates the
//! resulting verdict into the HTTP contract, and accounts usage/metrics.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, CredentialLookup, CredentialLookupAdapter, UsageAccounting, UsageAccountingAdapter};
