//! Guardian: the output-validation stage. Takes the model response out of
//! Sentinel and runs content_filter -> pii_scan -> decode -> parallel
//! judges -> disclaimer, producing the validated response handed back
//! across the Sentinel boundary for de-pseudonymization.

pub mod content_filter;
pub mod decode;
pub mod disclaimer;
pub mod error;
pub mod judges;
pub mod pii_scan;
pub mod pipeline;

pub use error::{GuardianError, Result};
pub use pipeline::{Guardian, GuardianOutcome};
