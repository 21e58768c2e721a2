//! Sentinel: the input-security stage of the gateway pipeline. Takes a
//! `RequestState` coming out of the Gateway stage and runs it through
//! sanitize -> pseudonymize -> threat-detect -> optional compact-encode ->
//! parallel model fan-out, producing either a model response to hand to
//! Guardian or a terminal block verdict.

pub mod error;
pub mod fanout;
pub mod pipeline;
pub mod pseudonymize;
pub mod sanitize;
pub mod threat_detect;

pub use error::{Result, SentinelError};
pub use pipeline::{Sentinel, SentinelOutcome};
