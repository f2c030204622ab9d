//! Shared primitives for scholar crates
//!
//! Caller identity, per-request context and the error-to-status contract
//! used by whatever network layer fronts the chat service.

#![allow(clippy::must_use_candidate)]

mod context;
mod error;

pub use context::{CallerId, RequestContext};
pub use error::HttpError;
