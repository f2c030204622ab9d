//! Shared fixtures for the integration tests
//!
//! Every test binary compiles this module, so helpers unused by one binary
//! are expected.
#![allow(dead_code)]

pub mod chat;
pub mod config;
pub mod mock_search;
pub mod mock_vendor;
