//! Conversion between the neutral conversation model and vendor wire formats
//!
//! Outbound conversions encode the whole history on every turn; inbound
//! conversions produce a [`NeutralTurn`](crate::types::NeutralTurn).

pub mod anthropic;
pub mod google;
