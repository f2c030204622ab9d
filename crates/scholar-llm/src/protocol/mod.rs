//! Wire format types for vendor JSON protocols
//!
//! Pure serde structs used only at the HTTP boundary. Bedrock goes through
//! the AWS SDK and has no module here.

pub mod anthropic;
pub mod google;
