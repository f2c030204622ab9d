//! Neutral conversation model
//!
//! Every vendor protocol converts to and from these types. The completion
//! driver only ever sees this representation.

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{Content, Message, Role};
pub use request::{GenerationOptions, TurnRequest};
pub use response::{NeutralTurn, Usage};
pub use tool::{ToolInvocation, ToolOutcome, ToolResult, ToolSpec};
