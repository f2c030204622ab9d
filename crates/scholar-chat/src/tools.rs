//! Named tool handlers offered to the model

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use scholar_llm::{ToolInvocation, ToolSpec};
use serde_json::{Map, Value};

use crate::error::{ChatError, ToolError};

/// Executable side of a tool definition
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and parameter schema advertised to the model
    fn spec(&self) -> ToolSpec;

    /// Run the tool and return its JSON result
    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError>;
}

/// Tools available to one completion, in registration order
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Add a handler under the name from its spec
    ///
    /// # Errors
    ///
    /// Returns `ChatError::InvalidRequest` if the name is already taken
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), ChatError> {
        let name = handler.spec().name;
        if self.tools.contains_key(&name) {
            return Err(ChatError::InvalidRequest(format!("duplicate tool name: {name}")));
        }

        self.tools.insert(name, handler);
        Ok(())
    }

    /// Specs of every registered tool
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|handler| handler.spec()).collect()
    }

    /// Look up the handler for an invocation
    ///
    /// # Errors
    ///
    /// Returns `ChatError::UnknownTool` if nothing is registered under the name
    pub fn handler(&self, invocation: &ToolInvocation) -> Result<Arc<dyn ToolHandler>, ChatError> {
        self.tools
            .get(&invocation.name)
            .cloned()
            .ok_or_else(|| ChatError::UnknownTool {
                tool: invocation.name.clone(),
            })
    }

    /// Execute one invocation
    ///
    /// # Errors
    ///
    /// Returns `ChatError::UnknownTool` or `ChatError::ToolExecution`
    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<String, ChatError> {
        let handler = self.handler(invocation)?;
        run(handler.as_ref(), invocation).await
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Call a resolved handler, mapping its failure to a fatal chat error
pub(crate) async fn run(handler: &dyn ToolHandler, invocation: &ToolInvocation) -> Result<String, ChatError> {
    tracing::debug!(tool = %invocation.name, invocation = %invocation.id, "executing tool");

    handler.call(&invocation.arguments).await.map_err(|e| {
        tracing::warn!(tool = %invocation.name, error = %e, "tool execution failed");
        ChatError::ToolExecution {
            tool: invocation.name.clone(),
            message: e.to_string(),
        }
    })
}
