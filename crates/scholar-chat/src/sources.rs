//! Evidence retrieval tool

use std::sync::Arc;

use async_trait::async_trait;
use scholar_core::CallerId;
use scholar_llm::{ToolSpec, Usage};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::ToolError;
use crate::retrieval::{Retrieval, SearchQuery};
use crate::store::{Datastore, ModelUsage};
use crate::tools::ToolHandler;

/// Name the model uses to request evidence
pub const GET_SOURCES: &str = "get_sources";

const DESCRIPTION: &str = "Retrieves the sources for the prompt. The prompt should be optimized for embedding \
                           retrieval. The tool will return a list of sources in JSON format with the following \
                           fields: SourceID, Content.";

const PROMPT_DESCRIPTION: &str =
    "The topic for which to retrieve sources. The prompt should be optimized for embedding retrieval.";

/// A scored passage from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Chunk id, unique within one result set
    pub id: String,
    pub document_id: String,
    pub text: String,
    pub score: f32,
    /// Position of the chunk within its document
    pub position: u32,
}

/// Tool result body of `get_sources`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesPayload {
    pub sources: Vec<EvidenceItem>,
}

/// Order evidence by document, then by position in the document
///
/// The sort is stable, so equal keys keep their ranking order.
pub fn sort_evidence(items: &mut [EvidenceItem]) {
    items.sort_by(|a, b| {
        a.document_id
            .cmp(&b.document_id)
            .then_with(|| a.position.cmp(&b.position))
    });
}

/// `get_sources` bound to one caller and collection
pub struct GetSources {
    retrieval: Arc<dyn Retrieval>,
    datastore: Arc<dyn Datastore>,
    caller: CallerId,
    collection_id: Uuid,
    limit: u32,
    threshold: f32,
}

impl GetSources {
    pub fn new(
        retrieval: Arc<dyn Retrieval>,
        datastore: Arc<dyn Datastore>,
        caller: CallerId,
        collection_id: Uuid,
        limit: u32,
        threshold: f32,
    ) -> Self {
        Self {
            retrieval,
            datastore,
            caller,
            collection_id,
            limit,
            threshold,
        }
    }
}

#[async_trait]
impl ToolHandler for GetSources {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GET_SOURCES.to_owned(),
            description: DESCRIPTION.to_owned(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "prompt": {
                        "type": "string",
                        "description": PROMPT_DESCRIPTION,
                    }
                },
                "required": ["prompt"],
            }),
        }
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, ToolError> {
        let prompt = arguments
            .get("prompt")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("`prompt` must be a string".to_owned()))?;

        let query = SearchQuery {
            caller: self.caller.clone(),
            collection_id: self.collection_id,
            query: prompt.to_owned(),
            limit: self.limit,
            threshold: self.threshold,
        };
        let response = self.retrieval.search(&query).await?;

        tracing::debug!(
            collection = %self.collection_id,
            results = response.results.len(),
            "sources retrieved"
        );

        let usage = ModelUsage::new(
            self.caller.clone(),
            response.usage.model_id,
            Usage::new(response.usage.tokens, 0),
        );
        if let Err(e) = self.datastore.insert_model_usage(usage).await {
            tracing::warn!(error = %e, "failed to record retrieval usage");
        }

        let mut sources = response.results;
        sort_evidence(&mut sources);

        Ok(serde_json::to_string(&SourcesPayload { sources })?)
    }
}
