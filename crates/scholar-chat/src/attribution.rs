//! Resolve evidence cited during a completion to named sources

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use scholar_core::CallerId;
use scholar_llm::{Message, ToolOutcome};
use serde::{Deserialize, Serialize};

use crate::sources::{EvidenceItem, GET_SOURCES, SourcesPayload, sort_evidence};
use crate::store::Datastore;

/// Evidence item with the display name of its document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedSource {
    pub id: String,
    pub document_id: String,
    /// Empty when the name could not be resolved
    pub name: String,
    pub text: String,
    pub score: f32,
    pub position: u32,
}

impl AttributedSource {
    fn new(item: EvidenceItem, name: String) -> Self {
        Self {
            id: item.id,
            document_id: item.document_id,
            name,
            text: item.text,
            score: item.score,
            position: item.position,
        }
    }
}

/// Collects `get_sources` results from a history and names their documents
#[derive(Clone)]
pub struct SourceAttributor {
    datastore: Arc<dyn Datastore>,
}

impl SourceAttributor {
    pub fn new(datastore: Arc<dyn Datastore>) -> Self {
        Self { datastore }
    }

    /// Attributed sources of every retrieval in `history`
    ///
    /// Chunks are deduplicated by id (first occurrence wins) and ordered by
    /// document, then position. A failed name lookup leaves the name empty.
    pub async fn attribute(&self, caller: &CallerId, history: &[Message]) -> Vec<AttributedSource> {
        let mut evidence = collect_evidence(history);
        sort_evidence(&mut evidence);

        let mut names: HashMap<String, String> = HashMap::new();
        let mut attributed = Vec::with_capacity(evidence.len());

        for item in evidence {
            let name = if let Some(name) = names.get(&item.document_id) {
                name.clone()
            } else {
                let name = match self.datastore.document_name(caller, &item.document_id).await {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::warn!(document = %item.document_id, error = %e, "document name lookup failed");
                        String::new()
                    }
                };
                names.insert(item.document_id.clone(), name.clone());
                name
            };

            attributed.push(AttributedSource::new(item, name));
        }

        attributed
    }
}

/// Evidence from all successful `get_sources` results, in history order
fn collect_evidence(history: &[Message]) -> Vec<EvidenceItem> {
    let mut seen = HashSet::new();
    let mut evidence = Vec::new();

    for result in history.iter().filter_map(Message::as_tool_result) {
        if result.tool_name != GET_SOURCES {
            continue;
        }
        let ToolOutcome::Payload(payload) = &result.outcome else {
            continue;
        };

        match serde_json::from_str::<SourcesPayload>(payload) {
            Ok(parsed) => {
                evidence.extend(parsed.sources.into_iter().filter(|item| seen.insert(item.id.clone())));
            }
            Err(e) => {
                tracing::debug!(invocation = %result.invocation_id, error = %e, "skipping unreadable sources payload");
            }
        }
    }

    evidence
}
