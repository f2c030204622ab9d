//! Thread, document and usage persistence

use async_trait::async_trait;
use dashmap::DashMap;
use jiff::Timestamp;
use scholar_core::CallerId;
use scholar_llm::{Message, Usage};
use uuid::Uuid;

use crate::error::StoreError;

/// Persisted conversation of one caller over one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: Uuid,
    pub caller: CallerId,
    pub collection_id: Uuid,
    pub messages: Vec<Message>,
    pub updated_at: Timestamp,
}

impl Thread {
    /// Empty thread with a fresh id
    pub fn new(caller: CallerId, collection_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            caller,
            collection_id,
            messages: Vec::new(),
            updated_at: Timestamp::now(),
        }
    }
}

/// Token consumption attributed to a caller and model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUsage {
    pub id: Uuid,
    pub caller: CallerId,
    pub model_id: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub timestamp: Timestamp,
}

impl ModelUsage {
    pub fn new(caller: CallerId, model_id: impl Into<String>, usage: Usage) -> Self {
        Self {
            id: Uuid::new_v4(),
            caller,
            model_id: model_id.into(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            timestamp: Timestamp::now(),
        }
    }
}

/// Storage the chat service depends on
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Display name of a document the caller can see
    async fn document_name(&self, caller: &CallerId, document_id: &str) -> Result<String, StoreError>;

    /// Load one of the caller's threads
    async fn load_thread(&self, caller: &CallerId, thread_id: Uuid) -> Result<Thread, StoreError>;

    /// Insert or replace a thread
    async fn store_thread(&self, thread: &Thread) -> Result<(), StoreError>;

    /// Ids of the caller's threads over one collection, most recently updated first
    async fn list_thread_ids(&self, caller: &CallerId, collection_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Remove one of the caller's threads
    async fn delete_thread(&self, caller: &CallerId, thread_id: Uuid) -> Result<(), StoreError>;

    /// Append a usage record
    async fn insert_model_usage(&self, usage: ModelUsage) -> Result<(), StoreError>;
}

/// In-process datastore
///
/// Concurrent writes to the same thread are not coordinated; the last
/// `store_thread` wins.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    threads: DashMap<(CallerId, Uuid), Thread>,
    documents: DashMap<(CallerId, String), String>,
    usage: DashMap<Uuid, ModelUsage>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a document name visible to a caller
    pub fn insert_document(&self, caller: &CallerId, document_id: impl Into<String>, name: impl Into<String>) {
        self.documents.insert((caller.clone(), document_id.into()), name.into());
    }

    /// Snapshot of every usage record, oldest first
    pub fn usage_records(&self) -> Vec<ModelUsage> {
        let mut records: Vec<ModelUsage> = self.usage.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|record| record.timestamp);
        records
    }

    /// Number of stored threads
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn document_name(&self, caller: &CallerId, document_id: &str) -> Result<String, StoreError> {
        self.documents
            .get(&(caller.clone(), document_id.to_owned()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "document",
                id: document_id.to_owned(),
            })
    }

    async fn load_thread(&self, caller: &CallerId, thread_id: Uuid) -> Result<Thread, StoreError> {
        self.threads
            .get(&(caller.clone(), thread_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                kind: "thread",
                id: thread_id.to_string(),
            })
    }

    async fn store_thread(&self, thread: &Thread) -> Result<(), StoreError> {
        let mut thread = thread.clone();
        thread.updated_at = Timestamp::now();
        self.threads.insert((thread.caller.clone(), thread.id), thread);
        Ok(())
    }

    async fn list_thread_ids(&self, caller: &CallerId, collection_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let mut threads: Vec<(Timestamp, Uuid)> = self
            .threads
            .iter()
            .filter(|entry| &entry.caller == caller && entry.collection_id == collection_id)
            .map(|entry| (entry.updated_at, entry.id))
            .collect();
        threads.sort_by(|a, b| b.cmp(a));
        Ok(threads.into_iter().map(|(_, id)| id).collect())
    }

    async fn delete_thread(&self, caller: &CallerId, thread_id: Uuid) -> Result<(), StoreError> {
        self.threads
            .remove(&(caller.clone(), thread_id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                kind: "thread",
                id: thread_id.to_string(),
            })
    }

    async fn insert_model_usage(&self, usage: ModelUsage) -> Result<(), StoreError> {
        self.usage.insert(usage.id, usage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threads_are_scoped_to_their_caller() {
        let store = MemoryDatastore::new();
        let alice = CallerId::new("alice");
        let mut thread = Thread::new(alice.clone(), Uuid::new_v4());
        thread.messages.push(Message::user("hello"));

        store.store_thread(&thread).await.unwrap();

        let loaded = store.load_thread(&alice, thread.id).await.unwrap();
        assert_eq!(loaded.messages, thread.messages);

        let err = store.load_thread(&CallerId::new("bob"), thread.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "thread", .. }));
    }

    #[tokio::test]
    async fn later_store_replaces_thread() {
        let store = MemoryDatastore::new();
        let caller = CallerId::new("alice");
        let mut thread = Thread::new(caller.clone(), Uuid::new_v4());

        store.store_thread(&thread).await.unwrap();
        thread.messages.push(Message::user("second write"));
        store.store_thread(&thread).await.unwrap();

        assert_eq!(store.thread_count(), 1);
        assert_eq!(store.load_thread(&caller, thread.id).await.unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn thread_ids_are_listed_per_caller_and_collection() {
        let store = MemoryDatastore::new();
        let alice = CallerId::new("alice");
        let collection = Uuid::new_v4();

        let older = Thread::new(alice.clone(), collection);
        store.store_thread(&older).await.unwrap();
        let newer = Thread::new(alice.clone(), collection);
        store.store_thread(&newer).await.unwrap();
        store.store_thread(&Thread::new(alice.clone(), Uuid::new_v4())).await.unwrap();
        store.store_thread(&Thread::new(CallerId::new("bob"), collection)).await.unwrap();

        let ids = store.list_thread_ids(&alice, collection).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&older.id) && ids.contains(&newer.id));

        // Touching the older thread moves it to the front
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        store.store_thread(&older).await.unwrap();
        assert_eq!(store.list_thread_ids(&alice, collection).await.unwrap()[0], older.id);

        assert!(store.list_thread_ids(&alice, Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_thread_is_scoped_to_its_caller() {
        let store = MemoryDatastore::new();
        let alice = CallerId::new("alice");
        let thread = Thread::new(alice.clone(), Uuid::new_v4());
        store.store_thread(&thread).await.unwrap();

        let err = store.delete_thread(&CallerId::new("bob"), thread.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "thread", .. }));
        assert_eq!(store.thread_count(), 1);

        store.delete_thread(&alice, thread.id).await.unwrap();
        assert_eq!(store.thread_count(), 0);
        assert!(store.delete_thread(&alice, thread.id).await.is_err());
    }

    #[tokio::test]
    async fn document_names_resolve_per_caller() {
        let store = MemoryDatastore::new();
        let caller = CallerId::new("alice");
        store.insert_document(&caller, "doc-1", "Genome Editing Review");

        assert_eq!(store.document_name(&caller, "doc-1").await.unwrap(), "Genome Editing Review");
        assert!(store.document_name(&CallerId::new("bob"), "doc-1").await.is_err());
    }

    #[tokio::test]
    async fn usage_records_accumulate() {
        let store = MemoryDatastore::new();
        let caller = CallerId::new("alice");

        store
            .insert_model_usage(ModelUsage::new(caller.clone(), "claude-3-haiku", Usage::new(10, 2)))
            .await
            .unwrap();
        store
            .insert_model_usage(ModelUsage::new(caller, "embed-v1", Usage::new(5, 0)))
            .await
            .unwrap();

        let records = store.usage_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().map(|r| r.input_tokens).sum::<u64>(), 15);
    }
}
