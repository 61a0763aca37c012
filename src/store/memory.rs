//! In-memory document store for tests and demos.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::traits::{Collection, Document, DocumentStore, canonicalize_document_id};

/// Document store backed by a map of collections.
///
/// Counts every fetch so callers can observe cache hits, and can be switched
/// offline to simulate an unreachable store.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<Collection, Vec<Document>>>,
    fetches: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a collection's contents. Non-object values are ignored.
    pub fn with_collection(self, collection: Collection, docs: Vec<serde_json::Value>) -> Self {
        self.replace(collection, docs);
        self
    }

    /// Replace a collection's contents, as the upstream chat app would.
    pub fn replace(&self, collection: Collection, docs: Vec<serde_json::Value>) {
        let docs = docs
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::Object(doc) => Some(doc),
                _ => None,
            })
            .collect();
        self.collections
            .lock()
            .expect("store mutex poisoned")
            .insert(collection, docs);
    }

    /// Total number of `fetch_collection` calls served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Connection("store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check_online()
    }

    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut docs = self
            .collections
            .lock()
            .expect("store mutex poisoned")
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        for doc in &mut docs {
            canonicalize_document_id(doc);
        }
        Ok(docs)
    }
}
