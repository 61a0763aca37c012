//! Read-only document store interface.
//!
//! The dashboard never writes: the chat application owns both collections
//! and this crate only pulls full snapshots of them.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A raw document as stored, with its object id already canonicalized.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// The two logical collections the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Conversations,
    Feedback,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Conversations, Collection::Feedback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Conversations => "conversations",
            Collection::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-agnostic read interface over the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lightweight liveness check. Establishes the connection if needed.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Read every document of a collection, in store order.
    ///
    /// Implementations canonicalize `_id` (see [`canonical_id`]) before
    /// returning.
    async fn fetch_collection(&self, collection: Collection) -> Result<Vec<Document>, StoreError>;
}

/// Render a store-native identifier as its canonical string.
///
/// Extended-JSON object ids (`{"$oid": "..."}`) collapse to the hex string,
/// strings pass through and numbers are stringified. Anything else has no
/// canonical form.
pub fn canonical_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Object(map) => map
            .get("$oid")
            .and_then(|oid| oid.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Replace a document's `_id` with its canonical string form in place.
pub fn canonicalize_document_id(doc: &mut Document) {
    if let Some(id) = doc.get("_id").and_then(canonical_id) {
        doc.insert("_id".into(), serde_json::Value::String(id));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_ids_collapse_to_hex() {
        assert_eq!(
            canonical_id(&json!({"$oid": "65f1c0ffee"})).as_deref(),
            Some("65f1c0ffee")
        );
        assert_eq!(canonical_id(&json!("plain")).as_deref(), Some("plain"));
        assert_eq!(canonical_id(&json!(42)).as_deref(), Some("42"));
        assert_eq!(canonical_id(&json!(null)), None);
        assert_eq!(canonical_id(&json!({"other": 1})), None);
    }

    #[test]
    fn canonicalize_rewrites_only_id() {
        let mut doc = json!({"_id": {"$oid": "abc"}, "conversationId": {"$oid": "def"}})
            .as_object()
            .cloned()
            .unwrap();
        canonicalize_document_id(&mut doc);
        assert_eq!(doc["_id"], json!("abc"));
        assert_eq!(doc["conversationId"], json!({"$oid": "def"}));
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::Conversations.to_string(), "conversations");
        assert_eq!(Collection::Feedback.as_str(), "feedback");
    }
}
