//! Typed conversation records, parsed from raw store documents.

use serde_json::Value as Json;

use super::schema::{CONVERSATION_SCHEMA, Fields, MESSAGE_SCHEMA};
use crate::error::PipelineError;
use crate::store::Document;

/// A timestamp exactly as stored. Parsed when the conversation table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTimestamp(pub Json);

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub id: String,
    /// Role tag: `user`, `assistant`, `system`, ...
    pub from: String,
    pub content: String,
    pub created_at: RawTimestamp,
    pub updated_at: RawTimestamp,
    pub ancestors: Vec<String>,
    pub children: Vec<String>,
    pub interrupted: bool,
    pub score: Option<serde_json::Number>,
    pub updates: Vec<Json>,
}

impl MessageRecord {
    /// Parse and validate a message document.
    ///
    /// `context` names the message in error messages.
    pub fn from_document(doc: &Document, context: impl Into<String>) -> Result<Self, PipelineError> {
        let f = Fields::validate(doc, MESSAGE_SCHEMA, context)?;
        Ok(Self {
            id: f.id("id")?,
            from: f.text("from")?,
            content: f.text("content")?,
            created_at: RawTimestamp(f.raw("createdAt")),
            updated_at: RawTimestamp(f.raw("updatedAt")),
            ancestors: f.id_list("ancestors")?,
            children: f.id_list("children")?,
            interrupted: f.flag("interrupted")?,
            score: f.optional_number("score")?,
            updates: f.list("updates")?,
        })
    }
}

/// Session-level fields copied onto every message row of a conversation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionContext {
    pub conversation_id: String,
    pub title: String,
    pub root_message_id: Option<String>,
    pub model: Option<String>,
    pub preprompt: Option<String>,
    pub assistant_id: Option<String>,
    pub created_at: Option<RawTimestamp>,
    pub updated_at: Option<RawTimestamp>,
    pub user_agent: Option<String>,
    pub embedding_model: Option<String>,
    pub session_id: Option<String>,
}

/// A conversation document split into its session fields and its raw
/// message documents.
pub struct ConversationDocument<'a> {
    pub session: SessionContext,
    pub messages: Vec<&'a Document>,
}

impl<'a> ConversationDocument<'a> {
    pub fn from_document(doc: &'a Document, position: usize) -> Result<Self, PipelineError> {
        let context = match doc.get("_id").and_then(crate::store::canonical_id) {
            Some(id) => format!("conversation {id}"),
            None => format!("conversation #{position}"),
        };
        let f = Fields::validate(doc, CONVERSATION_SCHEMA, context)?;

        let timestamp = |name: &str| match f.raw(name) {
            Json::Null => None,
            other => Some(RawTimestamp(other)),
        };

        let session = SessionContext {
            conversation_id: f.id("_id")?,
            title: f.text("title")?,
            root_message_id: f.optional_id("rootMessageId")?,
            model: f.optional_text("model")?,
            preprompt: f.optional_text("preprompt")?,
            assistant_id: f.optional_id("assistantId")?,
            created_at: timestamp("createdAt"),
            updated_at: timestamp("updatedAt"),
            user_agent: f.optional_text("userAgent")?,
            embedding_model: f.optional_text("embeddingModel")?,
            session_id: f.optional_text("sessionId")?,
        };
        let messages = f.documents("messages")?;

        Ok(Self { session, messages })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn conversation_with_only_required_fields() {
        let doc = json!({"_id": {"$oid": "c1"}, "title": "Hello", "messages": []})
            .as_object()
            .cloned()
            .unwrap();
        let conv = ConversationDocument::from_document(&doc, 0).unwrap();
        assert_eq!(conv.session.conversation_id, "c1");
        assert_eq!(conv.session.model, None);
        assert_eq!(conv.session.created_at, None);
        assert!(conv.messages.is_empty());
    }

    #[test]
    fn conversation_without_messages_is_rejected() {
        let doc = json!({"_id": "c1", "title": "Hello"}).as_object().cloned().unwrap();
        let err = ConversationDocument::from_document(&doc, 0).err().unwrap();
        assert_eq!(err.to_string(), "conversation c1 is missing required field `messages`");
    }
}
