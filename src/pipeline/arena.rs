//! Arena storage for conversation message trees.
//!
//! Conversations own a contiguous run of message nodes in one flat vector.
//! Tree edges (ancestors, children) stay as id references and are resolved
//! through the (conversation_id, message_id) index, so branching
//! conversations need no pointer structure.

use std::collections::HashMap;
use std::ops::Range;

use super::model::{ConversationDocument, MessageRecord, SessionContext};
use crate::error::PipelineError;
use crate::store::Document;

/// Composite key of a message: ids are only unique within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub conversation_id: String,
    pub message_id: String,
}

impl MessageKey {
    pub fn new(conversation_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
        }
    }
}

struct SessionNode {
    context: SessionContext,
    messages: Range<usize>,
}

/// Every conversation and message of a collection snapshot, in source order.
#[derive(Default)]
pub struct ConversationArena {
    sessions: Vec<SessionNode>,
    messages: Vec<MessageRecord>,
    index: HashMap<MessageKey, usize>,
}

impl ConversationArena {
    /// Validate and load conversation documents.
    ///
    /// Fails on the first malformed conversation or message, and on a message
    /// id repeated within one conversation.
    pub fn from_documents(docs: &[Document]) -> Result<Self, PipelineError> {
        let mut arena = Self::default();
        for (position, doc) in docs.iter().enumerate() {
            let conversation = ConversationDocument::from_document(doc, position)?;
            arena.push_conversation(conversation)?;
        }
        Ok(arena)
    }

    fn push_conversation(&mut self, conversation: ConversationDocument<'_>) -> Result<(), PipelineError> {
        let conversation_id = conversation.session.conversation_id.clone();
        let start = self.messages.len();

        for (i, raw) in conversation.messages.into_iter().enumerate() {
            let context = format!("message #{i} of conversation {conversation_id}");
            let record = MessageRecord::from_document(raw, context)?;
            let key = MessageKey::new(&conversation_id, &record.id);
            if self.index.insert(key, self.messages.len()).is_some() {
                return Err(PipelineError::DuplicateMessage {
                    conversation_id,
                    message_id: record.id,
                });
            }
            self.messages.push(record);
        }

        self.sessions.push(SessionNode {
            context: conversation.session,
            messages: start..self.messages.len(),
        });
        Ok(())
    }

    pub fn conversation_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Conversations in source order, each with its messages in source order.
    pub fn conversations(&self) -> impl Iterator<Item = (&SessionContext, &[MessageRecord])> {
        self.sessions
            .iter()
            .map(|s| (&s.context, &self.messages[s.messages.clone()]))
    }

    pub fn message(&self, key: &MessageKey) -> Option<&MessageRecord> {
        self.index.get(key).map(|&i| &self.messages[i])
    }

    /// Child messages of `key` that exist in the same conversation.
    ///
    /// More than one child means the conversation branches at this message.
    pub fn children(&self, key: &MessageKey) -> Vec<&MessageRecord> {
        self.resolve(key, |m| &m.children)
    }

    /// Ancestors of `key`, root first, that exist in the same conversation.
    pub fn ancestors(&self, key: &MessageKey) -> Vec<&MessageRecord> {
        self.resolve(key, |m| &m.ancestors)
    }

    fn resolve<F>(&self, key: &MessageKey, links: F) -> Vec<&MessageRecord>
    where
        F: Fn(&MessageRecord) -> &Vec<String>,
    {
        let Some(message) = self.message(key) else {
            return Vec::new();
        };
        links(message)
            .iter()
            .filter_map(|id| self.message(&MessageKey::new(&key.conversation_id, id)))
            .collect()
    }
}
