//! Message flattening: one nested message → one flat row.

use super::model::{MessageRecord, RawTimestamp, SessionContext};
use crate::error::PipelineError;
use crate::store::Document;

/// Columns of the conversation table, in row order.
pub const CONVERSATION_COLUMNS: [&str; 21] = [
    "message_id",
    "from",
    "message_content",
    "created_at",
    "updated_at",
    "ancestors",
    "children",
    "interrupted",
    "score",
    "updates",
    "conversation_id",
    "title",
    "root_message_id",
    "model",
    "preprompt",
    "assistant_id",
    "created_at_session",
    "updated_at_session",
    "user_agent",
    "embedding_model",
    "sessionId",
];

/// A message with its conversation's session fields denormalized onto it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMessageRow {
    pub message: MessageRecord,
    pub session: SessionContext,
}

impl FlatMessageRow {
    pub fn new(message: &MessageRecord, session: &SessionContext) -> Self {
        Self {
            message: message.clone(),
            session: session.clone(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.session.conversation_id
    }

    pub fn message_id(&self) -> &str {
        &self.message.id
    }

    /// The four timestamp columns with their column names; session ones may
    /// be absent.
    pub fn timestamps(&self) -> [(&'static str, Option<&RawTimestamp>); 4] {
        [
            ("created_at", Some(&self.message.created_at)),
            ("updated_at", Some(&self.message.updated_at)),
            ("created_at_session", self.session.created_at.as_ref()),
            ("updated_at_session", self.session.updated_at.as_ref()),
        ]
    }
}

/// Flatten one raw message document under its conversation's session fields.
///
/// Missing structural fields fail with [`PipelineError::MissingField`];
/// `interrupted`, `score` and `updates` fall back to `false`, null and `[]`.
pub fn flatten(message: &Document, session: &SessionContext) -> Result<FlatMessageRow, PipelineError> {
    let context = format!("message of conversation {}", session.conversation_id);
    let record = MessageRecord::from_document(message, context)?;
    Ok(FlatMessageRow {
        message: record,
        session: session.clone(),
    })
}
