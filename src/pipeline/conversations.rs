//! Conversation table builder.

use tracing::debug;

use super::arena::ConversationArena;
use super::flatten::{CONVERSATION_COLUMNS, FlatMessageRow};
use super::model::RawTimestamp;
use super::timestamp::parse_timestamp;
use crate::error::PipelineError;
use crate::store::Document;
use crate::table::{Table, Value};

/// Flatten every message of every conversation into one table.
///
/// Rows follow conversation order, then message order within each
/// conversation. The four timestamp columns are parsed to UTC; a single
/// unparseable timestamp fails the whole build.
pub fn build_conversation_table(conversations: &[Document]) -> Result<Table, PipelineError> {
    let arena = ConversationArena::from_documents(conversations)?;
    table_from_arena(&arena)
}

/// Build the conversation table from an already-loaded arena.
pub fn table_from_arena(arena: &ConversationArena) -> Result<Table, PipelineError> {
    let mut table = Table::new(CONVERSATION_COLUMNS.iter().map(|c| c.to_string()).collect());

    for (session, messages) in arena.conversations() {
        for message in messages {
            let row = FlatMessageRow::new(message, session);
            table.push_row(row_cells(&row)?);
        }
    }

    debug!(
        conversations = arena.conversation_count(),
        rows = table.len(),
        "Conversation table built"
    );
    Ok(table)
}

fn normalize_timestamp(
    row: &FlatMessageRow,
    column: &str,
    raw: Option<&RawTimestamp>,
) -> Result<Value, PipelineError> {
    let Some(RawTimestamp(raw)) = raw else {
        return Ok(Value::Null);
    };
    parse_timestamp(raw)
        .map(Value::Timestamp)
        .ok_or_else(|| PipelineError::TimestampParse {
            context: format!(
                "message {} of conversation {}",
                row.message_id(),
                row.conversation_id()
            ),
            field: column.to_string(),
            value: raw.to_string(),
        })
}

/// Cells of one row, in [`CONVERSATION_COLUMNS`] order.
fn row_cells(row: &FlatMessageRow) -> Result<Vec<Value>, PipelineError> {
    let [created, updated, created_session, updated_session] = row
        .timestamps()
        .map(|(column, raw)| normalize_timestamp(row, column, raw));

    let m = &row.message;
    let s = &row.session;
    Ok(vec![
        Value::Text(m.id.clone()),
        Value::Text(m.from.clone()),
        Value::Text(m.content.clone()),
        created?,
        updated?,
        m.ancestors.clone().into(),
        m.children.clone().into(),
        Value::Bool(m.interrupted),
        m.score
            .clone()
            .map(|n| Value::from_json(serde_json::Value::Number(n)))
            .unwrap_or(Value::Null),
        Value::List(m.updates.iter().cloned().map(Value::from_json).collect()),
        Value::Text(s.conversation_id.clone()),
        Value::Text(s.title.clone()),
        s.root_message_id.clone().into(),
        s.model.clone().into(),
        s.preprompt.clone().into(),
        s.assistant_id.clone().into(),
        created_session?,
        updated_session?,
        s.user_agent.clone().into(),
        s.embedding_model.clone().into(),
        s.session_id.clone().into(),
    ])
}
