//! Feedback table builder.

use tracing::debug;

use super::timestamp::parse_timestamp;
use crate::store::{Document, canonical_id};
use crate::table::{Table, Value};

/// Raw feedback field names and their canonical column names.
pub const FEEDBACK_RENAMES: [(&str, &str); 5] = [
    ("_id", "feedback_id"),
    ("createdBy", "created_by"),
    ("conversationId", "conversation_id"),
    ("messageId", "message_id"),
    ("customComment", "custom_comment"),
];

/// Columns every feedback table carries, null-filled when no record has
/// them, so the join keys and the dashboard's fixed projections resolve.
pub const BASE_FEEDBACK_COLUMNS: [&str; 6] = [
    "feedback_id",
    "conversation_id",
    "message_id",
    "created_by",
    "feedback",
    "custom_comment",
];

/// Columns holding identifiers; their values are coerced to strings.
const ID_COLUMNS: [&str; 3] = ["feedback_id", "conversation_id", "message_id"];

/// Extended-JSON dates become timestamps; plain strings stay text.
fn cell(raw: &serde_json::Value) -> Value {
    if raw.get("$date").is_some() {
        if let Some(ts) = parse_timestamp(raw) {
            return Value::Timestamp(ts);
        }
    }
    Value::from_json(raw.clone())
}

fn canonical_name(field: &str) -> &str {
    FEEDBACK_RENAMES
        .iter()
        .find(|(raw, _)| *raw == field)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(field)
}

/// Map raw feedback records into a flat table.
///
/// Columns are the union of all record fields in first-seen order, with the
/// join keys and well-known fields renamed, followed by any
/// [`BASE_FEEDBACK_COLUMNS`] no record had. Records lacking a field get null.
/// Every other field is carried through unchanged.
pub fn build_feedback_table(records: &[Document]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for field in record.keys() {
            let name = canonical_name(field);
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
    }
    for base in BASE_FEEDBACK_COLUMNS {
        if !columns.iter().any(|c| c == base) {
            columns.push(base.to_string());
        }
    }

    let mut table = Table::new(columns);
    for record in records {
        let mut row = vec![Value::Null; table.columns().len()];
        for (field, raw) in record {
            let name = canonical_name(field);
            let Some(idx) = table.column_index(name) else {
                continue;
            };
            row[idx] = if ID_COLUMNS.contains(&name) {
                canonical_id(raw).map(Value::Text).unwrap_or(Value::Null)
            } else {
                cell(raw)
            };
        }
        table.push_row(row);
    }

    debug!(rows = table.len(), columns = table.columns().len(), "Feedback table built");
    table
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn docs(values: Vec<serde_json::Value>) -> Vec<Document> {
        values.into_iter().map(|v| v.as_object().cloned().unwrap()).collect()
    }

    #[test]
    fn renames_and_coerces_join_keys() {
        let table = build_feedback_table(&docs(vec![json!({
            "_id": "f1",
            "conversationId": {"$oid": "65aa"},
            "messageId": "m2",
            "createdBy": "u1",
            "feedback": ["helpful"],
            "customComment": "great"
        })]));

        assert_eq!(
            table.columns(),
            ["feedback_id", "conversation_id", "message_id", "created_by", "feedback", "custom_comment"]
        );
        assert_eq!(table.get(0, "conversation_id"), Some(&Value::Text("65aa".into())));
        assert_eq!(table.get(0, "feedback"), Some(&Value::List(vec!["helpful".into()])));
    }

    #[test]
    fn extended_json_dates_become_timestamps() {
        let table = build_feedback_table(&docs(vec![json!({
            "_id": "f1", "conversationId": "c1", "messageId": "m1",
            "createdAt": {"$date": "2024-03-05T12:00:00Z"},
            "note": "2024-03-05T12:00:00Z"
        })]));
        assert!(table.get(0, "createdAt").and_then(Value::as_timestamp).is_some());
        assert_eq!(table.get(0, "note"), Some(&Value::Text("2024-03-05T12:00:00Z".into())));
    }

    #[test]
    fn sparse_records_are_null_filled() {
        let table = build_feedback_table(&docs(vec![
            json!({"_id": "f1", "conversationId": "c1", "messageId": "m1"}),
            json!({"_id": "f2", "conversationId": "c1", "messageId": "m2", "customComment": "meh"}),
        ]));
        assert_eq!(table.get(0, "custom_comment"), Some(&Value::Null));
        assert_eq!(table.get(1, "custom_comment"), Some(&Value::Text("meh".into())));
    }

    #[test]
    fn empty_collection_has_baseline_columns() {
        let table = build_feedback_table(&[]);
        assert!(table.is_empty());
        assert_eq!(table.columns(), BASE_FEEDBACK_COLUMNS);
    }

    #[test]
    fn records_without_keys_still_get_base_columns() {
        let table = build_feedback_table(&docs(vec![json!({"_id": "f1", "score": 1})]));
        assert_eq!(
            table.columns(),
            ["feedback_id", "score", "conversation_id", "message_id", "created_by", "feedback", "custom_comment"]
        );
        assert_eq!(table.get(0, "message_id"), Some(&Value::Null));
    }
}
