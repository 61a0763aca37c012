//! Feedback tag frequencies.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::PipelineError;
use crate::table::{Table, Value};

/// Column holding each row's feedback tags.
pub const FEEDBACK_TAG_COLUMN: &str = "feedback";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Count tag occurrences in the `feedback` column.
pub fn count_feedback_tags(table: &Table) -> Result<Vec<TagCount>, PipelineError> {
    count_tags(table, FEEDBACK_TAG_COLUMN)
}

/// Count occurrences of each tag in a multi-valued column.
///
/// A row with several tags counts once per tag; null or empty rows count for
/// nothing. A bare string cell is a single tag. The result is sorted by
/// descending count, ties in first-seen order.
pub fn count_tags(table: &Table, column: &str) -> Result<Vec<TagCount>, PipelineError> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let mut bump = |tag: &str| match positions.get(tag) {
        Some(&i) => counts[i].count += 1,
        None => {
            positions.insert(tag.to_string(), counts.len());
            counts.push(TagCount {
                tag: tag.to_string(),
                count: 1,
            });
        }
    };

    for cell in table.column_values(column)? {
        match cell {
            Value::List(items) => items.iter().filter_map(Value::as_str).for_each(&mut bump),
            Value::Text(tag) => bump(tag.as_str()),
            _ => {}
        }
    }

    // Stable, so ties keep first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_table(rows: Vec<Value>) -> Table {
        let mut t = Table::new(vec!["feedback".into()]);
        for row in rows {
            t.push_row(vec![row]);
        }
        t
    }

    fn list(tags: &[&str]) -> Value {
        Value::List(tags.iter().map(|t| Value::from(*t)).collect())
    }

    #[test]
    fn multi_valued_rows_are_expanded() {
        let table = tags_table(vec![list(&["a", "b"]), list(&["a"]), list(&[])]);
        let counts = count_feedback_tags(&table).unwrap();
        assert_eq!(
            counts,
            vec![
                TagCount { tag: "a".into(), count: 2 },
                TagCount { tag: "b".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn ties_keep_first_seen_order_and_nulls_are_skipped() {
        let table = tags_table(vec![Value::Null, list(&["slow", "wrong"]), "wrong".into(), list(&["slow"])]);
        let tags: Vec<_> = count_feedback_tags(&table)
            .unwrap()
            .into_iter()
            .map(|c| (c.tag, c.count))
            .collect();
        assert_eq!(tags, vec![("slow".to_string(), 2), ("wrong".to_string(), 2)]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let table = Table::new(vec!["other".into()]);
        assert!(count_feedback_tags(&table).is_err());
    }
}
