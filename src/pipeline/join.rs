//! Join engine: merge the conversation and feedback tables on
//! (conversation_id, message_id).
//!
//! Cardinality is preserved: a message with two feedback records yields two
//! rows, a message with none yields one row with null feedback columns under
//! [`JoinMode::Left`]. Under [`JoinMode::Right`] a feedback record whose
//! message is missing is kept with null message columns.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::table::{Table, Value};

/// Composite join key columns.
pub const KEY_COLUMNS: [&str; 2] = ["conversation_id", "message_id"];

/// Suffix for conversation-side columns that collide with feedback columns.
pub const LEFT_SUFFIX: &str = "_x";

/// Positional index used to restore conversation order after a merge.
pub const ROW_INDEX_COLUMN: &str = "row_index";

/// Which side's rows are always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinMode {
    /// Every conversation row.
    Left,
    /// Every feedback row.
    Right,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Left => f.write_str("left"),
            JoinMode::Right => f.write_str("right"),
        }
    }
}

/// How a merge should be run and projected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinSpec {
    pub mode: JoinMode,
    /// Output columns, in output order.
    pub keep_columns: Vec<String>,
    /// Re-sort the result into conversation row order.
    pub preserve_order: bool,
}

impl JoinSpec {
    pub fn new(mode: JoinMode, keep_columns: &[&str]) -> Self {
        Self {
            mode,
            keep_columns: keep_columns.iter().map(|c| c.to_string()).collect(),
            preserve_order: false,
        }
    }

    pub fn ordered(mut self) -> Self {
        self.preserve_order = true;
        self
    }
}

type Key<'a> = (&'a str, &'a str);

fn row_key<'a>(row: &'a [Value], idx: (usize, usize)) -> Option<Key<'a>> {
    Some((row[idx.0].as_str()?, row[idx.1].as_str()?))
}

fn key_indices(table: &Table) -> Result<(usize, usize), PipelineError> {
    Ok((table.require_column(KEY_COLUMNS[0])?, table.require_column(KEY_COLUMNS[1])?))
}

fn index_by_key(table: &Table, idx: (usize, usize)) -> HashMap<Key<'_>, Vec<usize>> {
    let mut index: HashMap<Key<'_>, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        if let Some(key) = row_key(row, idx) {
            index.entry(key).or_default().push(i);
        }
    }
    index
}

/// Output column layout of a merge.
struct Layout {
    columns: Vec<String>,
    /// Non-key columns of the right table, by index.
    right_payload: Vec<usize>,
    left_keys: (usize, usize),
    right_keys: (usize, usize),
}

impl Layout {
    fn new(left: &Table, right: &Table) -> Result<Self, PipelineError> {
        let left_keys = key_indices(left)?;
        let right_keys = key_indices(right)?;
        let is_key = |c: &str| KEY_COLUMNS.contains(&c);

        let right_payload: Vec<usize> = right
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_key(c.as_str()))
            .map(|(i, _)| i)
            .collect();

        let mut columns: Vec<String> = left
            .columns()
            .iter()
            .map(|c| {
                if !is_key(c.as_str()) && right.column_index(c).is_some() {
                    format!("{c}{LEFT_SUFFIX}")
                } else {
                    c.clone()
                }
            })
            .collect();
        columns.extend(right_payload.iter().map(|&i| right.columns()[i].clone()));

        Ok(Self {
            columns,
            right_payload,
            left_keys,
            right_keys,
        })
    }

    fn combine(&self, left: Option<&[Value]>, right: Option<&[Value]>, left_width: usize) -> Vec<Value> {
        let mut row = match left {
            Some(cells) => cells.to_vec(),
            None => {
                let mut cells = vec![Value::Null; left_width];
                // Orphaned right rows still carry their key.
                if let Some(r) = right {
                    cells[self.left_keys.0] = r[self.right_keys.0].clone();
                    cells[self.left_keys.1] = r[self.right_keys.1].clone();
                }
                cells
            }
        };
        match right {
            Some(cells) => row.extend(self.right_payload.iter().map(|&i| cells[i].clone())),
            None => row.extend(std::iter::repeat_n(Value::Null, self.right_payload.len())),
        }
        row
    }
}

/// Merge two tables on the composite key without projecting.
///
/// Non-key columns present on both sides keep the right (feedback) copy under
/// the plain name; the left copy is renamed with [`LEFT_SUFFIX`].
pub fn merge(left: &Table, right: &Table, mode: JoinMode) -> Result<Table, PipelineError> {
    let layout = Layout::new(left, right)?;
    let left_width = left.columns().len();
    let mut out = Table::new(layout.columns.clone());

    match mode {
        JoinMode::Left => {
            let index = index_by_key(right, layout.right_keys);
            for row in left.rows() {
                let matches = row_key(row, layout.left_keys).and_then(|k| index.get(&k));
                match matches {
                    Some(hits) => {
                        for &r in hits {
                            out.push_row(layout.combine(Some(row.as_slice()), Some(right.rows()[r].as_slice()), left_width));
                        }
                    }
                    None => out.push_row(layout.combine(Some(row.as_slice()), None, left_width)),
                }
            }
        }
        JoinMode::Right => {
            let index = index_by_key(left, layout.left_keys);
            let mut orphans = 0usize;
            for row in right.rows() {
                let matches = row_key(row, layout.right_keys).and_then(|k| index.get(&k));
                match matches {
                    Some(hits) => {
                        for &l in hits {
                            out.push_row(layout.combine(Some(left.rows()[l].as_slice()), Some(row.as_slice()), left_width));
                        }
                    }
                    None => {
                        orphans += 1;
                        out.push_row(layout.combine(None, Some(row.as_slice()), left_width));
                    }
                }
            }
            if orphans > 0 {
                warn!(orphans, "Feedback records reference messages that do not exist");
            }
        }
    }

    debug!(mode = %mode, left = left.len(), right = right.len(), rows = out.len(), "Tables merged");
    Ok(out)
}

/// Merge, optionally restore conversation order, and project to
/// `spec.keep_columns`.
///
/// Requesting a column that does not exist after the merge is a
/// [`PipelineError::UnknownColumn`].
pub fn join(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Table, PipelineError> {
    if !spec.preserve_order {
        return merge(left, right, spec.mode)?.select(&spec.keep_columns);
    }

    let indexed = left.clone().with_row_index(ROW_INDEX_COLUMN);
    let mut merged = merge(&indexed, right, spec.mode)?;
    merged.sort_by_column(ROW_INDEX_COLUMN)?;
    merged.select(&spec.keep_columns)
}
