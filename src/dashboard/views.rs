//! View models returned to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::pipeline::aggregate::TagCount;
use crate::table::{Table, Value};

/// Columns of the feedback browser, in display order.
pub const BROWSE_COLUMNS: [&str; 9] = [
    "feedback_id",
    "score",
    "feedback",
    "custom_comment",
    "message_content",
    "conversation_id",
    "message_id",
    "created_by",
    "created_at",
];

/// Columns shown by the conversation search view unless others are chosen.
pub const SEARCH_DEFAULT_COLUMNS: [&str; 7] = [
    "conversation_id",
    "message_id",
    "from",
    "message_content",
    "score",
    "model",
    "created_at",
];

/// Columns the transcript view reads from the merged table.
pub const TRANSCRIPT_COLUMNS: [&str; 11] = [
    "conversation_id",
    "title",
    "message_id",
    "from",
    "message_content",
    "score",
    "model",
    "created_at",
    "feedback_id",
    "feedback",
    "custom_comment",
];

/// Roles rendered in a transcript; system and tool messages are skipped.
pub const TRANSCRIPT_ROLES: [&str; 2] = ["user", "assistant"];

/// Display format of transcript timestamps.
pub const TRANSCRIPT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Every feedback record with its message, plus tag frequencies.
#[derive(Debug, Clone, Serialize)]
pub struct BrowseView {
    pub table: Table,
    pub tag_counts: Vec<TagCount>,
}

/// Search parameters; unset fields fall back to view defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub conversation_id: Option<String>,
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    /// Every conversation-table column, sorted by name.
    pub available_columns: Vec<String>,
    /// Conversation ids in first-seen order.
    pub conversation_ids: Vec<String>,
    pub selected_conversation: Option<String>,
    pub selected_columns: Vec<String>,
    pub table: Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Sentiment::Positive
        } else if score < 0.0 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Feedback shown under a scored message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnnotation {
    pub sentiment: Sentiment,
    pub score: i64,
    pub feedback_ids: Vec<String>,
    pub tags: Vec<String>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub message_id: String,
    pub role: String,
    pub content: String,
    pub created_at: Option<String>,
    pub annotation: Option<FeedbackAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptView {
    pub conversation_id: String,
    pub title: String,
    pub model: Option<String>,
    pub messages: Vec<TranscriptEntry>,
}

/// Outcome of a refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub conversations: usize,
    pub feedback: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub store: String,
    pub cache: CacheStats,
}

/// Build a transcript from the ordered LEFT-join rows of one conversation.
///
/// Consecutive rows of the same message (one per feedback record) collapse
/// into a single entry whose annotation gathers every record's tags and
/// comment.
pub fn build_transcript(conversation_id: &str, rows: &Table) -> Option<TranscriptView> {
    if rows.is_empty() {
        return None;
    }
    let text = |row: usize, column: &str| rows.get(row, column).and_then(Value::as_str).map(str::to_string);

    let mut view = TranscriptView {
        conversation_id: conversation_id.to_string(),
        title: text(0, "title").unwrap_or_default(),
        model: text(0, "model"),
        messages: Vec::new(),
    };

    for i in 0..rows.len() {
        let role = text(i, "from").unwrap_or_default();
        if !TRANSCRIPT_ROLES.contains(&role.as_str()) {
            continue;
        }
        let message_id = text(i, "message_id").unwrap_or_default();

        let same_as_last = view.messages.last().is_some_and(|m| m.message_id == message_id);
        if !same_as_last {
            view.messages.push(TranscriptEntry {
                message_id,
                role,
                content: text(i, "message_content").unwrap_or_default(),
                created_at: rows
                    .get(i, "created_at")
                    .and_then(Value::as_timestamp)
                    .map(|ts| ts.format(TRANSCRIPT_TIME_FORMAT).to_string()),
                annotation: None,
            });
        }

        let Some(score) = rows.get(i, "score").and_then(Value::as_f64) else {
            continue;
        };
        let Some(entry) = view.messages.last_mut() else {
            continue;
        };
        let annotation = entry.annotation.get_or_insert_with(|| FeedbackAnnotation {
            sentiment: Sentiment::from_score(score),
            score: score as i64,
            feedback_ids: Vec::new(),
            tags: Vec::new(),
            comments: Vec::new(),
        });
        if let Some(id) = text(i, "feedback_id") {
            annotation.feedback_ids.push(id);
        }
        if let Some(tags) = rows.get(i, "feedback").and_then(Value::as_list) {
            for tag in tags.iter().filter_map(Value::as_str) {
                if !annotation.tags.iter().any(|t| t == tag) {
                    annotation.tags.push(tag.to_string());
                }
            }
        }
        if let Some(comment) = text(i, "custom_comment").filter(|c| !c.is_empty()) {
            annotation.comments.push(comment);
        }
    }

    Some(view)
}
