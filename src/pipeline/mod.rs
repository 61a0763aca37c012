//! Tabular pipeline over raw store documents.
//!
//! Conversation documents are validated into an arena, flattened to one row
//! per message and normalized into the conversation table. Feedback records
//! map directly into the feedback table. The join engine merges the two on
//! (conversation_id, message_id) and the aggregator counts feedback tags.

pub mod aggregate;
pub mod arena;
pub mod conversations;
pub mod feedback;
pub mod flatten;
pub mod join;
pub mod model;
pub mod schema;
pub mod timestamp;

pub use aggregate::{TagCount, count_feedback_tags};
pub use conversations::build_conversation_table;
pub use feedback::build_feedback_table;
pub use flatten::{FlatMessageRow, flatten};
pub use join::{JoinMode, JoinSpec, join};
