//! Dashboard service: cached pipeline runs behind the three views.
//!
//! Every stage goes through the shared [`ResultCache`], so repeated view
//! requests without a refresh reuse the same fetched documents and tables.

pub mod views;

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheKey, ResultCache};
use crate::error::{Error, Result};
use crate::pipeline::{
    JoinMode, JoinSpec, build_conversation_table, build_feedback_table, count_feedback_tags, join,
};
use crate::store::{Collection, Document, DocumentStore};
use crate::table::{Table, Value};

pub use views::{
    BROWSE_COLUMNS, BrowseView, FeedbackAnnotation, HealthReport, RefreshSummary,
    SEARCH_DEFAULT_COLUMNS, SearchQuery, SearchView, Sentiment, TRANSCRIPT_COLUMNS,
    TranscriptEntry, TranscriptView,
};

/// Shared by every HTTP session.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn DocumentStore>,
    cache: Arc<ResultCache>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<ResultCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Every document of `collection`, fetched once per cache generation.
    pub async fn collection(&self, collection: Collection) -> Result<Arc<Vec<Document>>> {
        let docs = self
            .cache
            .get_or_compute(CacheKey::Collection(collection), || {
                self.store.fetch_collection(collection)
            })
            .await?;
        Ok(docs)
    }

    pub async fn conversation_table(&self) -> Result<Arc<Table>> {
        self.cache
            .get_or_compute(CacheKey::ConversationTable, || async {
                let docs = self.collection(Collection::Conversations).await?;
                Ok::<_, Error>(build_conversation_table(&docs)?)
            })
            .await
    }

    pub async fn feedback_table(&self) -> Result<Arc<Table>> {
        self.cache
            .get_or_compute(CacheKey::FeedbackTable, || async {
                let docs = self.collection(Collection::Feedback).await?;
                Ok::<_, Error>(build_feedback_table(&docs))
            })
            .await
    }

    /// Join the conversation and feedback tables as described by `spec`.
    pub async fn merged(&self, spec: &JoinSpec) -> Result<Arc<Table>> {
        self.cache
            .get_or_compute(CacheKey::Merged(spec.clone()), || async {
                let conversations = self.conversation_table().await?;
                let feedback = self.feedback_table().await?;
                Ok::<_, Error>(join(&conversations, &feedback, spec)?)
            })
            .await
    }

    /// Every feedback record with its message, plus tag frequencies.
    pub async fn browse_feedback(&self) -> Result<BrowseView> {
        let table = self.merged(&JoinSpec::new(JoinMode::Right, &BROWSE_COLUMNS)).await?;
        let tag_counts = count_feedback_tags(&table)?;
        Ok(BrowseView {
            table: (*table).clone(),
            tag_counts,
        })
    }

    /// Rows of one conversation projected to the chosen columns.
    ///
    /// Without a conversation id the first conversation in store order is
    /// selected. An id that matches no row is [`Error::ConversationNotFound`].
    pub async fn search_conversations(&self, query: SearchQuery) -> Result<SearchView> {
        let table = self.conversation_table().await?;
        let conversation_ids = table.distinct_text("conversation_id")?;

        let selected_conversation = match query.conversation_id {
            Some(id) if !conversation_ids.contains(&id) => {
                return Err(Error::ConversationNotFound(id));
            }
            Some(id) => Some(id),
            None => conversation_ids.first().cloned(),
        };
        let selected_columns = query.columns.unwrap_or_else(|| {
            SEARCH_DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
        });

        let rows = match &selected_conversation {
            Some(id) => table.filter_eq("conversation_id", &Value::from(id.as_str()))?,
            None => Table::new(table.columns().to_vec()),
        };

        Ok(SearchView {
            available_columns: table.sorted_columns(),
            conversation_ids,
            selected_conversation,
            table: rows.select(&selected_columns)?,
            selected_columns,
        })
    }

    /// Chat transcript of one conversation with inline feedback.
    pub async fn view_conversation(&self, conversation_id: &str) -> Result<TranscriptView> {
        let spec = JoinSpec::new(JoinMode::Left, &TRANSCRIPT_COLUMNS).ordered();
        let merged = self.merged(&spec).await?;
        let rows = merged.filter_eq("conversation_id", &Value::from(conversation_id))?;
        views::build_transcript(conversation_id, &rows)
            .ok_or_else(|| Error::ConversationNotFound(conversation_id.to_string()))
    }

    /// Drop every cached result and rebuild from the store.
    pub async fn refresh(&self) -> Result<RefreshSummary> {
        self.cache.invalidate_all().await;

        let conversations = self.collection(Collection::Conversations).await?;
        let feedback = self.collection(Collection::Feedback).await?;
        let table = self.conversation_table().await?;
        self.feedback_table().await?;

        let summary = RefreshSummary {
            conversations: conversations.len(),
            feedback: feedback.len(),
            messages: table.len(),
        };
        info!(
            conversations = summary.conversations,
            feedback = summary.feedback,
            messages = summary.messages,
            "Dashboard refreshed"
        );
        Ok(summary)
    }

    /// Store reachability and cache counters. Never fails.
    pub async fn health(&self) -> HealthReport {
        let (status, store) = match self.store.ping().await {
            Ok(()) => ("ok", "ok".to_string()),
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                ("degraded", e.to_string())
            }
        };
        HealthReport {
            status,
            store,
            cache: self.cache.stats().await,
        }
    }
}
