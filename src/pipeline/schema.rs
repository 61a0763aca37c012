//! Field schemas for raw documents.
//!
//! Every field the pipeline reads from a conversation or message document is
//! declared here as either required or defaulted. Documents are checked once,
//! at the flattening boundary, and typed accessors on [`Fields`] take over
//! from there.

use serde_json::Value as Json;

use crate::error::PipelineError;
use crate::store::{Document, canonical_id};

/// Default used when a defaulted field is absent or null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    False,
    Null,
    EmptyList,
}

impl DefaultValue {
    fn to_json(self) -> Json {
        match self {
            DefaultValue::False => Json::Bool(false),
            DefaultValue::Null => Json::Null,
            DefaultValue::EmptyList => Json::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Defaulted(DefaultValue),
}

/// One field of a document schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub presence: Presence,
}

const fn required(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        presence: Presence::Required,
    }
}

const fn defaulted(name: &'static str, default: DefaultValue) -> FieldSpec {
    FieldSpec {
        name,
        presence: Presence::Defaulted(default),
    }
}

/// Fields of a message nested in a conversation document.
pub const MESSAGE_SCHEMA: &[FieldSpec] = &[
    required("id"),
    required("from"),
    required("content"),
    required("createdAt"),
    required("updatedAt"),
    required("ancestors"),
    required("children"),
    defaulted("interrupted", DefaultValue::False),
    defaulted("score", DefaultValue::Null),
    defaulted("updates", DefaultValue::EmptyList),
];

/// Session-level fields of a conversation document.
pub const CONVERSATION_SCHEMA: &[FieldSpec] = &[
    required("_id"),
    required("title"),
    required("messages"),
    defaulted("rootMessageId", DefaultValue::Null),
    defaulted("model", DefaultValue::Null),
    defaulted("preprompt", DefaultValue::Null),
    defaulted("assistantId", DefaultValue::Null),
    defaulted("createdAt", DefaultValue::Null),
    defaulted("updatedAt", DefaultValue::Null),
    defaulted("userAgent", DefaultValue::Null),
    defaulted("embeddingModel", DefaultValue::Null),
    defaulted("sessionId", DefaultValue::Null),
];

/// A document that passed schema validation.
///
/// Required fields are guaranteed present and non-null; defaulted fields are
/// filled in. Accessors only fail on a wrong type.
pub struct Fields<'a> {
    doc: &'a Document,
    schema: &'static [FieldSpec],
    context: String,
}

impl<'a> Fields<'a> {
    /// Validate `doc` against `schema`. The first missing required field wins.
    pub fn validate(
        doc: &'a Document,
        schema: &'static [FieldSpec],
        context: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let context = context.into();
        for spec in schema.iter().filter(|s| s.presence == Presence::Required) {
            if doc.get(spec.name).is_none_or(Json::is_null) {
                return Err(PipelineError::missing(context, spec.name));
            }
        }
        Ok(Self {
            doc,
            schema,
            context,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Raw value of a declared field, with its default applied.
    pub fn raw(&self, name: &str) -> Json {
        match self.doc.get(name) {
            Some(v) if !v.is_null() => v.clone(),
            _ => self
                .schema
                .iter()
                .find(|s| s.name == name)
                .and_then(|s| match s.presence {
                    Presence::Defaulted(d) => Some(d.to_json()),
                    Presence::Required => None,
                })
                .unwrap_or(Json::Null),
        }
    }

    fn invalid(&self, name: &str, expected: &str, got: &Json) -> PipelineError {
        PipelineError::invalid(&self.context, name, format!("expected {expected}, got `{got}`"))
    }

    /// Identifier field: strings, numbers and object ids are accepted.
    pub fn id(&self, name: &str) -> Result<String, PipelineError> {
        let value = self.raw(name);
        canonical_id(&value).ok_or_else(|| self.invalid(name, "an identifier", &value))
    }

    pub fn text(&self, name: &str) -> Result<String, PipelineError> {
        match self.raw(name) {
            Json::String(s) => Ok(s),
            other => Err(self.invalid(name, "a string", &other)),
        }
    }

    pub fn optional_text(&self, name: &str) -> Result<Option<String>, PipelineError> {
        match self.raw(name) {
            Json::Null => Ok(None),
            Json::String(s) => Ok(Some(s)),
            other => Err(self.invalid(name, "a string", &other)),
        }
    }

    /// Optional identifier, e.g. a reference to another document.
    pub fn optional_id(&self, name: &str) -> Result<Option<String>, PipelineError> {
        match self.raw(name) {
            Json::Null => Ok(None),
            other => canonical_id(&other)
                .map(Some)
                .ok_or_else(|| self.invalid(name, "an identifier", &other)),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, PipelineError> {
        match self.raw(name) {
            Json::Bool(b) => Ok(b),
            other => Err(self.invalid(name, "a boolean", &other)),
        }
    }

    pub fn optional_number(&self, name: &str) -> Result<Option<serde_json::Number>, PipelineError> {
        match self.raw(name) {
            Json::Null => Ok(None),
            Json::Number(n) => Ok(Some(n)),
            other => Err(self.invalid(name, "a number", &other)),
        }
    }

    /// List of identifiers (message ancestor/child links).
    pub fn id_list(&self, name: &str) -> Result<Vec<String>, PipelineError> {
        match self.raw(name) {
            Json::Array(items) => items
                .iter()
                .map(|item| canonical_id(item).ok_or_else(|| self.invalid(name, "a list of identifiers", item)))
                .collect(),
            other => Err(self.invalid(name, "a list", &other)),
        }
    }

    /// List of arbitrary values, kept as-is.
    pub fn list(&self, name: &str) -> Result<Vec<Json>, PipelineError> {
        match self.raw(name) {
            Json::Array(items) => Ok(items),
            other => Err(self.invalid(name, "a list", &other)),
        }
    }

    /// Nested documents (a conversation's messages).
    pub fn documents(&self, name: &str) -> Result<Vec<&'a Document>, PipelineError> {
        match self.doc.get(name) {
            Some(Json::Array(items)) => items
                .iter()
                .map(|item| item.as_object().ok_or_else(|| self.invalid(name, "a list of objects", item)))
                .collect(),
            Some(other) => Err(self.invalid(name, "a list", other)),
            None => Err(PipelineError::missing(&self.context, name)),
        }
    }
}
