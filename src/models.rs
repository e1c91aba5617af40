//! Core data models that flow through the retrieval and chat pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A document fetched from a source tree. Immutable once fetched; a new
/// index snapshot supersedes the documents of the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Source identifier (e.g. `"filesystem"`, `"remote"`).
    pub source: String,
    /// Path of the document within the source tree.
    pub path: String,
    /// Full text content.
    pub content: String,
}

impl Document {
    pub fn new(
        source: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            path: path.into(),
            content: content.into(),
        }
    }

    /// Provenance label used in context sources and logs: `"{source}:{path}"`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.source, self.path)
    }
}

/// A single retrieval result, produced transiently per query.
///
/// `score` is monotonic in similarity: higher means closer. The document is
/// shared with the index snapshot that produced it, so matches stay cheap to
/// clone and valid for as long as the caller holds them.
#[derive(Debug, Clone)]
pub struct Match {
    pub document: Arc<Document>,
    pub score: f32,
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry in a session's append-only message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
