// ============================================================================
// Document Store - Schemaless Key -> Document Persistence
// ============================================================================
//
// The only external collaborator of the record layer. Documents are JSON
// objects addressed by collection name + document key.
//
// Backends:
// - memory  - in-process ordered maps (local runs, tests)
// - scylla  - ScyllaDB table holding JSON bodies (production)
//
// ============================================================================

mod memory;
mod scylla_store;

pub use memory::MemoryDocumentStore;
pub use scylla_store::ScyllaDocumentStore;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

/// A stored document. Always a JSON object at the top level.
pub type Document = Value;

/// Lazy, finite, forward-only sequence of query results.
pub type DocumentStream = BoxStream<'static, Result<Document, StoreError>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document already exists: {collection}/{key}")]
    AlreadyExists { collection: String, key: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("document decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document; `Ok(None)` when the key is absent
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError>;

    /// Create-if-absent. Fails with `StoreError::AlreadyExists` when the key is taken.
    async fn create(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Full overwrite, creating the document if absent
    async fn set(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;

    /// Equality filter on a top-level field
    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<DocumentStream, StoreError>;
}

/// Equality used by `query_equal`: strings compare directly, other scalars
/// by their JSON text (`42`, `true`).
pub fn field_matches(document: &Document, field: &str, value: &str) -> bool {
    match document.get(field) {
        Some(Value::String(s)) => s == value,
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string() == value,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_matches_strings_and_scalars() {
        let doc = json!({"Status": "open", "Priority": 3, "Pinned": true, "Tags": ["a"]});

        assert!(field_matches(&doc, "Status", "open"));
        assert!(!field_matches(&doc, "Status", "Open"));
        assert!(field_matches(&doc, "Priority", "3"));
        assert!(field_matches(&doc, "Pinned", "true"));
        assert!(!field_matches(&doc, "Tags", "a"));
        assert!(!field_matches(&doc, "Missing", ""));
    }
}
