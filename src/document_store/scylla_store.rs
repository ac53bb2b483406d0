use async_trait::async_trait;
use chrono::Utc;
use futures_util::{future, StreamExt, TryStreamExt};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::value::{CqlValue, Row};
use std::sync::Arc;

use super::{field_matches, Document, DocumentStore, DocumentStream, StoreError};

// ============================================================================
// ScyllaDB Document Store
// ============================================================================
//
// Layout: one table, one partition per collection, JSON body stored as text.
//
//   documents (collection, doc_key) -> body, updated_at
//
// - create  : lightweight transaction (INSERT ... IF NOT EXISTS); the
//             [applied] column tells a fresh insert from a collision
// - set     : plain INSERT (upsert)
// - query   : pages through the collection partition with query_iter and
//             filters on the decoded body, so nothing is buffered up front
//
// ============================================================================

pub struct ScyllaDocumentStore {
    session: Arc<Session>,
}

impl ScyllaDocumentStore {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// Connect to the cluster and make sure keyspace and table exist
    pub async fn connect(nodes: &[String], keyspace: &str) -> Result<Self, StoreError> {
        let mut builder = SessionBuilder::new();
        for node in nodes {
            builder = builder.known_node(node);
        }
        let session: Session = builder.build().await.map_err(StoreError::backend)?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(StoreError::backend)?;

        session
            .use_keyspace(keyspace, false)
            .await
            .map_err(StoreError::backend)?;

        session
            .query_unpaged(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection text,
                    doc_key text,
                    body text,
                    updated_at timestamp,
                    PRIMARY KEY ((collection), doc_key)
                )",
                &[],
            )
            .await
            .map_err(StoreError::backend)?;

        tracing::info!(
            keyspace = %keyspace,
            nodes = ?nodes,
            "Connected to ScyllaDB document store"
        );

        Ok(Self::new(Arc::new(session)))
    }
}

#[async_trait]
impl DocumentStore for ScyllaDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let result = self
            .session
            .query_unpaged(
                "SELECT body FROM documents WHERE collection = ? AND doc_key = ?",
                (collection, key),
            )
            .await
            .map_err(StoreError::backend)?;

        let rows_result = result.into_rows_result().map_err(StoreError::backend)?;

        match rows_result
            .maybe_first_row::<(String,)>()
            .map_err(StoreError::backend)?
        {
            Some((body,)) => Ok(Some(parse_body(&body)?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(&document)?;

        let result = self
            .session
            .query_unpaged(
                "INSERT INTO documents (collection, doc_key, body, updated_at)
                 VALUES (?, ?, ?, ?) IF NOT EXISTS",
                (collection, key, body, Utc::now()),
            )
            .await
            .map_err(StoreError::backend)?;

        let rows_result = result.into_rows_result().map_err(StoreError::backend)?;
        let row = rows_result
            .maybe_first_row::<Row>()
            .map_err(StoreError::backend)?;

        if lwt_applied(row.as_ref()) {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists {
                collection: collection.to_string(),
                key: key.to_string(),
            })
        }
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> Result<(), StoreError> {
        let body = serde_json::to_string(&document)?;

        self.session
            .query_unpaged(
                "INSERT INTO documents (collection, doc_key, body, updated_at) VALUES (?, ?, ?, ?)",
                (collection, key, body, Utc::now()),
            )
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.session
            .query_unpaged(
                "DELETE FROM documents WHERE collection = ? AND doc_key = ?",
                (collection, key),
            )
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn query_equal(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<DocumentStream, StoreError> {
        let pager = self
            .session
            .query_iter(
                "SELECT body FROM documents WHERE collection = ?",
                (collection,),
            )
            .await
            .map_err(StoreError::backend)?;

        let rows = pager
            .rows_stream::<(String,)>()
            .map_err(StoreError::backend)?;

        let field = field.to_string();
        let value = value.to_string();

        let stream = rows
            .map(|row| {
                row.map_err(StoreError::backend)
                    .and_then(|(body,)| parse_body(&body))
            })
            .try_filter(move |doc| future::ready(field_matches(doc, &field, &value)));

        Ok(stream.boxed())
    }
}

/// Decode a stored body; anything but a JSON object is corrupt
fn parse_body(body: &str) -> Result<Document, StoreError> {
    let document: Document = serde_json::from_str(body)?;
    if !document.is_object() {
        return Err(StoreError::Backend(format!(
            "stored body is not a JSON object: {}",
            body
        )));
    }
    Ok(document)
}

/// First column of an LWT result row is `[applied]`
fn lwt_applied(row: Option<&Row>) -> bool {
    matches!(
        row.and_then(|r| r.columns.first()),
        Some(Some(CqlValue::Boolean(true)))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_accepts_objects_only() {
        let doc = parse_body(r#"{"Title":"x"}"#).unwrap();
        assert_eq!(doc["Title"], "x");

        assert!(matches!(parse_body("[1,2]"), Err(StoreError::Backend(_))));
        assert!(matches!(parse_body("not json"), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_lwt_applied_reads_first_column() {
        let applied = Row {
            columns: vec![Some(CqlValue::Boolean(true))],
        };
        let rejected = Row {
            columns: vec![
                Some(CqlValue::Boolean(false)),
                Some(CqlValue::Text("notes".to_string())),
            ],
        };

        assert!(lwt_applied(Some(&applied)));
        assert!(!lwt_applied(Some(&rejected)));
        assert!(!lwt_applied(None));
    }
}
