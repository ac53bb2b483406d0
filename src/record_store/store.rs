use chrono::Utc;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::document_store::{Document, DocumentStore, DocumentStream, StoreError};

use super::context::OpContext;
use super::errors::{AggregateError, RecordError, RecordFailure};
use super::record::{Record, Timestamps};

/// Lazy sequence of decoded records; ends after the first error
pub type RecordStream<R> = BoxStream<'static, Result<R, RecordError>>;

// ============================================================================
// Generic Record Store - CRUD over a Document Store
// ============================================================================
//
// Type Parameter:
// - `R`: the record type (must implement Record)
//
// Responsibilities:
// 1. Stamp timestamps and write records (create-only, update-only)
// 2. Enforce non-empty identity before touching the store
// 3. Check existence before update/delete
// 4. Aggregate per-record failures for batch creates
// 5. Classify every store failure (see RecordError)
//
// Holds nothing but the store handle; safe to clone and share across
// requests. No retries, no caching: every read goes to the store.
//
// ============================================================================

pub struct RecordStore<R: Record> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

/// Result of a batch create: accepted records and classified failures,
/// both in submission order
#[derive(Debug)]
pub struct PostOutcome<R> {
    pub accepted: Vec<R>,
    pub failures: Vec<RecordFailure>,
}

impl<R> Default for PostOutcome<R> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<R: Record> PostOutcome<R> {
    pub fn accepted_ids(&self) -> Vec<String> {
        self.accepted.iter().map(|r| r.id()).collect()
    }

    /// Accepted records, plus the aggregate error when anything was rejected
    pub fn into_parts(self) -> (Vec<R>, Option<AggregateError>) {
        let error = if self.failures.is_empty() {
            None
        } else {
            Some(AggregateError {
                failures: self.failures,
            })
        };
        (self.accepted, error)
    }
}

impl<R: Record> RecordStore<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Create every record that does not exist yet.
    ///
    /// Does not stop at the first failure and does not roll back: each
    /// record is attempted exactly once, in order.
    pub async fn post(&self, ctx: &OpContext, records: Vec<R>) -> PostOutcome<R> {
        let mut outcome = PostOutcome::default();

        for (index, mut record) in records.into_iter().enumerate() {
            let now = Utc::now();
            record.normalize();
            *record.timestamps_mut() = Timestamps {
                created_date: Some(now),
                last_update: Some(now),
            };

            let key = record.id();
            if key.is_empty() {
                outcome.failures.push(RecordFailure::new(
                    index,
                    key,
                    RecordError::EmptyInput("record key".to_string()),
                ));
                continue;
            }

            let result = match encode(&record) {
                Ok(document) => ctx.run(self.store.create(R::COLLECTION, &key, document)).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(collection = R::COLLECTION, key = %key, "Created record");
                    outcome.accepted.push(record);
                }
                Err(e) => {
                    let error = RecordError::from_store(&key, e);
                    tracing::warn!(
                        collection = R::COLLECTION,
                        key = %key,
                        index = index,
                        error = %error,
                        "Record rejected"
                    );
                    outcome.failures.push(RecordFailure::new(index, key, error));
                }
            }
        }

        tracing::info!(
            collection = R::COLLECTION,
            accepted = outcome.accepted.len(),
            rejected = outcome.failures.len(),
            "Post completed"
        );
        tracing::debug!(
            collection = R::COLLECTION,
            keys = ?outcome.accepted_ids(),
            "Accepted keys"
        );

        outcome
    }

    /// Replace an existing record. Never creates.
    ///
    /// Identity is immutable; `LastUpdate` is refreshed and `CreatedDate`
    /// is kept from the stored document when the caller omitted it.
    pub async fn put(&self, ctx: &OpContext, mut record: R) -> Result<R, RecordError> {
        record.normalize();
        let key = record.id();
        if key.is_empty() {
            return Err(RecordError::EmptyInput(format!(
                "key fields are missing: key {:?}",
                key
            )));
        }

        let existing = self
            .lookup(ctx, &key)
            .await?
            .ok_or_else(|| RecordError::NotFound(key.clone()))?;

        if record.timestamps().created_date.is_none() {
            let stored: Timestamps = serde_json::from_value(existing)
                .map_err(|e| RecordError::Generic(format!("{}: {}", key, e)))?;
            record.timestamps_mut().created_date = stored.created_date;
        }
        record.timestamps_mut().last_update = Some(Utc::now());

        let document =
            encode(&record).map_err(|e| RecordError::Generic(format!("{}: {}", key, e)))?;
        ctx.run(self.store.set(R::COLLECTION, &key, document))
            .await
            .map_err(|e| RecordError::from_store(&key, e))?;

        tracing::info!(collection = R::COLLECTION, key = %key, "Updated record");
        Ok(record)
    }

    pub async fn delete(&self, ctx: &OpContext, key: &str) -> Result<(), RecordError> {
        if key.is_empty() {
            return Err(RecordError::EmptyInput("id".to_string()));
        }
        if !self.exists(ctx, key).await? {
            return Err(RecordError::NotFound(key.to_string()));
        }

        ctx.run(self.store.delete(R::COLLECTION, key))
            .await
            .map_err(|e| RecordError::from_store(key, e))?;

        tracing::info!(collection = R::COLLECTION, key = %key, "Deleted record");
        Ok(())
    }

    pub async fn get_by_id(&self, ctx: &OpContext, key: &str) -> Result<R, RecordError> {
        if key.is_empty() {
            return Err(RecordError::EmptyInput("id missing, provide id".to_string()));
        }

        let document = self
            .lookup(ctx, key)
            .await?
            .ok_or_else(|| RecordError::NotFound(key.to_string()))?;

        decode(document).map_err(|e| RecordError::Generic(format!("{}: {}", key, e)))
    }

    /// All records whose `field` equals `value`, in store order
    pub async fn get(
        &self,
        ctx: &OpContext,
        field: &str,
        value: &str,
    ) -> Result<Vec<R>, RecordError> {
        let records: Vec<R> = self
            .query_stream(ctx, field, value)
            .await?
            .try_collect()
            .await?;

        tracing::debug!(
            collection = R::COLLECTION,
            field = %field,
            value = %value,
            count = records.len(),
            "Query completed"
        );
        Ok(records)
    }

    /// Lazy form of `get`. Consumers may stop early; each pull is bounded
    /// by `ctx` and the first fetch or decode error ends the stream.
    pub async fn query_stream(
        &self,
        ctx: &OpContext,
        field: &str,
        value: &str,
    ) -> Result<RecordStream<R>, RecordError> {
        if field.is_empty() {
            return Err(RecordError::EmptyInput("field missing, provide field".to_string()));
        }

        let query = format!("{} == {:?}", field, value);
        let documents = ctx
            .run(self.store.query_equal(R::COLLECTION, field, value))
            .await
            .map_err(|e| RecordError::from_store(&query, e))?;

        Ok(decode_stream(ctx.clone(), query, documents))
    }

    async fn exists(&self, ctx: &OpContext, key: &str) -> Result<bool, RecordError> {
        Ok(self.lookup(ctx, key).await?.is_some())
    }

    /// Fetch the raw document. A failed fetch is reported, not taken as absence.
    async fn lookup(&self, ctx: &OpContext, key: &str) -> Result<Option<Document>, RecordError> {
        ctx.run(self.store.get(R::COLLECTION, key)).await.map_err(|e| {
            tracing::error!(
                collection = R::COLLECTION,
                key = %key,
                error = %e,
                "Document fetch failed"
            );
            RecordError::Generic(format!("fetch of {} failed: {}", key, e))
        })
    }
}

fn encode<R: Record>(record: &R) -> Result<Document, serde_json::Error> {
    serde_json::to_value(record)
}

fn decode<R: Record>(document: Document) -> Result<R, serde_json::Error> {
    serde_json::from_value(document)
}

type QueryState = (OpContext, String, DocumentStream);

fn decode_stream<R: Record>(
    ctx: OpContext,
    query: String,
    documents: DocumentStream,
) -> RecordStream<R> {
    stream::try_unfold((ctx, query, documents), next_record::<R>).boxed()
}

async fn next_record<R: Record>(state: QueryState) -> Result<Option<(R, QueryState)>, RecordError> {
    let (ctx, query, mut documents) = state;

    let next = ctx
        .run(async { Ok::<_, StoreError>(documents.next().await) })
        .await
        .map_err(|e| RecordError::from_store(&query, e))?;

    let document = match next {
        None => return Ok(None),
        Some(document) => document.map_err(|e| RecordError::from_store(&query, e))?,
    };

    let record =
        decode::<R>(document).map_err(|e| RecordError::Generic(format!("{}: {}", query, e)))?;
    Ok(Some((record, (ctx, query, documents))))
}
