use futures_util::TryStreamExt;

use crate::record_store::{OpContext, RecordError, RecordStore};

use super::note::{Note, ENCODED_URL_FIELD};

/// Look a note up by its encoded URL. Stops at the first match.
pub async fn find_by_encoded_url(
    store: &RecordStore<Note>,
    ctx: &OpContext,
    encoded_url: &str,
) -> Result<Note, RecordError> {
    if encoded_url.is_empty() {
        return Err(RecordError::EmptyInput("encodedurl".to_string()));
    }

    let mut matches = store.query_stream(ctx, ENCODED_URL_FIELD, encoded_url).await?;
    match matches.try_next().await? {
        Some(note) => Ok(note),
        None => {
            tracing::debug!(encoded_url = %encoded_url, "No note matches encoded URL");
            Err(RecordError::NotFound(encoded_url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::MemoryDocumentStore;
    use crate::domain::notes::encode_url;
    use crate::record_store::{ErrorKind, Record};
    use std::sync::Arc;

    fn store() -> RecordStore<Note> {
        RecordStore::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_find_by_encoded_url() {
        let store = store();
        let ctx = OpContext::background();
        let mut note = Note::new("https://example.com/paper");
        note.title = "Paper".to_string();
        store.post(&ctx, vec![note, Note::new("https://example.com/other")]).await;

        let found = find_by_encoded_url(&store, &ctx, &encode_url("https://example.com/paper/"))
            .await
            .unwrap();

        assert_eq!(found.title, "Paper");
        assert_eq!(found.encoded_url, found.id());
    }

    #[tokio::test]
    async fn test_find_by_encoded_url_not_found() {
        let store = store();
        let ctx = OpContext::background();

        let err = find_by_encoded_url(&store, &ctx, "bm9wZQ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = find_by_encoded_url(&store, &ctx, "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    #[tokio::test]
    async fn test_note_round_trip_through_store() {
        let store = store();
        let ctx = OpContext::background();
        let mut note = Note::new("https://example.com/round-trip");
        note.title = "A".to_string();
        note.notes = "B".to_string();

        let outcome = store.post(&ctx, vec![note]).await;
        let id = outcome.accepted_ids().remove(0);

        let fetched = store.get_by_id(&ctx, &id).await.unwrap();
        assert_eq!(fetched.title, "A");
        assert_eq!(fetched.notes, "B");
        assert!(fetched.timestamps.created_date.is_some());
        assert!(fetched.timestamps.last_update.is_some());
    }
}
