use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Instant;
use tracing::Instrument;

use crate::domain::notes::{encode_url, find_by_encoded_url, Note};
use crate::record_store::RecordError;

use super::errors::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    encodedurl: Option<String>,
    url: Option<String>,
    field: Option<String>,
    value: Option<String>,
}

/// Run one record store operation inside a request span and record it
async fn observed<T, F>(
    state: &AppState,
    operation: &'static str,
    fut: F,
) -> Result<T, RecordError>
where
    F: Future<Output = Result<T, RecordError>>,
{
    let span = tracing::info_span!("request", operation, request_id = %uuid::Uuid::new_v4());
    let started = Instant::now();

    let result = fut.instrument(span.clone()).await;

    let error = result.as_ref().err().map(RecordError::kind);
    state
        .metrics
        .record_operation(operation, started.elapsed().as_secs_f64(), error);
    if let Err(e) = &result {
        span.in_scope(|| tracing::warn!(error = %e, "Request failed"));
    }
    result
}

pub async fn get_notes(
    state: web::Data<AppState>,
    query: web::Query<NotesQuery>,
) -> Result<HttpResponse, ApiError> {
    let ctx = state.op_context();
    let query = query.into_inner();

    if let Some(encoded) = query.encodedurl {
        let lookup = find_by_encoded_url(&state.notes, &ctx, &encoded);
        let note = observed(&state, "find", lookup).await?;
        return Ok(HttpResponse::Ok().json(note));
    }

    if let Some(url) = query.url {
        let encoded = encode_url(&url);
        let lookup = find_by_encoded_url(&state.notes, &ctx, &encoded);
        let note = observed(&state, "find", lookup).await?;
        return Ok(HttpResponse::Ok().json(note));
    }

    match (query.field, query.value) {
        (Some(field), Some(value)) => {
            let notes = observed(&state, "get", state.notes.get(&ctx, &field, &value)).await?;
            Ok(HttpResponse::Ok().json(notes))
        }
        _ => Err(ApiError::BadRequest(
            "url parameter is missing in URI: expected encodedurl, url, or field and value"
                .to_string(),
        )),
    }
}

pub async fn get_note(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ctx = state.op_context();
    let id = path.into_inner();

    let note = observed(&state, "get_by_id", state.notes.get_by_id(&ctx, &id)).await?;
    Ok(HttpResponse::Ok().json(note))
}

pub async fn post_notes(state: web::Data<AppState>, body: web::Json<Vec<Note>>) -> HttpResponse {
    let ctx = state.op_context();
    let span = tracing::info_span!(
        "request",
        operation = "post",
        request_id = %uuid::Uuid::new_v4()
    );
    let started = Instant::now();

    let outcome = state
        .notes
        .post(&ctx, body.into_inner())
        .instrument(span)
        .await;

    state.metrics.record_post(outcome.accepted.len(), &outcome.failures);
    let error = outcome.failures.first().map(|f| f.kind);
    state
        .metrics
        .record_operation("post", started.elapsed().as_secs_f64(), error);

    match outcome.into_parts() {
        (accepted, None) => HttpResponse::Ok().json(accepted),
        (accepted, Some(aggregate)) => HttpResponse::InternalServerError().json(json!({
            "error": aggregate.to_string(),
            "failures": aggregate.failures,
            "accepted": accepted,
        })),
    }
}

pub async fn put_note(
    state: web::Data<AppState>,
    body: web::Json<Note>,
) -> Result<HttpResponse, ApiError> {
    let ctx = state.op_context();

    let note = observed(&state, "put", state.notes.put(&ctx, body.into_inner())).await?;
    Ok(HttpResponse::Ok().json(note))
}

pub async fn delete_note(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let ctx = state.op_context();
    let id = path.into_inner();

    observed(&state, "delete", state.notes.delete(&ctx, &id)).await?;
    Ok(HttpResponse::Ok().json(json!({ "deleted": id })))
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "research-notes"
    }))
}

pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.encode() {
        Ok(buffer) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(buffer),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}
