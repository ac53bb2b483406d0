// ============================================================================
// HTTP API - thin request/response marshaling over the record store
// ============================================================================
//
//   GET    /notes?encodedurl=..     lookup by encoded URL
//   GET    /notes?url=..            lookup by raw URL (encoded server side)
//   GET    /notes?field=..&value=.. equality query
//   GET    /notes/{id}              fetch by key
//   POST   /notes                   batch create (JSON array)
//   PUT    /notes                   full replace of one existing note
//   DELETE /notes/{id}              delete by key
//   GET    /health, /metrics
//
// ============================================================================

mod errors;
mod handlers;

use actix_web::{error::InternalError, web, App, HttpResponse, HttpServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::notes::Note;
use crate::metrics::Metrics;
use crate::record_store::{OpContext, RecordStore};

/// Shared by every worker; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub notes: RecordStore<Note>,
    pub metrics: Arc<Metrics>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Context bounding the store calls of one request
    pub fn op_context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout)
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health))
        .route("/metrics", web::get().to(handlers::metrics))
        .service(
            web::resource("/notes")
                .route(web::get().to(handlers::get_notes))
                .route(web::post().to(handlers::post_notes))
                .route(web::put().to(handlers::put_note)),
        )
        .service(
            web::resource("/notes/{id}")
                .route(web::get().to(handlers::get_note))
                .route(web::delete().to(handlers::delete_note)),
        );
}

/// Malformed bodies become 400 with the decoder's message
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        tracing::warn!(error = %message, "Rejected malformed request body");
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(serde_json::json!({ "error": message })),
        )
        .into()
    })
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    tracing::info!("🌐 Starting notes API on http://{}", addr);

    let data = web::Data::new(state);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind(addr)?
        .run()
        .await
}
