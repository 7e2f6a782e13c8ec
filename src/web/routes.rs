use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web;

use crate::web::handlers;

/// Upper bound on a `/chat` body. Callers resend the whole history every turn.
pub const MAX_CHAT_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/chat")
            .app_data(web::PayloadConfig::new(MAX_CHAT_BODY_BYTES))
            .route(web::post().to(handlers::chat))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    )
    .service(
        web::resource("/health")
            .route(web::get().to(handlers::health_check))
            .route(web::method(Method::OPTIONS).to(handlers::preflight)),
    );
}

/// Open CORS policy; the relay is meant to be called from any browser origin.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
}
