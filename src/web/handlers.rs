use actix_web::{web, HttpResponse, Responder};
use log::{debug, error, info, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::web::models::{ChatResponse, HealthResponse};
use crate::AppState;

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
    })
}

// CORS preflight
pub async fn preflight() -> impl Responder {
    HttpResponse::NoContent().finish()
}

// Chat API endpoint
pub async fn chat(
    data: web::Data<AppState>,
    body: Result<web::Bytes, actix_web::Error>,
) -> Result<HttpResponse, ChatError> {
    let request_id = Uuid::new_v4();

    // Oversized or broken bodies still get a JSON error instead of actix's plain-text one.
    let body = body.map_err(|e| {
        warn!("Unreadable body for chat request {}: {}", request_id, e);
        ChatError::Payload(e.to_string())
    })?;

    // A body that isn't JSON is reported the same way as one without messages.
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let conversation = Conversation::from_json(&payload).map_err(|e| {
        warn!("Rejected chat request {}: {}", request_id, e);
        ChatError::from(e)
    })?;

    info!(
        "Chat request {}: {} turns via {}",
        request_id,
        conversation.len(),
        data.provider.name()
    );
    debug!("Pending turn for {}: {}", request_id, conversation.pending().content);

    let reply = data
        .provider
        .generate(&data.persona, &conversation)
        .await
        .map_err(|e| {
            error!("Provider error for {}: {}", request_id, e);
            ChatError::from(e)
        })?;

    info!("Reply for {}: {} characters", request_id, reply.len());
    Ok(HttpResponse::Ok().json(ChatResponse { reply }))
}
