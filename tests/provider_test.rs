use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use chat_relay::config::{ProviderConfig, ProviderKind};
use chat_relay::conversation::Conversation;
use chat_relay::error::ProviderError;
use chat_relay::model::{build_provider, ChatProvider};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// What the mock upstream saw for one request.
#[derive(Debug, Clone)]
struct CapturedRequest {
    path: String,
    headers: Vec<(String, String)>,
    body: Value,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct MockState {
    status: u16,
    response: Value,
    captured: Mutex<Vec<CapturedRequest>>,
}

async fn capture(req: HttpRequest, body: web::Bytes, state: web::Data<MockState>) -> HttpResponse {
    let headers = req
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    state.captured.lock().unwrap().push(CapturedRequest {
        path: req.path().to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });
    let status = actix_web::http::StatusCode::from_u16(state.status).unwrap();
    HttpResponse::build(status).json(state.response.clone())
}

/// Mock provider API answering every request with a fixed status and body.
struct MockUpstream {
    url: String,
    state: web::Data<MockState>,
    handle: actix_web::dev::ServerHandle,
}

impl MockUpstream {
    async fn start(status: u16, response: Value) -> Self {
        let state = web::Data::new(MockState {
            status,
            response,
            captured: Mutex::new(Vec::new()),
        });
        let app_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(app_state.clone())
                .default_service(web::to(capture))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.state.captured.lock().unwrap().clone()
    }

    async fn stop(self) {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(5), self.handle.stop(false)).await;
    }
}

fn conversation() -> Conversation {
    Conversation::from_json(&json!({"messages": [
        {"role": "user", "content": " Hi "},
        {"role": "assistant", "content": "Hello! What are you working on?"},
        {"role": "user", "content": "A tiny CPU in Verilog."}
    ]}))
    .unwrap()
}

fn config(kind: ProviderKind, base_url: &str) -> ProviderConfig {
    ProviderConfig::new(kind, Some("test-key".to_string())).with_base_url(base_url)
}

#[actix_web::test]
async fn gemini_sends_history_and_system_instruction() {
    let upstream = MockUpstream::start(
        200,
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Neat! Pipelined?"}]}}]}),
    )
    .await;
    let provider = build_provider(&config(ProviderKind::Gemini, &upstream.url));

    let reply = provider.generate("persona text", &conversation()).await.unwrap();
    assert_eq!(reply, "Neat! Pipelined?");

    let captured = upstream.captured();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(request.path, "/v1beta/models/gemini-1.5-flash:generateContent");
    assert_eq!(request.header("x-goog-api-key"), Some("test-key"));
    assert_eq!(
        request.body,
        json!({
            "contents": [
                {"role": "user", "parts": [{"text": "Hi"}]},
                {"role": "model", "parts": [{"text": "Hello! What are you working on?"}]},
                {"role": "user", "parts": [{"text": "A tiny CPU in Verilog."}]}
            ],
            "systemInstruction": {"parts": [{"text": "persona text"}]}
        })
    );

    upstream.stop().await;
}

#[actix_web::test]
async fn groq_sends_flat_message_list() {
    let upstream = MockUpstream::start(
        200,
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "Cool project."}}]}),
    )
    .await;
    let provider = build_provider(&config(ProviderKind::Groq, &upstream.url));

    let reply = provider.generate("persona text", &conversation()).await.unwrap();
    assert_eq!(reply, "Cool project.");

    let captured = upstream.captured();
    assert_eq!(captured.len(), 1);
    let request = &captured[0];
    assert_eq!(request.path, "/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    assert_eq!(request.body["model"], "llama-3.1-8b-instant");
    assert_eq!(
        request.body["messages"],
        json!([
            {"role": "system", "content": "persona text"},
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hello! What are you working on?"},
            {"role": "user", "content": "A tiny CPU in Verilog."}
        ])
    );

    upstream.stop().await;
}

#[actix_web::test]
async fn non_success_status_is_reported() {
    let upstream = MockUpstream::start(429, json!({"error": {"message": "rate limited"}})).await;
    let provider = build_provider(&config(ProviderKind::Groq, &upstream.url));

    let err = provider.generate("p", &conversation()).await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("rate limited"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
    assert_eq!(upstream.captured().len(), 1);

    upstream.stop().await;
}

#[actix_web::test]
async fn unexpected_shape_is_malformed() {
    let upstream = MockUpstream::start(200, json!({"promptFeedback": {"blockReason": "SAFETY"}})).await;
    let provider = build_provider(&config(ProviderKind::Gemini, &upstream.url));

    let err = provider.generate("p", &conversation()).await.unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse(_)));

    upstream.stop().await;
}

#[actix_web::test]
async fn missing_key_makes_no_request() {
    let upstream = MockUpstream::start(200, json!({})).await;
    let provider = build_provider(
        &ProviderConfig::new(ProviderKind::Gemini, None).with_base_url(upstream.url.clone()),
    );

    let err = provider.generate("p", &conversation()).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::MissingCredential { var: "GEMINI_API_KEY" }
    ));
    assert!(upstream.captured().is_empty());

    upstream.stop().await;
}

#[actix_web::test]
async fn unreachable_provider_is_request_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let provider = build_provider(&config(ProviderKind::Groq, &format!("http://127.0.0.1:{}", port)));

    let err = provider.generate("p", &conversation()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Request(_)));
}

#[test]
fn arc_provider_is_shareable() {
    fn assert_send_sync<T: Send + Sync + ?Sized>(_: &Arc<T>) {}
    let provider = build_provider(&ProviderConfig::new(ProviderKind::Gemini, None));
    assert_send_sync(&provider);
}
