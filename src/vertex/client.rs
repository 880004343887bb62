use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

use super::auth::AccessTokenProvider;
use super::config::VertexConfig;
use crate::models::{GenerateContentRequest, GenerateContentResponse};
use crate::services::{BackendError, ChatError, GenerativeBackend};
use crate::utils::{extract_error_message, sanitize_error_message};

/// `generateContent` over the Vertex AI REST API.
#[derive(Clone)]
pub struct VertexAiBackend {
    config: VertexConfig,
    client: Client,
    auth: Arc<dyn AccessTokenProvider>,
}

impl std::fmt::Debug for VertexAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexAiBackend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl VertexAiBackend {
    pub fn new(config: VertexConfig, auth: Arc<dyn AccessTokenProvider>) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client, auth })
    }

    pub fn config(&self) -> &VertexConfig {
        &self.config
    }
}

#[async_trait]
impl GenerativeBackend for VertexAiBackend {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError> {
        let url = self.config.generate_content_url(model);
        let authorization = self.auth.authorization().await?;

        debug!("Sending request to Vertex AI: {}", url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, authorization)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.text().await {
                Ok(error_text) => sanitize_error_message(&extract_error_message(&error_text)),
                Err(e) => format!("failed to read error body: {}", e),
            };
            return Err(BackendError::status(status.as_u16(), message));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<GenerateContentResponse>(&body)
            .map_err(|e| BackendError::malformed(format!("failed to parse Vertex AI response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeminiContent, GeminiGenerationConfig};
    use crate::vertex::auth::StaticAccessToken;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct RecordedRequest {
        path: (String, String, String),
        authorization: Option<String>,
        body: Value,
    }

    #[derive(Clone)]
    struct FakeVertex {
        reply_status: StatusCode,
        reply_body: Value,
        requests: Arc<Mutex<Vec<RecordedRequest>>>,
    }

    async fn handle_generate(
        State(state): State<FakeVertex>,
        Path(path): Path<(String, String, String)>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        state.requests.lock().unwrap().push(RecordedRequest {
            path,
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        (state.reply_status, Json(state.reply_body.clone()))
    }

    async fn spawn_fake_vertex(reply_status: StatusCode, reply_body: Value) -> (String, FakeVertex) {
        let state = FakeVertex {
            reply_status,
            reply_body,
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route(
                "/v1/projects/:project/locations/:location/publishers/google/models/:action",
                post(handle_generate),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    fn backend_for(base_url: String) -> VertexAiBackend {
        let config = VertexConfig {
            project_id: "demo-project".to_string(),
            location: "us-central1".to_string(),
            base_url,
            request_timeout: Duration::from_secs(5),
        };
        VertexAiBackend::new(config, Arc::new(StaticAccessToken::new("test-token"))).unwrap()
    }

    fn hello_request(generation_config: Option<GeminiGenerationConfig>) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![GeminiContent::text("user", "Hello")],
            generation_config,
        }
    }

    #[tokio::test]
    async fn test_generate_content_round_trip() {
        let (base_url, fake) = spawn_fake_vertex(
            StatusCode::OK,
            json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "hi"}]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 4, "totalTokenCount": 14}
            }),
        )
        .await;

        let backend = backend_for(base_url);
        let config = GeminiGenerationConfig {
            temperature: Some(0.5),
            ..GeminiGenerationConfig::default()
        };
        let response = backend
            .generate_content("gemini-pro", &hello_request(Some(config)))
            .await
            .unwrap();

        assert_eq!(response.candidates[0].finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.usage_metadata.unwrap().candidates_token_count, Some(4));

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let recorded = &requests[0];
        assert_eq!(
            recorded.path,
            (
                "demo-project".to_string(),
                "us-central1".to_string(),
                "gemini-pro:generateContent".to_string()
            )
        );
        assert_eq!(recorded.authorization.as_deref(), Some("Bearer test-token"));
        assert_eq!(
            recorded.body,
            json!({
                "contents": [{"role": "user", "parts": [{"text": "Hello"}]}],
                "generationConfig": {"temperature": 0.5}
            })
        );
    }

    #[tokio::test]
    async fn test_unset_generation_config_is_omitted_on_the_wire() {
        let (base_url, fake) = spawn_fake_vertex(
            StatusCode::OK,
            json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "ok"}]}}]}),
        )
        .await;

        backend_for(base_url)
            .generate_content("gemini-pro", &hello_request(None))
            .await
            .unwrap();

        let requests = fake.requests.lock().unwrap();
        assert!(requests[0].body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (base_url, _fake) = spawn_fake_vertex(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}),
        )
        .await;

        let error = backend_for(base_url)
            .generate_content("gemini-pro", &hello_request(None))
            .await
            .unwrap_err();

        match error {
            BackendError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "RESOURCE_EXHAUSTED: Quota exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unexpected_body_is_malformed_response() {
        let (base_url, _fake) = spawn_fake_vertex(StatusCode::OK, json!("unexpected")).await;

        let error = backend_for(base_url)
            .generate_content("gemini-pro", &hello_request(None))
            .await
            .unwrap_err();

        assert!(matches!(error, BackendError::MalformedResponse(_)));
    }

    /// Reads one HTTP request, then answers `500` with a body cut short.
    async fn spawn_truncated_error_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&received).to_string();
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if received.len() >= end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\n{\"error\"")
                .await
                .unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreadable_error_body_keeps_status() {
        let base_url = spawn_truncated_error_server().await;

        let error = backend_for(base_url)
            .generate_content("gemini-pro", &hello_request(None))
            .await
            .unwrap_err();

        match error {
            BackendError::Status { status, message } => {
                assert_eq!(status, 500);
                assert!(message.starts_with("failed to read error body"), "got {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let error = backend_for(format!("http://{}", addr))
            .generate_content("gemini-pro", &hello_request(None))
            .await
            .unwrap_err();

        assert!(matches!(error, BackendError::Transport(_)));
        assert!(error.is_transient());
    }
}
