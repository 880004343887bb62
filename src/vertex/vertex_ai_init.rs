use std::sync::Arc;

use super::auth::token_provider_from_settings;
use super::client::VertexAiBackend;
use super::config::VertexConfig;
use crate::config::Settings;
use crate::services::{ChatAdapter, ChatError};

/// Build the Vertex AI backend described by `settings`.
pub async fn init_vertex_backend(settings: &Settings) -> Result<VertexAiBackend, ChatError> {
    let config = VertexConfig::from_settings(&settings.connection)?;
    let auth = token_provider_from_settings(&settings.connection).await?;
    VertexAiBackend::new(config, auth)
}

/// Assemble a ready-to-use [`ChatAdapter`] from resolved settings.
pub async fn init_chat_adapter(settings: &Settings) -> Result<ChatAdapter, ChatError> {
    settings.validate()?;

    let backend = init_vertex_backend(settings).await?;

    tracing::info!(
        project_id = %backend.config().project_id,
        location = %backend.config().location,
        model = %settings.connection.model,
        "Vertex AI Gemini chat adapter initialized"
    );

    ChatAdapter::builder()
        .backend(Arc::new(backend))
        .model(settings.connection.model.clone())
        .settings(settings.chat)
        .retry_policy(settings.retry.to_policy())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GenerationSettings, Message};

    fn settings_with_token() -> Settings {
        let mut settings = Settings::default();
        settings.connection.project_id = Some("demo-project".to_string());
        settings.connection.access_token = Some("test-token".to_string());
        settings
    }

    #[tokio::test]
    async fn test_init_chat_adapter_applies_settings() {
        let mut settings = settings_with_token();
        settings.connection.model = "gemini-1.5-flash".to_string();
        settings.chat = GenerationSettings::default().with_temperature(0.25);
        settings.retry.max_attempts = 5;

        let adapter = init_chat_adapter(&settings).await.unwrap();
        assert_eq!(adapter.model(), "gemini-1.5-flash");
        assert_eq!(adapter.settings().temperature, Some(0.25));
        assert_eq!(adapter.settings().top_p, None);
        assert_eq!(adapter.retry_policy().max_attempts, 5);
    }

    #[tokio::test]
    async fn test_missing_project_fails_fast() {
        let mut settings = settings_with_token();
        settings.connection.project_id = None;

        let result = init_chat_adapter(&settings).await;
        assert!(matches!(result, Err(ChatError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_backend_uses_regional_endpoint() {
        let backend = init_vertex_backend(&settings_with_token()).await.unwrap();
        assert_eq!(
            backend.config().base_url,
            "https://us-central1-aiplatform.googleapis.com"
        );
    }

    /// Talks to the real service; run with
    /// `VERTEX_AI_PROJECT_ID=<project> cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires Vertex AI credentials"]
    async fn test_live_generate() {
        if std::env::var("VERTEX_AI_PROJECT_ID").is_err() {
            return;
        }

        let settings = Settings::load().unwrap();
        let adapter = init_chat_adapter(&settings).await.unwrap();

        let result = adapter.generate(&[Message::user("Hello")]).await.unwrap();
        assert!(!result.text.is_empty());
        assert!(!result.finish_reason.is_empty());
    }
}
