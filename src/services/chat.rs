use std::sync::Arc;
use tracing::debug;

use super::backend::GenerativeBackend;
use super::error::{BackendError, ChatError};
use super::retry::{with_retry, RetryPolicy};
use crate::models::{
    GeminiContent, GenerateContentRequest, GenerateContentResponse, GenerationResult,
    GenerationSettings, Message, Sender,
};

pub const DEFAULT_MODEL: &str = "gemini-pro";

const UNSPECIFIED_FINISH_REASON: &str = "FINISH_REASON_UNSPECIFIED";

/// Chat client for Gemini models.
///
/// Holds no per-call state: clones share the backend handle and the immutable
/// settings, and every `generate` builds its own request.
#[derive(Clone)]
pub struct ChatAdapter {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
    settings: GenerationSettings,
    retry_policy: RetryPolicy,
}

impl std::fmt::Debug for ChatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAdapter")
            .field("model", &self.model)
            .field("settings", &self.settings)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ChatAdapterBuilder {
    backend: Option<Arc<dyn GenerativeBackend>>,
    model: Option<String>,
    settings: Option<GenerationSettings>,
    retry_policy: Option<RetryPolicy>,
}

impl ChatAdapterBuilder {
    pub fn backend(mut self, backend: Arc<dyn GenerativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = Some(retry_policy);
        self
    }

    pub fn build(self) -> Result<ChatAdapter, ChatError> {
        let backend = self
            .backend
            .ok_or_else(|| ChatError::configuration("a generative backend is required"))?;

        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(ChatError::configuration("model name cannot be empty"));
        }

        let settings = self.settings.unwrap_or_default();
        settings.validate().map_err(ChatError::configuration)?;

        Ok(ChatAdapter {
            backend,
            model,
            settings,
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

impl ChatAdapter {
    /// Adapter with the default model and retry policy. `None` settings leave
    /// every generation parameter to the backend.
    pub fn new(backend: Arc<dyn GenerativeBackend>, settings: Option<GenerationSettings>) -> Self {
        Self {
            backend,
            model: DEFAULT_MODEL.to_string(),
            settings: settings.unwrap_or_default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn builder() -> ChatAdapterBuilder {
        ChatAdapterBuilder::default()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub async fn generate(&self, conversation: &[Message]) -> Result<GenerationResult, ChatError> {
        self.generate_with_settings(conversation, self.settings).await
    }

    /// Like [`generate`](Self::generate), with `overrides` layered over the
    /// adapter's settings for this call only.
    pub async fn generate_with(
        &self,
        conversation: &[Message],
        overrides: &GenerationSettings,
    ) -> Result<GenerationResult, ChatError> {
        self.generate_with_settings(conversation, self.settings.merged_with(overrides))
            .await
    }

    /// Single user prompt in, generated text out.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, ChatError> {
        let result = self.generate(&[Message::user(prompt)]).await?;
        Ok(result.text)
    }

    async fn generate_with_settings(
        &self,
        conversation: &[Message],
        settings: GenerationSettings,
    ) -> Result<GenerationResult, ChatError> {
        // Malformed input must fail before the retry loop starts.
        settings.validate().map_err(ChatError::invalid_input)?;
        let request = build_request(conversation, &settings)?;

        debug!(
            model = %self.model,
            messages = request.contents.len(),
            "Sending generateContent request"
        );

        let backend = &self.backend;
        let model = self.model.as_str();
        let request = &request;

        with_retry(&self.retry_policy, move |_attempt| async move {
            let response = backend.generate_content(model, request).await?;
            extract_result(response)
        })
        .await
    }
}

/// Backend role for a sender. Gemini only knows `user` and `model`.
pub fn to_role(sender: Sender) -> Result<&'static str, ChatError> {
    match sender {
        Sender::User => Ok("user"),
        Sender::System | Sender::Assistant => Ok("model"),
        other => Err(ChatError::invalid_input(format!(
            "Unsupported message type: {}",
            other
        ))),
    }
}

pub fn build_request(
    conversation: &[Message],
    settings: &GenerationSettings,
) -> Result<GenerateContentRequest, ChatError> {
    if conversation.is_empty() {
        return Err(ChatError::invalid_input("conversation must contain at least one message"));
    }

    let contents = conversation
        .iter()
        .map(|message| Ok(GeminiContent::text(to_role(message.role)?, message.content.as_str())))
        .collect::<Result<Vec<_>, ChatError>>()?;

    Ok(GenerateContentRequest {
        contents,
        generation_config: settings.to_generation_config(),
    })
}

fn extract_result(response: GenerateContentResponse) -> Result<GenerationResult, BackendError> {
    let usage = response.usage_metadata.unwrap_or_default();

    let candidate = match response.candidates.into_iter().next() {
        Some(candidate) => candidate,
        None => {
            let reason = response
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map(|reason| format!("no candidates returned (prompt blocked: {})", reason))
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(BackendError::malformed(reason));
        }
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(GenerationResult {
        text,
        finish_reason: candidate
            .finish_reason
            .unwrap_or_else(|| UNSPECIFIED_FINISH_REASON.to_string()),
        prompt_tokens: usage.prompt_token_count.unwrap_or(0),
        generation_tokens: usage.candidates_token_count.unwrap_or(0),
    })
}
