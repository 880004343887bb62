use serde::{Deserialize, Serialize};
use std::fmt;

use super::schemas::GeminiGenerationConfig;

/// Who authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    System,
    Assistant,
    /// Output of a tool or function call. Gemini's `generateContent` has no
    /// slot for it, so the chat adapter rejects it.
    Function,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sender::User => "user",
            Sender::System => "system",
            Sender::Assistant => "assistant",
            Sender::Function => "function",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Sender,
    pub content: String,
}

impl Message {
    pub fn new(role: Sender, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Sender::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }
}

/// Sampling and length knobs forwarded to the backend.
///
/// Every field is optional; `None` leaves the choice to the backend and is
/// never sent over the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Randomness of the output, in `[0.0, 1.0]`.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Cumulative probability cut-off for nucleus sampling.
    #[serde(default)]
    pub top_p: Option<f32>,
    /// Number of most probable tokens considered when sampling.
    #[serde(default)]
    pub top_k: Option<u32>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl GenerationSettings {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    /// Layer `overrides` on top of `self`, field by field.
    pub fn merged_with(&self, overrides: &GenerationSettings) -> GenerationSettings {
        GenerationSettings {
            temperature: overrides.temperature.or(self.temperature),
            top_p: overrides.top_p.or(self.top_p),
            top_k: overrides.top_k.or(self.top_k),
            max_output_tokens: overrides.max_output_tokens.or(self.max_output_tokens),
        }
    }

    /// Range check: temperature and top_p in `[0.0, 1.0]`, top_k and
    /// max_output_tokens positive.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(format!("temperature must be between 0.0 and 1.0, got {}", temperature));
            }
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(format!("top_p must be between 0.0 and 1.0, got {}", top_p));
            }
        }

        if self.top_k == Some(0) {
            return Err("top_k must be positive".to_string());
        }

        if self.max_output_tokens == Some(0) {
            return Err("max_output_tokens must be positive".to_string());
        }

        Ok(())
    }

    /// Wire form, or `None` when nothing is overridden.
    pub fn to_generation_config(&self) -> Option<GeminiGenerationConfig> {
        let config = GeminiGenerationConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
        };

        if config.is_empty() {
            None
        } else {
            Some(config)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub finish_reason: String,
    pub prompt_tokens: i64,
    pub generation_tokens: i64,
}
