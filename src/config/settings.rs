use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::models::GenerationSettings;
use crate::services::{ChatError, RetryPolicy, DEFAULT_MODEL};

pub const ENV_PREFIX: &str = "VERTEX_AI_GEMINI_";
pub const SETTINGS_FILE_VAR: &str = "VERTEX_AI_GEMINI_SETTINGS_FILE";
pub const LEGACY_PROJECT_ID_VAR: &str = "VERTEX_AI_PROJECT_ID";
pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Where and how to reach Vertex AI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub project_id: Option<String>,
    pub location: String,
    pub model: String,
    /// Base URL override, e.g. a private endpoint or a local fake.
    pub api_endpoint: Option<String>,
    /// Pre-minted OAuth access token; skips credential discovery.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Service account key JSON.
    #[serde(skip_serializing)]
    pub google_credentials_json: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: None,
            access_token: None,
            google_credentials_json: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
    /// Retry only transport faults, throttling and 5xx instead of every
    /// backend failure.
    pub transient_only: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            backoff_multiplier: policy.backoff_multiplier,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            transient_only: false,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            self.backoff_multiplier,
            Duration::from_millis(self.max_backoff_ms),
        );

        if self.transient_only {
            policy.with_retry_on(crate::services::BackendError::is_transient)
        } else {
            policy
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub chat: GenerationSettings,
    pub retry: RetrySettings,
}

impl Settings {
    /// Resolve settings from `.env`, an optional JSON settings file and the
    /// process environment, in increasing order of precedence.
    pub fn load() -> Result<Self, ChatError> {
        dotenvy::dotenv().ok();

        let base = match env::var(SETTINGS_FILE_VAR) {
            Ok(path) if !path.trim().is_empty() => super::load_settings(Path::new(path.trim()))
                .map_err(|e| ChatError::configuration(format!("{:#}", e)))?,
            _ => Self::default(),
        };

        let settings = base.with_overrides(|name| env::var(name).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `VERTEX_AI_GEMINI_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| clean_value(lookup(&format!("{}{}", ENV_PREFIX, suffix)));

        // Connection
        if let Some(project_id) =
            var("PROJECT_ID").or_else(|| clean_value(lookup(LEGACY_PROJECT_ID_VAR)))
        {
            self.connection.project_id = Some(project_id);
        }
        if let Some(location) = var("LOCATION") {
            self.connection.location = location;
        }
        if let Some(model) = var("MODEL") {
            self.connection.model = model;
        }
        if let Some(endpoint) = var("API_ENDPOINT") {
            self.connection.api_endpoint = Some(endpoint);
        }
        if let Some(token) = var("ACCESS_TOKEN") {
            self.connection.access_token = Some(token);
        }
        if let Some(json) = lookup("GOOGLE_CREDENTIALS_JSON").filter(|v| !v.trim().is_empty()) {
            self.connection.google_credentials_json = Some(json);
        }
        if let Some(timeout) = parse_var(&var, "REQUEST_TIMEOUT_SECS")? {
            self.connection.request_timeout_secs = timeout;
        }

        // Chat
        if let Some(temperature) = parse_var(&var, "CHAT_TEMPERATURE")? {
            self.chat.temperature = Some(temperature);
        }
        if let Some(top_p) = parse_var(&var, "CHAT_TOP_P")? {
            self.chat.top_p = Some(top_p);
        }
        if let Some(top_k) = parse_var(&var, "CHAT_TOP_K")? {
            self.chat.top_k = Some(top_k);
        }
        if let Some(max_output_tokens) = parse_var(&var, "CHAT_MAX_OUTPUT_TOKENS")? {
            self.chat.max_output_tokens = Some(max_output_tokens);
        }

        // Retry
        if let Some(max_attempts) = parse_var(&var, "RETRY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = max_attempts;
        }
        if let Some(initial_backoff_ms) = parse_var(&var, "RETRY_INITIAL_BACKOFF_MS")? {
            self.retry.initial_backoff_ms = initial_backoff_ms;
        }
        if let Some(multiplier) = parse_var(&var, "RETRY_MULTIPLIER")? {
            self.retry.backoff_multiplier = multiplier;
        }
        if let Some(max_backoff_ms) = parse_var(&var, "RETRY_MAX_BACKOFF_MS")? {
            self.retry.max_backoff_ms = max_backoff_ms;
        }
        if let Some(transient_only) = var("RETRY_TRANSIENT_ONLY") {
            self.retry.transient_only = parse_bool(&transient_only);
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        let project_id = self.connection.project_id.as_deref().unwrap_or("").trim();
        if project_id.is_empty() {
            return Err(ChatError::configuration(format!(
                "Vertex AI project id is not set ({}PROJECT_ID)",
                ENV_PREFIX
            )));
        }

        if self.connection.location.trim().is_empty() {
            return Err(ChatError::configuration("Vertex AI location cannot be empty"));
        }

        if self.connection.model.trim().is_empty() {
            return Err(ChatError::configuration("model name cannot be empty"));
        }

        self.chat.validate().map_err(ChatError::configuration)?;

        if self.connection.request_timeout_secs == 0 {
            return Err(ChatError::configuration("request timeout must be positive"));
        }

        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(ChatError::configuration("retry multiplier must be at least 1.0"));
        }

        Ok(())
    }
}

fn parse_var<T, F>(var: &F, suffix: &str) -> Result<Option<T>, ChatError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(suffix) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            ChatError::configuration(format!("invalid value '{}' for {}{}: {}", raw, ENV_PREFIX, suffix, e))
        }),
        None => Ok(None),
    }
}

/// Trimmed, unquoted value, or `None` when blank.
fn clean_value(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().trim_matches('"').trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}
