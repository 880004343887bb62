use std::time::Duration;
use url::Url;

use crate::config::ConnectionSettings;
use crate::services::ChatError;

/// Resolved Vertex AI endpoint coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl VertexConfig {
    pub fn from_settings(settings: &ConnectionSettings) -> Result<Self, ChatError> {
        let project_id = settings
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::configuration("Vertex AI project id is required"))?
            .to_string();

        let location = settings.location.trim().to_string();
        if location.is_empty() {
            return Err(ChatError::configuration("Vertex AI location is required"));
        }

        let base_url = match settings.api_endpoint.as_deref() {
            Some(endpoint) => {
                let parsed = Url::parse(endpoint).map_err(|e| {
                    ChatError::configuration(format!("invalid API endpoint '{}': {}", endpoint, e))
                })?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => default_base_url(&location),
        };

        tracing::debug!(
            project_id = %project_id,
            location = %location,
            base_url = %base_url,
            "Resolved Vertex AI endpoint"
        );

        Ok(Self {
            project_id,
            location,
            base_url,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        })
    }

    /// `generateContent` URL for `model`.
    pub fn generate_content_url(&self, model: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.base_url, self.project_id, self.location, model
        )
    }
}

fn default_base_url(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com".to_string()
    } else {
        format!("https://{}-aiplatform.googleapis.com", location)
    }
}
