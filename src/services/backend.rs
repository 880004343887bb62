use async_trait::async_trait;

use super::error::BackendError;
use crate::models::{GenerateContentRequest, GenerateContentResponse};

/// The generative-text service the chat adapter talks to.
///
/// Implementations must be safe to share between concurrent calls.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, BackendError>;
}
