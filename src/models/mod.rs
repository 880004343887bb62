pub mod chat;
pub mod schemas;

pub use chat::{GenerationResult, GenerationSettings, Message, Sender};
pub use schemas::{
    GeminiCandidate, GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiUsageMetadata,
    GenerateContentRequest, GenerateContentResponse,
};
