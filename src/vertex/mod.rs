pub mod auth;
pub mod client;
pub mod config;
pub mod vertex_ai_init;

pub use auth::{token_provider_from_settings, AccessTokenProvider, GoogleAccessToken, StaticAccessToken};
pub use client::VertexAiBackend;
pub use config::VertexConfig;
pub use vertex_ai_init::{init_chat_adapter, init_vertex_backend};
