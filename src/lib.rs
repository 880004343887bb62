//! Retrying chat client for Gemini models on Google Vertex AI.
//!
//! A [`ChatAdapter`] turns a role-tagged conversation into a Vertex AI
//! `generateContent` call, retries failed calls with exponential backoff and
//! maps the answer to a [`GenerationResult`]. The backend sits behind the
//! [`GenerativeBackend`] trait; [`VertexAiBackend`] is the REST
//! implementation and [`init_chat_adapter`] wires it from [`Settings`].

pub mod config;
pub mod models;
pub mod services;
pub mod utils;
pub mod vertex;

pub use config::Settings;
pub use models::{GenerationResult, GenerationSettings, Message, Sender};
pub use services::{
    with_retry, BackendError, ChatAdapter, ChatAdapterBuilder, ChatError, GenerativeBackend,
    RetryPolicy,
};
pub use vertex::{init_chat_adapter, VertexAiBackend};
