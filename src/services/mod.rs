pub mod backend;
pub mod chat;
pub mod error;
pub mod retry;

pub use backend::GenerativeBackend;
pub use chat::{ChatAdapter, ChatAdapterBuilder, DEFAULT_MODEL};
pub use error::{BackendError, ChatError};
pub use retry::{with_retry, RetryPolicy};
