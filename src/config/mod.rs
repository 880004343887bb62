pub mod persistence;
pub mod settings;

pub use persistence::load_settings;
pub use settings::{ConnectionSettings, RetrySettings, Settings};
