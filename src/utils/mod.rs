pub mod error_handling;

pub use error_handling::{extract_error_message, sanitize_error_message};
