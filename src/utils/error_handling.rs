use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_ERROR_MESSAGE_LEN: usize = 200;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"Bearer\s+[\w\-\.~+/]+=*",
        r"ya29\.[\w\-\.]+",
        r"AIza[\w\-]{35}",
        r"\b[\w\-]{40,}\b", // Long opaque strings that might be tokens
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Pull a human readable message out of a Google API error body.
///
/// Vertex answers failures with `{"error": {"code", "message", "status"}}`;
/// anything else is returned as-is.
pub fn extract_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();

    let message = parsed.as_ref().and_then(|value| {
        let error = value.get("error")?;
        let message = error.get("message").and_then(|m| m.as_str())?;
        match error.get("status").and_then(|s| s.as_str()) {
            Some(status) => Some(format!("{}: {}", status, message)),
            None => Some(message.to_string()),
        }
    });

    message.unwrap_or_else(|| body.trim().to_string())
}

/// Redact credentials and cap the length so an error body is safe to carry
/// around in error values and logs.
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = message.to_string();

    for regex in SENSITIVE_PATTERNS.iter() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").to_string();
    }

    if sanitized.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = sanitized.chars().take(MAX_ERROR_MESSAGE_LEN - 3).collect();
        sanitized = format!("{}...", truncated);
    }

    sanitized
}
