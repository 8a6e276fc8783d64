//! Error types for the usersim domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all usersim operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion service errors ---
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    // --- Data accessor errors ---
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    // --- Planner errors ---
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    // --- Output parsing errors ---
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // --- Task record errors ---
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    // --- Configuration errors (fatal — abort the whole run) ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Client not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("Planner output contained no sub-tasks")]
    NoSubTasks,

    #[error("Malformed sub-task record: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("Missing required field line: {0}")]
    MissingField(&'static str),

    #[error("Invalid star rating: {0} (must be one of 1.0, 2.0, 3.0, 4.0, 5.0)")]
    InvalidStars(String),

    #[error("Invalid {field} count: {value}")]
    InvalidCount { field: &'static str, value: String },
}

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Task is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Task field has unexpected shape: {0}")]
    BadField(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_displays_correctly() {
        let err = Error::Llm(LlmError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn parse_error_displays_correctly() {
        let err = Error::Parse(ParseError::MissingField("stars"));
        assert!(err.to_string().contains("stars"));

        let err = Error::Parse(ParseError::InvalidStars("4.5".into()));
        assert!(err.to_string().contains("4.5"));
    }

    #[test]
    fn data_error_carries_id() {
        let err = Error::Data(DataError::UserNotFound("u42".into()));
        assert!(err.to_string().contains("u42"));
    }
}
