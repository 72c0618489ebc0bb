use thiserror::Error;

/// Errors surfaced to callers of the chat service.
///
/// Every variant carries a stable machine-readable [`code`](ChatError::code);
/// the HTTP layer maps them onto status codes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("invalid user identifier: {0}")]
    InvalidIdentifier(String),

    #[error("{0}")]
    Validation(String),

    #[error("store is full: {0}")]
    StoreFull(String),

    #[error("too many requests")]
    RateLimited,

    #[error("message store error: {0}")]
    Backend(String),
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::InvalidIdentifier(_) => "InvalidIdentifier",
            ChatError::Validation(_) => "ValidationError",
            ChatError::StoreFull(_) => "StoreFull",
            ChatError::RateLimited => "RateLimited",
            ChatError::Backend(_) => "BackendError",
        }
    }

    /// True for errors the client can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ChatError::InvalidIdentifier(_) | ChatError::Validation(_) | ChatError::RateLimited
        )
    }
}

impl From<redis::RedisError> for ChatError {
    fn from(err: redis::RedisError) -> Self {
        ChatError::Backend(err.to_string())
    }
}
