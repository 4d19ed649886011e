use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        AppError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        AppError::Storage(err.to_string())
    }

    pub fn transport<E: std::fmt::Display>(err: E) -> Self {
        AppError::Transport(err.to_string())
    }

    /// Status code reported by the upstream provider, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Rate-limited (429) or service-unavailable (503) provider failures.
    pub fn is_transient(&self) -> bool {
        matches!(self.status(), Some(429 | 503))
    }
}
