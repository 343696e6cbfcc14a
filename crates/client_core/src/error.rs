use thiserror::Error;

/// Failures talking to the order backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    /// A row, cell or form element the markup should provide is absent.
    #[error("element not found: {0}")]
    NotFound(String),
    #[error("order backend unreachable: {0}")]
    Transport(String),
    #[error("order backend rejected the request: {0}")]
    Rejected(String),
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
    #[error("no order is open in the editor")]
    NoActiveEdit,
    #[error("action cancelled by user")]
    Cancelled,
}

impl From<BackendError> for ControllerError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::InvalidResponse(message) => ControllerError::InvalidResponse(message),
            other => ControllerError::Transport(other.to_string()),
        }
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
