use thiserror::Error;

pub type EtherealResult<T> = Result<T, EtherealError>;

#[derive(Debug, Error)]
pub enum EtherealError {
    /// Malformed fragment identifier, malformed key, missing or oversized payload (400)
    #[error("validation error: {0}")]
    Validation(String),

    /// Second-factor mismatch (401) or AEAD tag verification failure
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Unknown or expired remote key (404)
    #[error("not found: {0}")]
    NotFound(String),

    /// The store answered with a value that cannot happen for a live record (500)
    #[error("server inconsistency: {0}")]
    ServerInconsistency(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    /// Network failure or an unusable response body
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status without a more specific mapping
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EtherealError {
    /// HTTP status code this error is reported with by the service.
    pub fn status_code(&self) -> u16 {
        match self {
            EtherealError::Validation(_) => 400,
            EtherealError::Authentication(_) => 401,
            EtherealError::NotFound(_) => 404,
            EtherealError::Server { status, .. } => *status,
            _ => 500,
        }
    }
}
