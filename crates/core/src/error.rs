use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request never produced an HTTP status (connect failure, timeout).
    #[error("Request error: {0}")]
    Request(String),

    /// Non-success HTTP status from a remote call. Carries the upstream
    /// status and response body so callers can log what the service said.
    #[error("Transport error ({status}): {body}")]
    Transport { status: u16, body: String },

    /// The remote call succeeded at the transport level but the response
    /// carried an application-level error field.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Unsupported task: {0}")]
    UnsupportedTask(String),

    #[error("Unknown message role: {0}")]
    UnknownRole(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
