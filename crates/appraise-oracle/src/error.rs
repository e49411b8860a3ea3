use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle API key not set: export ORACLE_API_KEY")]
    MissingApiKey,

    #[error("oracle API error: {0}")]
    Api(String),

    #[error("malformed oracle reply: {0}")]
    MalformedReply(String),

    #[error("empty oracle reply")]
    EmptyReply,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl OracleError {
    /// Whether a fresh call could plausibly succeed where this one failed.
    /// Transport and API faults are not retried here; the retry budget
    /// exists to absorb one-off malformed model output.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::MalformedReply(_) | OracleError::EmptyReply)
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;
