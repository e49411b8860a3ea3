use thiserror::Error;

use appraise_core::AppraiseError;
use appraise_oracle::OracleError;

use crate::fetch::FetchError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// User-facing intake validation failure, keyed by field.
    #[error("{field}: {reason}")]
    Validation { field: String, reason: String },

    /// The oracle reply violated the normalization contract. Contract
    /// drift, not bad input: fails loudly instead of retrying.
    #[error("oracle protocol violation: {0}")]
    OracleProtocol(String),

    #[error(transparent)]
    Core(#[from] AppraiseError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
