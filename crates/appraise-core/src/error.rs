use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppraiseError {
    #[error("project name already taken: {0}")]
    DuplicateProjectName(String),

    #[error("assessment not found: {0}")]
    AssessmentNotFound(i64),

    #[error("question not found: {0}")]
    QuestionNotFound(i64),

    #[error("resource not found: {0}")]
    ResourceNotFound(i64),

    #[error("unknown outcome tag: {0}")]
    UnknownOutcome(String),

    #[error("malformed outcome record: {0}")]
    MalformedOutcome(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppraiseError>;
