use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunletError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunletError {
    /// Whether this error refers to an absent session, script or function.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RunletError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RunletError>;
