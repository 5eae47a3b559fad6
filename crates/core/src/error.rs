use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("malformed position {text:?}: {reason}")]
    MalformedPosition { text: String, reason: String },
}
