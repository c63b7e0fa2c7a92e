use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ControlError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

/// Per-line command failures. The `Display` text is the reply body; the
/// interpreter prefixes it with `ERROR: ` on the wire.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("invalid {field}: {token}")]
    InvalidField { field: &'static str, token: String },
}

impl CommandError {
    pub fn invalid(field: &'static str, token: &str) -> Self {
        Self::InvalidField {
            field,
            token: token.to_owned(),
        }
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
