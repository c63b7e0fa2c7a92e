use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("bind failed: {0}")]
    Bind(String),
}

pub type Result<T> = eyre::Result<T>;
