use thiserror::Error;

#[derive(Error, Debug)]
pub enum KarvaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Malformed chromosome: {0}")]
    Representation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KarvaError>;
