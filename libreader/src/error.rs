//! Error types for the reader bridge

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ReaderError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReaderError::InvalidInput(_) => 3,
            ReaderError::Compose(ComposeError::EmptyContent) => 3,
            ReaderError::Compose(_) => 1,
            ReaderError::Config(_) => 1,
            ReaderError::Surface(_) => 1,
            ReaderError::Bridge(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Document content is empty")]
    EmptyContent,

    #[error("Failed to serialize article payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone)]
pub enum SurfaceError {
    #[error("Surface {0} is no longer mounted")]
    Detached(String),

    #[error("Load failed: {0}")]
    Load(String),

    #[error("Command rejected: {0}")]
    Command(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),
}

#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Reply already sent or abandoned")]
    ReplyClosed,
}
