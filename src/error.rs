//! Error types for the mention bot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown job type: {0}")]
    UnknownJobType(String),

    #[error("Log decode error: {0}")]
    Decode(String),

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
