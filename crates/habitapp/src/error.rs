use thiserror::Error;

use crate::store::StoreKey;

#[derive(Error, Debug)]
pub enum HabitError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error ({key}): {message}")]
    Store { key: StoreKey, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Persistence worker is not running")]
    WorkerUnavailable,
}

impl HabitError {
    pub fn store(key: StoreKey, message: impl Into<String>) -> Self {
        HabitError::Store {
            key,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HabitError>;
