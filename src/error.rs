//! Error types for the conversion pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Please enter a valid URL")]
    InvalidInput,

    #[error("{0}")]
    ExternalToolFailure(String),

    #[error("Filesystem error: {0}")]
    FilesystemFailure(#[from] std::io::Error),
}

impl ConvertError {
    /// Message shown to the user. Always carries the original error text.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::InvalidInput => self.to_string(),
            other => format!("An error occurred:\n{}", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
