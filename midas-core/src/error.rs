//! Error types for midas

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Index corruption: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown codec id: {0}")]
    UnknownCodec(u8),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Index is not loaded")]
    NotLoaded,

    #[error("Index is already loaded")]
    AlreadyLoaded,
}

pub type Result<T> = std::result::Result<T, Error>;
