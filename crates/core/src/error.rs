use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("vault root is not configured")]
    RootUnset,
    #[error("path traversal is not allowed: {0:?}")]
    PathTraversal(PathBuf),
    #[error("note not found: {0:?}")]
    NoteNotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
