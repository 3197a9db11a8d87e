use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CovtreeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Profile parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to resolve package '{package}': {message}")]
    PackageResolution { package: String, message: String },

    #[error("Did not find package for {0} in package listing")]
    PackageNotFound(String),

    #[error("Can't read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Can't write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unbalanced coverage boundary at byte {offset}: {message}")]
    Boundary { offset: usize, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Command failed: {0}")]
    Command(String),
}

pub type Result<T> = std::result::Result<T, CovtreeError>;
