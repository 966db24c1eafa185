use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpgraderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pip execution failed: {0}")]
    PipExecution(String),

    #[error("Backup failed: {0}")]
    Backup(String),

    #[error("Requirements rewrite failed: {0}")]
    Manifest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UpgraderError>;
