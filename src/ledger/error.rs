use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task id collision: {0}")]
    IdCollision(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
