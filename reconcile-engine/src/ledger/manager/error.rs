use super::super::storage::StorageError;
use super::super::traits::LedgerError;
use shared::procurement::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Duplicate operation: {0}")]
    Duplicate(String),

    #[error("Line item not found: {0}")]
    LineItemNotFound(String),

    #[error("Supplier order not found: {0}")]
    OrderNotFound(String),

    #[error(transparent)]
    Rejected(LedgerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Map a storage fault to an infrastructure error code
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    if let StorageError::Serialization(_) = e {
        return CommandErrorCode::InternalError;
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // Database/Transaction/Table/Storage/Commit errors
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::Duplicate(id) => (
                CommandErrorCode::DuplicateOperation,
                format!("Command already processed: {id}"),
            ),
            ManagerError::LineItemNotFound(id) => (
                CommandErrorCode::LineItemNotFound,
                format!("Line item not found: {id}"),
            ),
            ManagerError::OrderNotFound(id) => (
                CommandErrorCode::OrderNotFound,
                format!("Supplier order not found: {id}"),
            ),
            ManagerError::Rejected(e) => (e.code(), e.to_string()),
            ManagerError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal ledger error");
                (CommandErrorCode::InternalError, msg)
            }
        };
        CommandError::new(code, message)
    }
}

impl From<LedgerError> for ManagerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::LineItemNotFound(id) => ManagerError::LineItemNotFound(id),
            LedgerError::OrderNotFound(id) => ManagerError::OrderNotFound(id),
            LedgerError::Storage(msg) => ManagerError::Internal(msg),
            other => ManagerError::Rejected(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
