use crate::domain::renewal::RenewalDenial;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u32 },
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
    #[error("Renewal denied for transaction {transaction}: {reason}")]
    RenewalDenied {
        transaction: u32,
        reason: RenewalDenial,
    },
    #[error("Borrower {borrower} may hold at most {limit} books, requested {requested}")]
    BorrowLimitExceeded {
        borrower: u32,
        limit: u32,
        requested: u32,
    },
    #[error("Book {0} has no copies available")]
    BookUnavailable(u32),
    #[error("Duplicate {entity} id {id}")]
    Duplicate { entity: &'static str, id: u32 },
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
