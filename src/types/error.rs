use thiserror::Error;

use crate::types::PageIndex;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Table '{name}' already exists")]
    TableAlreadyExists { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Duplicate primary key {key}")]
    DuplicatePrimaryKey { key: i32 },

    #[error("Column '{column}' cannot be NULL")]
    NullViolation { column: String },

    #[error("Table '{table}' expects {expected} values, got {actual}")]
    ValueCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Type mismatch for column '{column}': expected {expected}, got '{actual}'")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("{operation} requires an '=' condition on the primary key")]
    PrimaryKeyConditionRequired { operation: String },

    #[error("Invalid table definition: {reason}")]
    InvalidSchema { reason: String },

    #[error("Row of {size} bytes does not fit a page (max {max})")]
    RowTooLarge { size: usize, max: usize },

    #[error("Cannot drop catalog table '{name}'")]
    CatalogTableProtected { name: String },

    #[error("Invalid page type: {0:#04x}")]
    InvalidPageType(u8),

    #[error("Corrupted table file (page {page}): {reason}")]
    CorruptedPage { page: PageIndex, reason: String },

    #[error("Corrupted table file: {reason}")]
    CorruptedTable { reason: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
