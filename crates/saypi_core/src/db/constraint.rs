//! Translation of SQLite failures into storage faults.
//!
//! # Responsibility
//! - Classify raw `rusqlite` errors by extended result code.
//!
//! # Invariants
//! - This is the only module that understands SQLite error encodings.
//! - Classification never inspects error message text.

use crate::db::DbError;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage failure after classification.
#[derive(Debug)]
pub enum StoreFault {
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    UniqueViolation(rusqlite::Error),
    /// A FOREIGN KEY constraint rejected the write.
    ForeignKeyViolation(rusqlite::Error),
    /// Anything else, including non-constraint failures.
    Other(DbError),
}

impl StoreFault {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, Self::ForeignKeyViolation(_))
    }

    /// Drops the classification and returns the transport error.
    pub fn into_db_error(self) -> DbError {
        match self {
            Self::UniqueViolation(err) | Self::ForeignKeyViolation(err) => DbError::Sqlite(err),
            Self::Other(err) => err,
        }
    }
}

impl Display for StoreFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UniqueViolation(err) => write!(f, "unique constraint violated: {err}"),
            Self::ForeignKeyViolation(err) => write!(f, "foreign key constraint violated: {err}"),
            Self::Other(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UniqueViolation(err) | Self::ForeignKeyViolation(err) => Some(err),
            Self::Other(err) => Some(err),
        }
    }
}

/// Classifies one SQLite error by its extended result code.
pub fn classify(err: rusqlite::Error) -> StoreFault {
    let extended_code = match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            failure.extended_code
        }
        _ => return StoreFault::Other(DbError::Sqlite(err)),
    };

    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            StoreFault::UniqueViolation(err)
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => StoreFault::ForeignKeyViolation(err),
        _ => StoreFault::Other(DbError::Sqlite(err)),
    }
}
