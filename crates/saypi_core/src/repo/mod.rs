//! Repository layer: the only path into storage.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per resource.
//! - Isolate SQLite query details from the façade.
//! - Return client-meaningful outcomes as typed variants, never raw store
//!   error text.
//!
//! # Invariants
//! - Constraint failures are classified by `db::classify` at the point of
//!   occurrence and converted immediately.
//! - The only retry is the bounded identifier-collision retry in `ids`.

use crate::db::{DbError, StoreFault};
use crate::repo::listing::Cursor;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod conversation_repo;
pub mod guard;
pub mod ids;
pub mod listing;
pub mod mood_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Closed set of repository outcomes other than success.
#[derive(Debug)]
pub enum RepoError {
    /// Pagination cursor does not name a live entry in either tier.
    CursorNotFound(Cursor),
    /// Attempted mutation of a built-in entry.
    ProtectedEntity(String),
    /// Delete blocked by `count` live `dependents` rows.
    HasDependents {
        entity: String,
        dependents: &'static str,
        count: u64,
    },
    /// Operation targets a nonexistent entity.
    NotFound,
    /// A field failed a relational or shape check.
    ValidationFailure {
        param: &'static str,
        message: String,
    },
    /// Store unavailable, identifier exhaustion, or unclassified failure.
    InternalFault(InternalFault),
}

/// Failures that are reported generically to end users.
#[derive(Debug)]
pub enum InternalFault {
    Db(DbError),
    /// Every identifier draw collided with a live row.
    IdSpaceExhausted { prefix: &'static str, attempts: u32 },
    /// Persisted data cannot be converted into a valid read model.
    InvalidData(String),
}

impl RepoError {
    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::CursorNotFound(_) => "cursor_not_found",
            Self::ProtectedEntity(_) => "action_not_allowed",
            Self::HasDependents { .. } => "has_dependents",
            Self::NotFound => "not_found",
            Self::ValidationFailure { .. } => "invalid_params",
            Self::InternalFault(_) => "internal_failure",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalFault(_))
    }

    pub(crate) fn validation(param: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            param,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::InternalFault(InternalFault::InvalidData(message.into()))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CursorNotFound(cursor) => {
                write!(f, "{} must refer to an existing object", cursor.param())
            }
            Self::ProtectedEntity(name) => write!(f, "you may not modify built-in `{name}`"),
            Self::HasDependents {
                entity,
                dependents,
                count,
            } => write!(f, "cannot delete `{entity}`: referenced by {count} {dependents}"),
            Self::NotFound => write!(f, "the requested resource could not be found"),
            Self::ValidationFailure { param, message } => write!(f, "{param}: {message}"),
            Self::InternalFault(fault) => write!(f, "{fault}"),
        }
    }
}

impl Display for InternalFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::IdSpaceExhausted { prefix, attempts } => write!(
                f,
                "unable to generate a unique `{prefix}` identifier after {attempts} attempts"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InternalFault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl Error for InternalFault {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::InternalFault(InternalFault::Db(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::InternalFault(InternalFault::Db(DbError::Sqlite(value)))
    }
}

impl From<StoreFault> for RepoError {
    fn from(value: StoreFault) -> Self {
        Self::InternalFault(InternalFault::Db(value.into_db_error()))
    }
}
