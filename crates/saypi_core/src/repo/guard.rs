//! Conflict-aware write guard.
//!
//! # Responsibility
//! - Translate constraint failures of single-row writes into domain outcomes.
//! - Enrich a blocked delete with a targeted follow-up read.
//!
//! # Invariants
//! - The write is attempted exactly once; nothing here retries.
//! - Raw constraint errors never leave this module as client outcomes.
//! - Every dependent-blocking relationship goes through
//!   [`delete_or_report_dependents`].

use crate::db::classify;
use crate::repo::{RepoError, RepoResult};
use log::debug;
use serde::Serialize;

/// What a conditional single-row write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// No row existed; one was inserted.
    Created,
    /// An existing row changed.
    Updated,
    /// An existing row already held the requested values.
    Unchanged,
}

impl WriteOutcome {
    /// Parses the `write_outcome` column stamped by an upsert.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "unchanged" => Some(Self::Unchanged),
            _ => None,
        }
    }
}

/// Attempts a delete and classifies its failure.
///
/// On a foreign-key violation, `count_dependents` is run to report how many
/// live `dependents` rows block the delete. Zero affected rows means the target does not
/// exist.
///
/// # Errors
/// - `HasDependents` when referenced rows block the delete.
/// - `NotFound` when nothing was deleted.
/// - `InternalFault` for any other store failure.
pub fn delete_or_report_dependents<D, C>(
    entity: &str,
    dependents: &'static str,
    delete: D,
    count_dependents: C,
) -> RepoResult<()>
where
    D: FnOnce() -> Result<usize, rusqlite::Error>,
    C: FnOnce() -> RepoResult<u64>,
{
    match delete().map_err(classify) {
        Ok(0) => Err(RepoError::NotFound),
        Ok(_) => Ok(()),
        Err(fault) if fault.is_foreign_key_violation() => {
            let count = count_dependents()?;
            debug!(
                "event=delete_blocked module=repo status=rejected dependents={} count={}",
                dependents, count
            );
            Err(RepoError::HasDependents {
                entity: entity.to_string(),
                dependents,
                count,
            })
        }
        Err(fault) => Err(fault.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::{delete_or_report_dependents, WriteOutcome};
    use crate::repo::RepoError;
    use rusqlite::Connection;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                id INTEGER PRIMARY KEY,
                parent_id INTEGER REFERENCES parent(id)
             );
             INSERT INTO parent (id) VALUES (1), (2);
             INSERT INTO child (parent_id) VALUES (1), (1), (1);",
        )
        .unwrap();
        conn
    }

    fn delete_parent(conn: &Connection, id: i64) -> Result<(), RepoError> {
        delete_or_report_dependents(
            "parent",
            "children",
            || conn.execute("DELETE FROM parent WHERE id = ?1;", [id]),
            || {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM child WHERE parent_id = ?1;",
                    [id],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            },
        )
    }

    #[test]
    fn referenced_row_reports_dependent_count() {
        let conn = fixture();
        let err = delete_parent(&conn, 1).unwrap_err();
        assert!(matches!(
            err,
            RepoError::HasDependents {
                dependents: "children",
                count: 3,
                ..
            }
        ));
        assert_eq!(err.to_string(), "cannot delete `parent`: referenced by 3 children");
    }

    #[test]
    fn unreferenced_row_is_deleted() {
        let conn = fixture();
        delete_parent(&conn, 2).unwrap();
        assert!(matches!(delete_parent(&conn, 2), Err(RepoError::NotFound)));
    }

    #[test]
    fn delete_succeeds_after_dependents_are_removed() {
        let conn = fixture();
        conn.execute("DELETE FROM child;", []).unwrap();
        delete_parent(&conn, 1).unwrap();
    }

    #[test]
    fn stored_outcome_parses() {
        assert_eq!(WriteOutcome::from_stored("created"), Some(WriteOutcome::Created));
        assert_eq!(WriteOutcome::from_stored("updated"), Some(WriteOutcome::Updated));
        assert_eq!(WriteOutcome::from_stored("unchanged"), Some(WriteOutcome::Unchanged));
        assert_eq!(WriteOutcome::from_stored("Created"), None);
    }
}
