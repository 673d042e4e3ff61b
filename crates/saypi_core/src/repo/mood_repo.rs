//! Mood repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - List moods across built-ins and owned rows as one ordered catalog.
//! - Upsert and delete owned moods with protected built-in names.
//!
//! # Invariants
//! - All queries are scoped to one owner.
//! - Names compare through `name_key` (lowercased), never raw `name`.
//! - Built-in names are rejected before any SQL runs.
//! - Upsert is one store-side statement; no check-then-act.

use crate::db::classify;
use crate::model::catalog::{catalog_key, StaticCatalog};
use crate::model::mood::Mood;
use crate::repo::guard::{delete_or_report_dependents, WriteOutcome};
use crate::repo::listing::{list_tiered, Direction, DynamicTier, ListQuery, Page};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const LIST_MOODS_ASC_SQL: &str = "SELECT id, name, eyes, tongue
FROM moods
WHERE user_id = ?1
  AND (?2 IS NULL OR id > ?2)
ORDER BY id ASC
LIMIT ?3;";

const LIST_MOODS_DESC_SQL: &str = "SELECT id, name, eyes, tongue
FROM moods
WHERE user_id = ?1
  AND (?2 IS NULL OR id < ?2)
ORDER BY id DESC
LIMIT ?3;";

const FIND_MOOD_SQL: &str = "SELECT id, name, eyes, tongue
FROM moods
WHERE user_id = ?1
  AND name_key = ?2;";

// The conflict branch always fires, so RETURNING always yields the post-write
// row; `write_outcome` is computed from the pre-write values.
const SET_MOOD_SQL: &str = "INSERT INTO moods (user_id, name, name_key, eyes, tongue, write_outcome)
VALUES (?1, ?2, ?3, ?4, ?5, 'created')
ON CONFLICT (user_id, name_key) DO UPDATE
SET
    eyes = excluded.eyes,
    tongue = excluded.tongue,
    write_outcome = CASE
        WHEN moods.eyes IS NOT excluded.eyes OR moods.tongue IS NOT excluded.tongue
            THEN 'updated'
        ELSE 'unchanged'
    END
RETURNING id, name, eyes, tongue, write_outcome;";

/// Result of [`MoodRepository::set_mood`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodWrite {
    /// Post-write state of the owned mood.
    pub mood: Mood,
    pub outcome: WriteOutcome,
}

/// Repository interface for mood operations.
pub trait MoodRepository {
    /// Lists built-in and owned moods in one total order.
    fn list_moods(&self, owner: &str, query: &ListQuery) -> RepoResult<Page<Mood>>;
    /// Gets one mood by name; built-ins shadow owned rows.
    fn get_mood(&self, owner: &str, name: &str) -> RepoResult<Option<Mood>>;
    /// Creates or updates one owned mood.
    fn set_mood(&self, owner: &str, name: &str, eyes: &str, tongue: &str)
        -> RepoResult<MoodWrite>;
    /// Deletes one owned mood unless lines still reference it.
    fn delete_mood(&self, owner: &str, name: &str) -> RepoResult<()>;
}

/// SQLite-backed mood repository.
pub struct SqliteMoodRepository<'a> {
    conn: &'a Connection,
    builtins: &'a StaticCatalog<Mood>,
}

impl<'a> SqliteMoodRepository<'a> {
    pub fn new(conn: &'a Connection, builtins: &'a StaticCatalog<Mood>) -> Self {
        Self { conn, builtins }
    }

    fn reject_builtin(&self, name: &str) -> RepoResult<()> {
        if self.builtins.contains(name) {
            return Err(RepoError::ProtectedEntity(name.to_string()));
        }
        Ok(())
    }
}

impl MoodRepository for SqliteMoodRepository<'_> {
    fn list_moods(&self, owner: &str, query: &ListQuery) -> RepoResult<Page<Mood>> {
        let owned = OwnedMoods {
            conn: self.conn,
            owner,
        };
        list_tiered(self.builtins, &owned, query)
    }

    fn get_mood(&self, owner: &str, name: &str) -> RepoResult<Option<Mood>> {
        if let Some(builtin) = self.builtins.get(name) {
            return Ok(Some(builtin.clone()));
        }
        find_owned_mood(self.conn, owner, name)
    }

    fn set_mood(
        &self,
        owner: &str,
        name: &str,
        eyes: &str,
        tongue: &str,
    ) -> RepoResult<MoodWrite> {
        self.reject_builtin(name)?;

        let mut stmt = self.conn.prepare_cached(SET_MOOD_SQL)?;
        let (mood, stored_outcome) = stmt
            .query_row(
                params![owner, name, catalog_key(name), eyes, tongue],
                |row| Ok((parse_mood_row(row)?, row.get::<_, String>("write_outcome")?)),
            )
            .map_err(classify)?;

        let outcome = WriteOutcome::from_stored(&stored_outcome).ok_or_else(|| {
            RepoError::invalid_data(format!("unknown moods.write_outcome `{stored_outcome}`"))
        })?;
        Ok(MoodWrite { mood, outcome })
    }

    fn delete_mood(&self, owner: &str, name: &str) -> RepoResult<()> {
        self.reject_builtin(name)?;

        let key = catalog_key(name);
        delete_or_report_dependents(
            name,
            "lines",
            || {
                self.conn.execute(
                    "DELETE FROM moods WHERE user_id = ?1 AND name_key = ?2;",
                    params![owner, key],
                )
            },
            || count_lines_using_mood(self.conn, owner, &key),
        )
    }
}

/// Owned rows of one user, seen as the dynamic tier.
struct OwnedMoods<'a> {
    conn: &'a Connection,
    owner: &'a str,
}

impl DynamicTier for OwnedMoods<'_> {
    type Item = Mood;

    fn resolve(&self, public_id: &str) -> RepoResult<Option<i64>> {
        let sequence_id = self
            .conn
            .prepare_cached("SELECT id FROM moods WHERE user_id = ?1 AND name_key = ?2;")?
            .query_row(params![self.owner, catalog_key(public_id)], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(sequence_id)
    }

    fn query_from(
        &self,
        from: Option<i64>,
        direction: Direction,
        count: usize,
    ) -> RepoResult<Vec<Mood>> {
        let sql = match direction {
            Direction::Ascending => LIST_MOODS_ASC_SQL,
            Direction::Descending => LIST_MOODS_DESC_SQL,
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params![self.owner, from, sql_limit(count)])?;
        let mut moods = Vec::new();
        while let Some(row) = rows.next()? {
            moods.push(parse_mood_row(row)?);
        }
        Ok(moods)
    }
}

/// Finds one owned mood by case-insensitive name.
pub(crate) fn find_owned_mood(
    conn: &Connection,
    owner: &str,
    name: &str,
) -> RepoResult<Option<Mood>> {
    let mood = conn
        .prepare_cached(FIND_MOOD_SQL)?
        .query_row(params![owner, catalog_key(name)], parse_mood_row)
        .optional()?;
    Ok(mood)
}

fn count_lines_using_mood(conn: &Connection, owner: &str, key: &str) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM lines l
         INNER JOIN moods m ON m.id = l.mood_id
         WHERE m.user_id = ?1
           AND m.name_key = ?2;",
        params![owner, key],
        |row| row.get(0),
    )?;
    u64::try_from(count)
        .map_err(|_| RepoError::invalid_data(format!("negative line count `{count}`")))
}

fn parse_mood_row(row: &Row<'_>) -> Result<Mood, rusqlite::Error> {
    Ok(Mood::persisted(
        row.get("id")?,
        row.get("name")?,
        row.get("eyes")?,
        row.get("tongue")?,
    ))
}

pub(crate) fn sql_limit(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{MoodRepository, SqliteMoodRepository, SET_MOOD_SQL};
    use crate::db::Store;
    use crate::model::catalog::catalog_key;
    use crate::model::mood::builtin_moods;
    use crate::repo::guard::WriteOutcome;
    use crate::repo::RepoError;
    use rusqlite::{params, Connection};

    fn upsert(conn: &Connection, name: &str, eyes: &str) -> String {
        conn.query_row(
            SET_MOOD_SQL,
            params!["u", name, catalog_key(name), eyes, "  "],
            |row| row.get("write_outcome"),
        )
        .unwrap()
    }

    #[test]
    fn upsert_returns_a_row_for_every_outcome() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection().unwrap();

        assert_eq!(upsert(&conn, "happy", "^^"), "created");
        assert_eq!(upsert(&conn, "happy", "^^"), "unchanged");
        assert_eq!(upsert(&conn, "HAPPY", "><"), "updated");
        assert_eq!(upsert(&conn, "happy", "><"), "unchanged");
    }

    #[test]
    fn unchanged_write_reports_current_row() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let builtins = builtin_moods();
        let repo = SqliteMoodRepository::new(&conn, &builtins);

        let created = repo.set_mood("u", "happy", "^^", "  ").unwrap();
        let again = repo.set_mood("u", "Happy", "^^", "  ").unwrap();

        assert_eq!(created.outcome, WriteOutcome::Created);
        assert_eq!(again.outcome, WriteOutcome::Unchanged);
        assert_eq!(again.mood, created.mood);
    }

    #[test]
    fn mood_used_by_a_line_reports_line_count() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let builtins = builtin_moods();
        let repo = SqliteMoodRepository::new(&conn, &builtins);

        let happy = repo.set_mood("u", "happy", "^^", "  ").unwrap().mood;
        conn.execute_batch(&format!(
            "INSERT INTO conversations (id, public_id, user_id, heading) VALUES (1, 'cv_1', 'u', 'h');
             INSERT INTO lines (public_id, conversation_id, mood_id, mood_name, animal, think, text)
             VALUES ('ln_1', 1, {id}, 'happy', 'cow', 0, 'a'),
                    ('ln_2', 1, {id}, 'happy', 'cow', 1, 'b');",
            id = happy.sequence_id.unwrap()
        ))
        .unwrap();

        let err = repo.delete_mood("u", "HAPPY").unwrap_err();
        assert!(
            matches!(
                err,
                RepoError::HasDependents {
                    dependents: "lines",
                    count: 2,
                    ..
                }
            ),
            "{err:?}"
        );
        assert_eq!(err.to_string(), "cannot delete `HAPPY`: referenced by 2 lines");

        conn.execute("DELETE FROM lines;", []).unwrap();
        repo.delete_mood("u", "happy").unwrap();
    }

    #[test]
    fn update_keeps_sequence_id() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection().unwrap();
        let builtins = builtin_moods();
        let repo = SqliteMoodRepository::new(&conn, &builtins);

        let created = repo.set_mood("u", "happy", "^^", "  ").unwrap();
        repo.set_mood("u", "other", "..", "  ").unwrap();
        let updated = repo.set_mood("u", "HAPPY", "><", "U ").unwrap();

        assert!(created.mood.sequence_id.is_some());
        assert_eq!(updated.mood.sequence_id, created.mood.sequence_id);
        assert_eq!(updated.mood.name, "happy");
    }
}
