//! Conversation/line repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - List, create, read and delete one owner's conversations.
//! - Create, read and delete lines inside an owned conversation.
//!
//! # Invariants
//! - Conversations list through the tiered engine with an empty static tier.
//! - New public ids come from `IdGenerator::insert_unique`.
//! - Lines referencing an owned mood keep a foreign key to it; lines using
//!   a built-in store only the name.
//! - Deleting a conversation cascades to its lines.

use crate::model::catalog::StaticCatalog;
use crate::model::conversation::{
    Conversation, Line, NewLine, CONVERSATION_ID_PREFIX, LINE_ID_PREFIX,
};
use crate::model::mood::Mood;
use crate::repo::ids::{IdGenerator, UniqueInsertError};
use crate::repo::listing::{list_tiered, Direction, DynamicTier, ListQuery, Page};
use crate::repo::mood_repo::{find_owned_mood, sql_limit};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const LIST_CONVERSATIONS_ASC_SQL: &str = "SELECT id, public_id, heading
FROM conversations
WHERE user_id = ?1
  AND (?2 IS NULL OR id > ?2)
ORDER BY id ASC
LIMIT ?3;";

const LIST_CONVERSATIONS_DESC_SQL: &str = "SELECT id, public_id, heading
FROM conversations
WHERE user_id = ?1
  AND (?2 IS NULL OR id < ?2)
ORDER BY id DESC
LIMIT ?3;";

const FIND_CONVERSATION_SQL: &str = "SELECT id, public_id, heading
FROM conversations
WHERE user_id = ?1
  AND public_id = ?2;";

const LINE_SELECT_SQL: &str = "SELECT
    l.public_id AS public_id,
    l.animal AS animal,
    l.think AS think,
    l.text AS text,
    l.mood_name AS mood_name,
    m.id AS mood_id,
    m.name AS mood_row_name,
    m.eyes AS mood_eyes,
    m.tongue AS mood_tongue
FROM lines l
INNER JOIN conversations c ON c.id = l.conversation_id
LEFT JOIN moods m ON m.id = l.mood_id";

/// Repository interface for conversations and their lines.
pub trait ConversationRepository {
    /// Lists conversations in creation order.
    fn list_conversations(&self, owner: &str, query: &ListQuery)
        -> RepoResult<Page<Conversation>>;
    /// Creates one conversation with a generated public id.
    fn create_conversation(&self, owner: &str, heading: &str) -> RepoResult<Conversation>;
    /// Gets one conversation with all of its lines.
    fn get_conversation(&self, owner: &str, public_id: &str) -> RepoResult<Option<Conversation>>;
    /// Deletes one conversation and its lines.
    fn delete_conversation(&self, owner: &str, public_id: &str) -> RepoResult<()>;
    /// Appends one line to an owned conversation.
    fn create_line(&self, owner: &str, conversation_id: &str, line: &NewLine) -> RepoResult<Line>;
    /// Gets one line with its live mood attributes.
    fn get_line(&self, owner: &str, conversation_id: &str, line_id: &str)
        -> RepoResult<Option<Line>>;
    /// Deletes one line from an owned conversation.
    fn delete_line(&self, owner: &str, conversation_id: &str, line_id: &str) -> RepoResult<()>;
}

/// SQLite-backed conversation repository.
pub struct SqliteConversationRepository<'a> {
    conn: &'a Connection,
    builtins: &'a StaticCatalog<Mood>,
    ids: &'a IdGenerator,
}

impl<'a> SqliteConversationRepository<'a> {
    pub fn new(
        conn: &'a Connection,
        builtins: &'a StaticCatalog<Mood>,
        ids: &'a IdGenerator,
    ) -> Self {
        Self {
            conn,
            builtins,
            ids,
        }
    }

    /// Resolves a mood name to `(owned row id, mood)`; built-ins have no row.
    fn resolve_mood(&self, owner: &str, name: &str) -> RepoResult<Option<(Option<i64>, Mood)>> {
        if let Some(builtin) = self.builtins.get(name) {
            return Ok(Some((None, builtin.clone())));
        }
        Ok(find_owned_mood(self.conn, owner, name)?
            .map(|mood| (mood.sequence_id, mood)))
    }
}

impl ConversationRepository for SqliteConversationRepository<'_> {
    fn list_conversations(
        &self,
        owner: &str,
        query: &ListQuery,
    ) -> RepoResult<Page<Conversation>> {
        let owned = OwnedConversations {
            conn: self.conn,
            owner,
        };
        list_tiered(&StaticCatalog::empty(), &owned, query)
    }

    fn create_conversation(&self, owner: &str, heading: &str) -> RepoResult<Conversation> {
        let conversation = self.ids.insert_unique(CONVERSATION_ID_PREFIX, |public_id| {
            let sequence_id: i64 = self
                .conn
                .prepare_cached(
                    "INSERT INTO conversations (public_id, user_id, heading)
                     VALUES (?1, ?2, ?3)
                     RETURNING id;",
                )?
                .query_row(params![public_id, owner, heading], |row| row.get(0))?;
            Ok(Conversation::persisted(
                sequence_id,
                public_id.to_string(),
                heading.to_string(),
            ))
        })?;
        Ok(conversation)
    }

    fn get_conversation(&self, owner: &str, public_id: &str) -> RepoResult<Option<Conversation>> {
        // Deferred read transaction so the heading and lines come from one snapshot.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let Some(mut conversation) = find_conversation(&tx, owner, public_id)? else {
            return Ok(None);
        };

        let mut stmt = tx.prepare_cached(&format!(
            "{LINE_SELECT_SQL}
             WHERE l.conversation_id = ?1
             ORDER BY l.id ASC;"
        ))?;
        let mut rows = stmt.query([conversation.sequence_id])?;
        while let Some(row) = rows.next()? {
            conversation.lines.push(parse_line_row(row, self.builtins)?);
        }
        drop(rows);
        drop(stmt);
        tx.commit()?;

        Ok(Some(conversation))
    }

    fn delete_conversation(&self, owner: &str, public_id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM conversations WHERE user_id = ?1 AND public_id = ?2;",
            params![owner, public_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    fn create_line(&self, owner: &str, conversation_id: &str, line: &NewLine) -> RepoResult<Line> {
        let Some((mood_id, mood)) = self.resolve_mood(owner, &line.mood)? else {
            return Err(RepoError::validation(
                "mood",
                format!("{:?} does not exist", line.mood),
            ));
        };
        let Some(conversation) = find_conversation(self.conn, owner, conversation_id)? else {
            return Err(RepoError::NotFound);
        };

        let inserted = self.ids.insert_unique(LINE_ID_PREFIX, |public_id| {
            self.conn
                .prepare_cached(
                    "INSERT INTO lines (
                        public_id,
                        conversation_id,
                        mood_id,
                        mood_name,
                        animal,
                        think,
                        text
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                )?
                .execute(params![
                    public_id,
                    conversation.sequence_id,
                    mood_id,
                    mood.name,
                    line.animal,
                    line.think,
                    line.text,
                ])?;
            Ok(public_id.to_string())
        });

        match inserted {
            Ok(public_id) => Ok(Line {
                public_id,
                animal: line.animal.clone(),
                think: line.think,
                text: line.text.clone(),
                mood,
            }),
            Err(UniqueInsertError::Fault(fault)) if fault.is_foreign_key_violation() => {
                // A referenced row vanished between lookup and insert.
                if find_conversation(self.conn, owner, conversation_id)?.is_none() {
                    Err(RepoError::NotFound)
                } else {
                    Err(RepoError::validation(
                        "mood",
                        format!("{:?} does not exist", line.mood),
                    ))
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_line(
        &self,
        owner: &str,
        conversation_id: &str,
        line_id: &str,
    ) -> RepoResult<Option<Line>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "{LINE_SELECT_SQL}
             WHERE c.user_id = ?1
               AND c.public_id = ?2
               AND l.public_id = ?3;"
        ))?;
        let mut rows = stmt.query(params![owner, conversation_id, line_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_line_row(row, self.builtins)?));
        }
        Ok(None)
    }

    fn delete_line(&self, owner: &str, conversation_id: &str, line_id: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM lines
             WHERE public_id = ?1
               AND conversation_id IN (
                 SELECT id
                 FROM conversations
                 WHERE user_id = ?2 AND public_id = ?3
               );",
            params![line_id, owner, conversation_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

/// One owner's conversations, seen as the dynamic tier.
struct OwnedConversations<'a> {
    conn: &'a Connection,
    owner: &'a str,
}

impl DynamicTier for OwnedConversations<'_> {
    type Item = Conversation;

    fn resolve(&self, public_id: &str) -> RepoResult<Option<i64>> {
        Ok(find_conversation(self.conn, self.owner, public_id)?
            .and_then(|conversation| conversation.sequence_id))
    }

    fn query_from(
        &self,
        from: Option<i64>,
        direction: Direction,
        count: usize,
    ) -> RepoResult<Vec<Conversation>> {
        let sql = match direction {
            Direction::Ascending => LIST_CONVERSATIONS_ASC_SQL,
            Direction::Descending => LIST_CONVERSATIONS_DESC_SQL,
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        let mut rows = stmt.query(params![self.owner, from, sql_limit(count)])?;
        let mut conversations = Vec::new();
        while let Some(row) = rows.next()? {
            conversations.push(parse_conversation_row(row)?);
        }
        Ok(conversations)
    }
}

fn find_conversation(
    conn: &Connection,
    owner: &str,
    public_id: &str,
) -> RepoResult<Option<Conversation>> {
    let conversation = conn
        .prepare_cached(FIND_CONVERSATION_SQL)?
        .query_row(params![owner, public_id], parse_conversation_row)
        .optional()?;
    Ok(conversation)
}

fn parse_conversation_row(row: &Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation::persisted(
        row.get("id")?,
        row.get("public_id")?,
        row.get("heading")?,
    ))
}

fn parse_line_row(row: &Row<'_>, builtins: &StaticCatalog<Mood>) -> RepoResult<Line> {
    let mood = match row.get::<_, Option<i64>>("mood_id")? {
        Some(mood_id) => Mood::persisted(
            mood_id,
            row.get("mood_row_name")?,
            row.get("mood_eyes")?,
            row.get("mood_tongue")?,
        ),
        None => {
            let mood_name: String = row.get("mood_name")?;
            builtins.get(&mood_name).cloned().ok_or_else(|| {
                RepoError::invalid_data(format!(
                    "unknown built-in mood `{mood_name}` in lines.mood_name"
                ))
            })?
        }
    };

    Ok(Line {
        public_id: row.get("public_id")?,
        animal: row.get("animal")?,
        think: row.get("think")?,
        text: row.get("text")?,
        mood,
    })
}
