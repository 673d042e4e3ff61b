//! Mood and conversation façade.
//!
//! # Responsibility
//! - Receive an authenticated owner plus validated fields from transport.
//! - Delegate to the mood and conversation repositories.
//! - Log internal faults with context before handing them back.
//!
//! # Invariants
//! - The static tier is built once and injected; there are no singletons.
//! - A pooled connection never outlives the operation that checked it out.
//! - Reads that find nothing return `RepoError::NotFound`.

use crate::db::Store;
use crate::model::catalog::StaticCatalog;
use crate::model::conversation::{Conversation, Line, NewLine};
use crate::model::mood::{builtin_moods, Mood};
use crate::repo::conversation_repo::{ConversationRepository, SqliteConversationRepository};
use crate::repo::ids::IdGenerator;
use crate::repo::listing::{ListQuery, Page};
use crate::repo::mood_repo::{MoodRepository, MoodWrite, SqliteMoodRepository};
use crate::repo::{RepoError, RepoResult};
use log::{debug, error};
use std::sync::Arc;

/// Façade for all mood, conversation and line operations.
///
/// Cheap to clone; clones share the pool, catalog and id source.
#[derive(Debug, Clone)]
pub struct SayService {
    store: Store,
    builtins: Arc<StaticCatalog<Mood>>,
    ids: IdGenerator,
}

impl SayService {
    pub fn new(store: Store, builtins: StaticCatalog<Mood>, ids: IdGenerator) -> Self {
        Self {
            store,
            builtins: Arc::new(builtins),
            ids,
        }
    }

    /// Uses the built-in mood catalog and random ids.
    pub fn with_defaults(store: Store) -> Self {
        Self::new(store, builtin_moods(), IdGenerator::new())
    }

    pub fn list_moods(&self, owner: &str, query: &ListQuery) -> RepoResult<Page<Mood>> {
        self.with_moods("list_moods", |repo| repo.list_moods(owner, query))
    }

    pub fn get_mood(&self, owner: &str, name: &str) -> RepoResult<Mood> {
        self.with_moods("get_mood", |repo| {
            repo.get_mood(owner, name)?.ok_or(RepoError::NotFound)
        })
    }

    /// Creates or updates an owned mood.
    ///
    /// # Errors
    /// - `ProtectedEntity` when `name` is a built-in, in any case.
    pub fn set_mood(
        &self,
        owner: &str,
        name: &str,
        eyes: &str,
        tongue: &str,
    ) -> RepoResult<MoodWrite> {
        let written =
            self.with_moods("set_mood", |repo| repo.set_mood(owner, name, eyes, tongue))?;
        debug!(
            "event=set_mood module=service status=ok outcome={:?}",
            written.outcome
        );
        Ok(written)
    }

    /// Deletes an owned mood.
    ///
    /// # Errors
    /// - `ProtectedEntity` when `name` is a built-in.
    /// - `HasDependents` with the number of lines still using the mood.
    /// - `NotFound` when the owner has no such mood.
    pub fn delete_mood(&self, owner: &str, name: &str) -> RepoResult<()> {
        self.with_moods("delete_mood", |repo| repo.delete_mood(owner, name))
    }

    pub fn list_conversations(
        &self,
        owner: &str,
        query: &ListQuery,
    ) -> RepoResult<Page<Conversation>> {
        self.with_conversations("list_conversations", |repo| {
            repo.list_conversations(owner, query)
        })
    }

    pub fn create_conversation(&self, owner: &str, heading: &str) -> RepoResult<Conversation> {
        self.with_conversations("create_conversation", |repo| {
            repo.create_conversation(owner, heading)
        })
    }

    /// Gets a conversation with its lines in creation order.
    pub fn get_conversation(&self, owner: &str, public_id: &str) -> RepoResult<Conversation> {
        self.with_conversations("get_conversation", |repo| {
            repo.get_conversation(owner, public_id)?
                .ok_or(RepoError::NotFound)
        })
    }

    pub fn delete_conversation(&self, owner: &str, public_id: &str) -> RepoResult<()> {
        self.with_conversations("delete_conversation", |repo| {
            repo.delete_conversation(owner, public_id)
        })
    }

    /// Appends a line to an owned conversation.
    ///
    /// # Errors
    /// - `ValidationFailure` when the mood does not exist for this owner.
    /// - `NotFound` when the conversation does not exist for this owner.
    pub fn create_line(
        &self,
        owner: &str,
        conversation_id: &str,
        line: &NewLine,
    ) -> RepoResult<Line> {
        self.with_conversations("create_line", |repo| {
            repo.create_line(owner, conversation_id, line)
        })
    }

    pub fn get_line(&self, owner: &str, conversation_id: &str, line_id: &str) -> RepoResult<Line> {
        self.with_conversations("get_line", |repo| {
            repo.get_line(owner, conversation_id, line_id)?
                .ok_or(RepoError::NotFound)
        })
    }

    pub fn delete_line(&self, owner: &str, conversation_id: &str, line_id: &str) -> RepoResult<()> {
        self.with_conversations("delete_line", |repo| {
            repo.delete_line(owner, conversation_id, line_id)
        })
    }

    fn with_moods<T, F>(&self, op: &'static str, f: F) -> RepoResult<T>
    where
        F: FnOnce(&SqliteMoodRepository<'_>) -> RepoResult<T>,
    {
        let result = self.store.connection().map_err(RepoError::from).and_then(|conn| {
            let repo = SqliteMoodRepository::new(&conn, &self.builtins);
            f(&repo)
        });
        log_fault(op, result)
    }

    fn with_conversations<T, F>(&self, op: &'static str, f: F) -> RepoResult<T>
    where
        F: FnOnce(&SqliteConversationRepository<'_>) -> RepoResult<T>,
    {
        let result = self.store.connection().map_err(RepoError::from).and_then(|conn| {
            let repo = SqliteConversationRepository::new(&conn, &self.builtins, &self.ids);
            f(&repo)
        });
        log_fault(op, result)
    }
}

fn log_fault<T>(op: &'static str, result: RepoResult<T>) -> RepoResult<T> {
    if let Err(err) = &result {
        if err.is_internal() {
            error!(
                "event=repo_call module=service status=error op={} error_code={} error={}",
                op,
                err.code(),
                err
            );
        } else {
            debug!(
                "event=repo_call module=service status=rejected op={} error_code={}",
                op,
                err.code()
            );
        }
    }
    result
}
