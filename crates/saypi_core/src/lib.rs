//! Core persistence for saypi moods, conversations and lines.
//! This crate is the single source of truth for storage invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::StoreConfig;
pub use db::{DbError, Store};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::catalog::{StaticCatalog, Tier};
pub use model::conversation::{Conversation, Line, NewLine};
pub use model::mood::{builtin_moods, Mood};
pub use repo::guard::WriteOutcome;
pub use repo::ids::{IdGenerator, RandomSource};
pub use repo::listing::{Cursor, Direction, ListQuery, Page};
pub use repo::mood_repo::MoodWrite;
pub use repo::{InternalFault, RepoError, RepoResult};
pub use service::say_service::SayService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
