//! Public identifier generation with bounded collision retry.
//!
//! # Responsibility
//! - Draw short, random, human-typable public ids (`<prefix><base36>`).
//! - Retry an insert with a fresh id when the id column rejects a duplicate.
//!
//! # Invariants
//! - Draws are uniform over `[0, i64::MAX)`.
//! - At most [`MAX_INSERT_ATTEMPTS`] inserts are attempted per call.
//! - Only unique-constraint failures are retried; anything else aborts.

use crate::db::{classify, StoreFault};
use crate::repo::{InternalFault, RepoError};
use log::{error, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Upper bound on insert attempts for one new entity.
pub const MAX_INSERT_ATTEMPTS: u32 = 16;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Source of identifier draws.
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0, i64::MAX)`.
    fn next_u63(&self) -> u64;
}

/// Thread-local CSPRNG draws.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u63(&self) -> u64 {
        rand::thread_rng().gen_range(0..i64::MAX as u64)
    }
}

/// Failure of [`IdGenerator::insert_unique`].
#[derive(Debug)]
pub enum UniqueInsertError {
    /// Every attempt collided.
    Exhausted {
        prefix: &'static str,
        attempts: u32,
    },
    /// The insert failed for a reason other than an id collision.
    Fault(StoreFault),
}

impl Display for UniqueInsertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { prefix, attempts } => write!(
                f,
                "no unique `{prefix}` identifier after {attempts} attempts"
            ),
            Self::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

impl Error for UniqueInsertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted { .. } => None,
            Self::Fault(fault) => Some(fault),
        }
    }
}

impl From<UniqueInsertError> for RepoError {
    fn from(value: UniqueInsertError) -> Self {
        match value {
            UniqueInsertError::Exhausted { prefix, attempts } => {
                Self::InternalFault(InternalFault::IdSpaceExhausted { prefix, attempts })
            }
            UniqueInsertError::Fault(fault) => fault.into(),
        }
    }
}

/// Generates public ids without a central sequence.
#[derive(Clone)]
pub struct IdGenerator {
    source: Arc<dyn RandomSource>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_source(Arc::new(ThreadRandom))
    }

    /// Uses a caller-provided draw source, e.g. a fixed one in tests.
    pub fn with_source(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    /// Draws one id with the given kind prefix.
    pub fn new_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", encode_base36(self.source.next_u63()))
    }

    /// Runs `insert` with freshly drawn ids until it succeeds.
    ///
    /// # Errors
    /// - `Exhausted` after [`MAX_INSERT_ATTEMPTS`] unique-constraint failures.
    /// - `Fault` on the first failure of any other kind.
    pub fn insert_unique<T, F>(&self, prefix: &'static str, mut insert: F) -> Result<T, UniqueInsertError>
    where
        F: FnMut(&str) -> Result<T, rusqlite::Error>,
    {
        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let public_id = self.new_id(prefix);
            match insert(&public_id).map_err(classify) {
                Ok(value) => return Ok(value),
                Err(fault) if fault.is_unique_violation() => {
                    warn!(
                        "event=id_collision module=repo status=retry prefix={} attempt={}",
                        prefix, attempt
                    );
                }
                Err(fault) => return Err(UniqueInsertError::Fault(fault)),
            }
        }

        error!(
            "event=id_collision module=repo status=error error_code=id_space_exhausted prefix={} attempts={}",
            prefix, MAX_INSERT_ATTEMPTS
        );
        Err(UniqueInsertError::Exhausted {
            prefix,
            attempts: MAX_INSERT_ATTEMPTS,
        })
    }
}

/// Renders `value` in lowercase base 36.
pub fn encode_base36(value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    let mut remaining = value;
    while remaining > 0 {
        digits.push(BASE36_ALPHABET[(remaining % 36) as usize] as char);
        remaining /= 36;
    }
    digits.iter().rev().collect()
}
