//! Domain model for moods, conversations and lines.
//!
//! # Responsibility
//! - Define the entries served by listed resources.
//! - Hold the compiled-in static tier (built-in moods).
//!
//! # Invariants
//! - Static entries are immutable and identical for every owner.
//! - Sequence ids are internal ordering keys and never serialized.

pub mod catalog;
pub mod conversation;
pub mod mood;
