//! Use-case façade over repositories.
//!
//! # Responsibility
//! - Expose one named operation per resource action.
//! - Own the store handle, the static tier and the id generator.
//!
//! # Invariants
//! - Callers never reach storage except through `SayService`.
//! - Each operation checks out exactly one pooled connection.

pub mod say_service;
