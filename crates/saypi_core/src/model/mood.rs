//! Mood domain model and the built-in mood catalog.
//!
//! # Invariants
//! - Mood names are unique per owner, compared case-insensitively.
//! - Built-in names are reserved: no owner may create, update or delete them.

use crate::model::catalog::{CatalogEntry, StaticCatalog, Tier};
use serde::{Deserialize, Serialize};

/// Display preset applied when rendering a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    /// User-chosen name; the public id of a mood.
    pub name: String,
    /// Two-character eyes.
    pub eyes: String,
    /// Two-character tongue.
    pub tongue: String,
    /// Static for built-ins, Dynamic for owned rows.
    pub tier: Tier,
    #[serde(skip)]
    pub(crate) sequence_id: Option<i64>,
}

impl Mood {
    /// Creates a built-in mood.
    pub fn builtin(
        name: impl Into<String>,
        eyes: impl Into<String>,
        tongue: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            eyes: eyes.into(),
            tongue: tongue.into(),
            tier: Tier::Static,
            sequence_id: None,
        }
    }

    pub(crate) fn persisted(sequence_id: i64, name: String, eyes: String, tongue: String) -> Self {
        Self {
            name,
            eyes,
            tongue,
            tier: Tier::Dynamic,
            sequence_id: Some(sequence_id),
        }
    }

    pub fn user_defined(&self) -> bool {
        self.tier == Tier::Dynamic
    }
}

impl CatalogEntry for Mood {
    fn public_id(&self) -> &str {
        &self.name
    }
}

/// Built-in moods in declaration order.
pub fn builtin_moods() -> StaticCatalog<Mood> {
    StaticCatalog::new(vec![
        Mood::builtin("borg", "==", "  "),
        Mood::builtin("dead", "xx", "U "),
        Mood::builtin("greedy", "$$", "  "),
        Mood::builtin("stoned", "**", "U "),
        Mood::builtin("tired", "--", "  "),
        Mood::builtin("wired", "OO", "  "),
        Mood::builtin("young", "..", "  "),
    ])
}
