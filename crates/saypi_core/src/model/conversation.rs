//! Conversation and line domain models.
//!
//! # Invariants
//! - Public ids carry a kind prefix (`cv_` or `ln_`) and are globally unique.
//! - A line belongs to exactly one conversation.
//! - A line's mood is resolved live on every read.

use crate::model::catalog::CatalogEntry;
use crate::model::mood::Mood;
use serde::{Deserialize, Serialize};

/// Public id prefix for conversations.
pub const CONVERSATION_ID_PREFIX: &str = "cv_";
/// Public id prefix for lines.
pub const LINE_ID_PREFIX: &str = "ln_";

/// Ordered sequence of rendered lines owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "id")]
    pub public_id: String,
    pub heading: String,
    /// Populated only by single-conversation reads, in creation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<Line>,
    #[serde(skip)]
    pub(crate) sequence_id: Option<i64>,
}

impl Conversation {
    pub(crate) fn persisted(sequence_id: i64, public_id: String, heading: String) -> Self {
        Self {
            public_id,
            heading,
            lines: Vec::new(),
            sequence_id: Some(sequence_id),
        }
    }
}

impl CatalogEntry for Conversation {
    fn public_id(&self) -> &str {
        &self.public_id
    }
}

/// One line of a conversation with its live mood attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    #[serde(rename = "id")]
    pub public_id: String,
    pub animal: String,
    pub think: bool,
    pub text: String,
    pub mood: Mood,
}

/// Validated input for creating one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub animal: String,
    pub think: bool,
    /// Name of a built-in or owned mood.
    pub mood: String,
    pub text: String,
}
