//! Catalog tiers and the compiled-in static tier.
//!
//! # Responsibility
//! - Name the two tiers of a listed resource.
//! - Serve the static tier in declaration order from memory.
//!
//! # Invariants
//! - Public id lookups fold case, matching the `name_key` column.
//! - Declaration order never changes after construction.

use crate::repo::listing::Direction;
use serde::{Deserialize, Serialize};

/// Partition of a listed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Owned, persisted rows ordered by sequence id.
    Dynamic,
    /// Built-in entries ordered by declaration.
    Static,
}

/// Entry addressable by an externally visible identifier.
pub trait CatalogEntry {
    fn public_id(&self) -> &str;
}

/// Normalized lookup key for a public id.
pub fn catalog_key(public_id: &str) -> String {
    public_id.to_lowercase()
}

/// Immutable static tier, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCatalog<T> {
    entries: Vec<T>,
}

impl<T> StaticCatalog<T> {
    pub fn new(entries: Vec<T>) -> Self {
        Self { entries }
    }

    /// A static tier with no entries, for single-tier resources.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

impl<T: CatalogEntry + Clone> StaticCatalog<T> {
    /// Declaration index of the entry with this public id.
    pub fn position(&self, public_id: &str) -> Option<usize> {
        let key = catalog_key(public_id);
        self.entries
            .iter()
            .position(|entry| catalog_key(entry.public_id()) == key)
    }

    pub fn get(&self, public_id: &str) -> Option<&T> {
        self.position(public_id).map(|index| &self.entries[index])
    }

    pub fn contains(&self, public_id: &str) -> bool {
        self.position(public_id).is_some()
    }

    /// Returns up to `count` entries strictly beyond declaration index
    /// `from`, or from the tier boundary when `from` is `None`.
    pub fn slice_from(&self, from: Option<usize>, direction: Direction, count: usize) -> Vec<T> {
        match direction {
            Direction::Ascending => {
                let start = from.map_or(0, |index| index + 1);
                self.entries
                    .iter()
                    .skip(start)
                    .take(count)
                    .cloned()
                    .collect()
            }
            Direction::Descending => {
                let end = from.unwrap_or(self.entries.len()).min(self.entries.len());
                self.entries[..end]
                    .iter()
                    .rev()
                    .take(count)
                    .cloned()
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogEntry, StaticCatalog};
    use crate::repo::listing::Direction;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(&'static str);

    impl CatalogEntry for Entry {
        fn public_id(&self) -> &str {
            self.0
        }
    }

    fn catalog() -> StaticCatalog<Entry> {
        StaticCatalog::new(vec![Entry("a"), Entry("B"), Entry("c")])
    }

    fn ids(entries: Vec<Entry>) -> Vec<&'static str> {
        entries.into_iter().map(|entry| entry.0).collect()
    }

    #[test]
    fn position_folds_case() {
        let catalog = catalog();
        assert_eq!(catalog.position("b"), Some(1));
        assert_eq!(catalog.position("A"), Some(0));
        assert_eq!(catalog.position("d"), None);
    }

    #[test]
    fn slice_from_boundary_follows_declaration_order() {
        let catalog = catalog();
        assert_eq!(
            ids(catalog.slice_from(None, Direction::Ascending, 2)),
            ["a", "B"]
        );
        assert_eq!(
            ids(catalog.slice_from(None, Direction::Descending, 2)),
            ["c", "B"]
        );
    }

    #[test]
    fn slice_from_position_is_exclusive() {
        let catalog = catalog();
        assert_eq!(
            ids(catalog.slice_from(Some(0), Direction::Ascending, 5)),
            ["B", "c"]
        );
        assert_eq!(
            ids(catalog.slice_from(Some(2), Direction::Descending, 5)),
            ["B", "a"]
        );
        assert!(catalog
            .slice_from(Some(2), Direction::Ascending, 5)
            .is_empty());
        assert!(catalog
            .slice_from(Some(0), Direction::Descending, 5)
            .is_empty());
    }
}
