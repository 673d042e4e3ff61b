//! Cursor-paginated listing across a static and a dynamic tier.
//!
//! # Responsibility
//! - Resolve a public-id cursor to a position inside one tier.
//! - Page through both tiers as one total order, in either direction.
//!
//! # Invariants
//! - Global ascending order is `[dynamic by sequence id] ++ [static by
//!   declaration]`; descending order is its exact reverse.
//! - Tiers never interleave: the boundary is a hard cut, not a merge.
//! - `has_more` is true iff an entry exists beyond the last returned one.
//! - A cursor that names no live entry fails with `CursorNotFound`.
//!
//! Dynamic rows are ordered by sequence id while cursors are keyed by public
//! id, so the two keys differ within the dynamic tier.

use crate::model::catalog::{CatalogEntry, StaticCatalog, Tier};
use crate::repo::{RepoError, RepoResult};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: u32 = 10;
/// Largest page size accepted from callers.
pub const MAX_LIST_LIMIT: u32 = 100;

/// Traversal direction implied by the cursor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Tiers in the order this direction visits them.
    fn tier_order(self) -> [Tier; 2] {
        match self {
            Self::Ascending => [Tier::Dynamic, Tier::Static],
            Self::Descending => [Tier::Static, Tier::Dynamic],
        }
    }
}

/// Exclusive pagination boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Entries strictly after this public id, ascending.
    After(String),
    /// Entries strictly before this public id, descending.
    Before(String),
}

impl Cursor {
    pub fn public_id(&self) -> &str {
        match self {
            Self::After(id) | Self::Before(id) => id,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::After(_) => Direction::Ascending,
            Self::Before(_) => Direction::Descending,
        }
    }

    /// Request parameter this cursor came from.
    pub fn param(&self) -> &'static str {
        match self {
            Self::After(_) => "starting_after",
            Self::Before(_) => "ending_before",
        }
    }
}

/// Listing request for one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub cursor: Option<Cursor>,
    pub limit: u32,
}

impl ListQuery {
    pub fn first(limit: u32) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }

    pub fn after(public_id: impl Into<String>, limit: u32) -> Self {
        Self {
            cursor: Some(Cursor::After(public_id.into())),
            limit,
        }
    }

    pub fn before(public_id: impl Into<String>, limit: u32) -> Self {
        Self {
            cursor: Some(Cursor::Before(public_id.into())),
            limit,
        }
    }

    /// Builds a query from raw request parameters.
    ///
    /// Empty cursor strings count as unset. A missing limit defaults to
    /// [`DEFAULT_LIST_LIMIT`].
    ///
    /// # Errors
    /// - `ValidationFailure` when both cursors are set.
    /// - `ValidationFailure` when `limit` exceeds [`MAX_LIST_LIMIT`].
    pub fn from_params(
        after: Option<String>,
        before: Option<String>,
        limit: Option<u32>,
    ) -> RepoResult<Self> {
        let after = after.filter(|value| !value.is_empty());
        let before = before.filter(|value| !value.is_empty());

        let cursor = match (after, before) {
            (Some(_), Some(_)) => {
                return Err(RepoError::validation(
                    "starting_after",
                    "you may not provide multiple cursor parameters",
                ));
            }
            (Some(after), None) => Some(Cursor::After(after)),
            (None, Some(before)) => Some(Cursor::Before(before)),
            (None, None) => None,
        };

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        if limit > MAX_LIST_LIMIT {
            return Err(RepoError::validation(
                "limit",
                format!("must be a non-negative integer no greater than {MAX_LIST_LIMIT}"),
            ));
        }

        Ok(Self { cursor, limit })
    }

    pub fn direction(&self) -> Direction {
        self.cursor
            .as_ref()
            .map_or(Direction::Ascending, Cursor::direction)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T: CatalogEntry> Page<T> {
    /// Public id of the last item, usable as the next cursor.
    pub fn last_cursor(&self) -> Option<&str> {
        self.items.last().map(CatalogEntry::public_id)
    }
}

/// Resolved position of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierPosition {
    /// Sequence id of a persisted row.
    Dynamic(i64),
    /// Declaration index of a built-in entry.
    Static(usize),
}

impl TierPosition {
    pub fn tier(self) -> Tier {
        match self {
            Self::Dynamic(_) => Tier::Dynamic,
            Self::Static(_) => Tier::Static,
        }
    }
}

/// Where a single-tier query begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierStart {
    /// From the tier's own edge for the chosen direction.
    Boundary(Tier),
    /// Strictly beyond a resolved cursor position.
    Beyond(TierPosition),
}

/// Persisted, per-owner tier of a listed resource.
pub trait DynamicTier {
    type Item;

    /// Sequence id of the live row with this public id.
    fn resolve(&self, public_id: &str) -> RepoResult<Option<i64>>;

    /// Up to `count` rows strictly beyond sequence id `from` (or from the
    /// tier edge), ordered by sequence id in `direction`.
    fn query_from(
        &self,
        from: Option<i64>,
        direction: Direction,
        count: usize,
    ) -> RepoResult<Vec<Self::Item>>;
}

/// Resolves a cursor, checking the static tier first.
///
/// Static entries win so that a reserved name always resolves to the
/// built-in, whatever rows exist.
pub fn resolve_cursor<T, D>(
    static_tier: &StaticCatalog<T>,
    dynamic: &D,
    cursor: &Cursor,
) -> RepoResult<TierPosition>
where
    T: CatalogEntry + Clone,
    D: DynamicTier<Item = T>,
{
    if let Some(index) = static_tier.position(cursor.public_id()) {
        return Ok(TierPosition::Static(index));
    }

    match dynamic.resolve(cursor.public_id())? {
        Some(sequence_id) => Ok(TierPosition::Dynamic(sequence_id)),
        None => Err(RepoError::CursorNotFound(cursor.clone())),
    }
}

/// Queries exactly one tier for up to `count` entries.
pub fn query_tier_from<T, D>(
    static_tier: &StaticCatalog<T>,
    dynamic: &D,
    start: TierStart,
    direction: Direction,
    count: usize,
) -> RepoResult<Vec<T>>
where
    T: CatalogEntry + Clone,
    D: DynamicTier<Item = T>,
{
    match start {
        TierStart::Boundary(Tier::Static) => Ok(static_tier.slice_from(None, direction, count)),
        TierStart::Beyond(TierPosition::Static(index)) => {
            Ok(static_tier.slice_from(Some(index), direction, count))
        }
        TierStart::Boundary(Tier::Dynamic) => dynamic.query_from(None, direction, count),
        TierStart::Beyond(TierPosition::Dynamic(sequence_id)) => {
            dynamic.query_from(Some(sequence_id), direction, count)
        }
    }
}

/// Lists one page across both tiers.
///
/// Each visited tier is asked for one more entry than the remaining budget;
/// an overflow ends the walk with `has_more = true` without touching later
/// tiers. A zero limit still performs the lookups with a count of one.
pub fn list_tiered<T, D>(
    static_tier: &StaticCatalog<T>,
    dynamic: &D,
    query: &ListQuery,
) -> RepoResult<Page<T>>
where
    T: CatalogEntry + Clone,
    D: DynamicTier<Item = T>,
{
    let direction = query.direction();
    let tiers = direction.tier_order();

    let (first, cursor_start) = match &query.cursor {
        Some(cursor) => {
            let position = resolve_cursor(static_tier, dynamic, cursor)?;
            let first = tiers
                .iter()
                .position(|tier| *tier == position.tier())
                .unwrap_or(0);
            (first, TierStart::Beyond(position))
        }
        None => (0, TierStart::Boundary(tiers[0])),
    };

    let limit = query.limit as usize;
    let mut items = Vec::new();
    for (visited, tier) in tiers[first..].iter().enumerate() {
        let start = if visited == 0 {
            cursor_start
        } else {
            TierStart::Boundary(*tier)
        };
        let remaining = limit - items.len();
        let mut fetched = query_tier_from(static_tier, dynamic, start, direction, remaining + 1)?;
        if fetched.len() > remaining {
            fetched.truncate(remaining);
            items.extend(fetched);
            return Ok(Page {
                items,
                has_more: true,
            });
        }
        items.extend(fetched);
    }

    Ok(Page {
        items,
        has_more: false,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        list_tiered, Cursor, Direction, DynamicTier, ListQuery, Page, DEFAULT_LIST_LIMIT,
    };
    use crate::model::catalog::{CatalogEntry, StaticCatalog};
    use crate::repo::{RepoError, RepoResult};
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(String);

    impl CatalogEntry for Entry {
        fn public_id(&self) -> &str {
            &self.0
        }
    }

    struct Rows {
        rows: Vec<(i64, &'static str)>,
        queries: Cell<usize>,
    }

    impl Rows {
        fn new(rows: Vec<(i64, &'static str)>) -> Self {
            Self {
                rows,
                queries: Cell::new(0),
            }
        }
    }

    impl DynamicTier for Rows {
        type Item = Entry;

        fn resolve(&self, public_id: &str) -> RepoResult<Option<i64>> {
            Ok(self
                .rows
                .iter()
                .find(|(_, name)| *name == public_id)
                .map(|(seq, _)| *seq))
        }

        fn query_from(
            &self,
            from: Option<i64>,
            direction: Direction,
            count: usize,
        ) -> RepoResult<Vec<Entry>> {
            self.queries.set(self.queries.get() + 1);
            let mut rows: Vec<_> = self
                .rows
                .iter()
                .filter(|(seq, _)| match (from, direction) {
                    (None, _) => true,
                    (Some(from), Direction::Ascending) => *seq > from,
                    (Some(from), Direction::Descending) => *seq < from,
                })
                .collect();
            rows.sort_by_key(|(seq, _)| *seq);
            if direction == Direction::Descending {
                rows.reverse();
            }
            Ok(rows
                .into_iter()
                .take(count)
                .map(|(_, name)| Entry(name.to_string()))
                .collect())
        }
    }

    fn statics() -> StaticCatalog<Entry> {
        StaticCatalog::new(vec![Entry("borg".into()), Entry("dead".into())])
    }

    fn dynamics() -> Rows {
        Rows::new(vec![(1, "foo"), (2, "bar"), (3, "baz")])
    }

    fn names(page: &Page<Entry>) -> Vec<&str> {
        page.items.iter().map(|entry| entry.0.as_str()).collect()
    }

    #[test]
    fn first_page_comes_from_dynamic_tier() {
        let page = list_tiered(&statics(), &dynamics(), &ListQuery::first(2)).unwrap();
        assert_eq!(names(&page), ["foo", "bar"]);
        assert!(page.has_more);
    }

    #[test]
    fn after_last_dynamic_crosses_into_static_tier() {
        let page = list_tiered(&statics(), &dynamics(), &ListQuery::after("baz", 5)).unwrap();
        assert_eq!(names(&page), ["borg", "dead"]);
        assert!(!page.has_more);
    }

    #[test]
    fn before_first_static_crosses_into_dynamic_tier() {
        let page = list_tiered(&statics(), &dynamics(), &ListQuery::before("borg", 1)).unwrap();
        assert_eq!(names(&page), ["baz"]);
        assert!(page.has_more);
    }

    #[test]
    fn overflowing_primary_tier_skips_secondary_tier() {
        let rows = dynamics();
        let page = list_tiered(&statics(), &rows, &ListQuery::first(2)).unwrap();
        assert!(page.has_more);
        assert_eq!(rows.queries.get(), 1);
    }

    #[test]
    fn after_static_entry_never_returns_dynamic_rows() {
        let page = list_tiered(&statics(), &dynamics(), &ListQuery::after("borg", 5)).unwrap();
        assert_eq!(names(&page), ["dead"]);
        assert!(!page.has_more);
    }

    #[test]
    fn zero_limit_reports_has_more_without_items() {
        let statics = statics();
        let rows = dynamics();
        let cases = [
            (ListQuery::first(0), true),
            (ListQuery::after("bar", 0), true),
            (ListQuery::before("bar", 0), true),
            (ListQuery::after("dead", 0), false),
            (ListQuery::before("foo", 0), false),
            (ListQuery::after("baz", 0), true),
        ];
        for (query, has_more) in cases {
            let page = list_tiered(&statics, &rows, &query).unwrap();
            assert!(page.items.is_empty(), "{query:?}");
            assert_eq!(page.has_more, has_more, "{query:?}");
        }
    }

    #[test]
    fn unknown_cursor_fails_in_both_directions() {
        for query in [ListQuery::after("nope", 3), ListQuery::before("nope", 3)] {
            let err = list_tiered(&statics(), &dynamics(), &query).unwrap_err();
            assert!(matches!(err, RepoError::CursorNotFound(ref cursor) if cursor.public_id() == "nope"));
        }
    }

    #[test]
    fn chaining_cursors_reproduces_total_order_both_ways() {
        let statics = statics();
        let rows = dynamics();
        let full = list_tiered(&statics, &rows, &ListQuery::first(100)).unwrap();
        let expected = names(&full);
        assert_eq!(expected, ["foo", "bar", "baz", "borg", "dead"]);

        let mut forward = Vec::new();
        let mut query = ListQuery::first(1);
        loop {
            let page = list_tiered(&statics, &rows, &query).unwrap();
            forward.extend(page.items.iter().map(|entry| entry.0.clone()));
            match (page.has_more, page.last_cursor()) {
                (true, Some(last)) => query = ListQuery::after(last, 1),
                _ => break,
            }
        }
        assert_eq!(forward, expected);

        let mut backward = vec![expected[expected.len() - 1].to_string()];
        let mut query = ListQuery::before(expected[expected.len() - 1], 1);
        loop {
            let page = list_tiered(&statics, &rows, &query).unwrap();
            backward.extend(page.items.iter().map(|entry| entry.0.clone()));
            match (page.has_more, page.last_cursor()) {
                (true, Some(last)) => query = ListQuery::before(last, 1),
                _ => break,
            }
        }
        let mut reversed: Vec<&str> = expected.clone();
        reversed.reverse();
        assert_eq!(backward, reversed);
    }

    #[test]
    fn has_more_matches_next_larger_limit_at_every_boundary() {
        let statics = statics();
        let rows = dynamics();
        let all = ["foo", "bar", "baz", "borg", "dead"];
        let mut cursors: Vec<Option<Cursor>> = vec![None];
        for name in all {
            cursors.push(Some(Cursor::After(name.to_string())));
            cursors.push(Some(Cursor::Before(name.to_string())));
        }

        for cursor in cursors {
            for k in 0..=6u32 {
                let small = ListQuery {
                    cursor: cursor.clone(),
                    limit: k,
                };
                let large = ListQuery {
                    cursor: cursor.clone(),
                    limit: k + 1,
                };
                let small_page = list_tiered(&statics, &rows, &small).unwrap();
                let large_page = list_tiered(&statics, &rows, &large).unwrap();
                assert_eq!(
                    small_page.has_more,
                    large_page.items.len() > small_page.items.len(),
                    "cursor={cursor:?} k={k}"
                );
                assert_eq!(
                    &large_page.items[..small_page.items.len()],
                    &small_page.items[..],
                    "cursor={cursor:?} k={k}"
                );
            }
        }
    }

    #[test]
    fn empty_static_tier_behaves_as_single_tier() {
        let page = list_tiered(
            &StaticCatalog::<Entry>::empty(),
            &dynamics(),
            &ListQuery::after("foo", 5),
        )
        .unwrap();
        assert_eq!(names(&page), ["bar", "baz"]);
        assert!(!page.has_more);
    }

    #[test]
    fn from_params_applies_defaults_and_rejects_conflicts() {
        let query = ListQuery::from_params(Some(String::new()), None, None).unwrap();
        assert_eq!(query, ListQuery::first(DEFAULT_LIST_LIMIT));

        let query = ListQuery::from_params(None, Some("x".into()), Some(3)).unwrap();
        assert_eq!(query.direction(), Direction::Descending);

        let err = ListQuery::from_params(Some("a".into()), Some("b".into()), None).unwrap_err();
        assert!(matches!(err, RepoError::ValidationFailure { .. }));

        let err = ListQuery::from_params(None, None, Some(101)).unwrap_err();
        assert!(matches!(err, RepoError::ValidationFailure { param: "limit", .. }));
    }
}
