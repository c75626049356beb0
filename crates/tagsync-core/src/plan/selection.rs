//! Which changes a run may touch

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tagsync_tree::TagPath;

use crate::diff::{ChangeRecord, Operation};

type Predicate = Arc<dyn Fn(&ChangeRecord) -> bool + Send + Sync>;

/// Restricts a change set to what the caller asked for.
///
/// Changes outside the selection are left untouched on the destination.
#[derive(Clone)]
pub enum SelectionPolicy {
    /// Paths at or below any of these prefixes. An empty set selects
    /// nothing.
    Prefixes(BTreeSet<TagPath>),
    /// Arbitrary filter over records.
    Predicate(Predicate),
}

impl SelectionPolicy {
    /// Every change.
    pub fn all() -> Self {
        Self::Prefixes(BTreeSet::from([TagPath::root()]))
    }

    /// No change at all.
    pub fn none() -> Self {
        Self::Prefixes(BTreeSet::new())
    }

    pub fn prefixes(prefixes: impl IntoIterator<Item = TagPath>) -> Self {
        Self::Prefixes(prefixes.into_iter().collect())
    }

    /// Parse `/`-separated prefixes.
    pub fn parse<'a>(prefixes: impl IntoIterator<Item = &'a str>) -> tagsync_tree::Result<Self> {
        prefixes
            .into_iter()
            .map(TagPath::parse)
            .collect::<tagsync_tree::Result<BTreeSet<_>>>()
            .map(Self::Prefixes)
    }

    pub fn predicate(filter: impl Fn(&ChangeRecord) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(filter))
    }

    /// Whether a path lies inside a prefix selection. Predicate selections
    /// only judge whole records and answer `false`.
    pub fn covers(&self, path: &TagPath) -> bool {
        match self {
            Self::Prefixes(prefixes) => prefixes.iter().any(|prefix| path.starts_with(prefix)),
            Self::Predicate(_) => false,
        }
    }

    /// Whether `record` is selected. A Move needs both its target and its
    /// origin inside a prefix selection.
    pub fn selects(&self, record: &ChangeRecord) -> bool {
        match self {
            Self::Prefixes(_) => match (record.operation, &record.origin) {
                (Operation::Move, Some(origin)) => self.covers(&record.path) && self.covers(origin),
                _ => self.covers(&record.path),
            },
            Self::Predicate(filter) => filter(record),
        }
    }

    /// Whether nothing can be selected.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Prefixes(prefixes) if prefixes.is_empty())
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefixes(prefixes) => f.debug_tuple("Prefixes").field(prefixes).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
