//! The old→new tuple-pointer remap table (spec §4.4).
//!
//! Keys are addresses captured at snapshot-save time; values are the
//! addresses freshly allocated for the same tuples at recovery time. The
//! table is pre-reserved to the file header's `Cardinality` so the
//! PK-streaming insert path never triggers a rehash.

use rustc_hash::FxHashMap;

/// An opaque tuple address. The sort-data file is host-defined and not
/// portable across instances (spec §6), so this wraps a raw `u64` rather
/// than modeling pointer provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TuplePtr(pub u64);

impl From<u64> for TuplePtr {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<TuplePtr> for u64 {
    fn from(value: TuplePtr) -> Self {
        value.0
    }
}

/// Old-address → new-address map, sized from the header's cardinality.
#[derive(Debug, Default)]
pub struct RemapTable {
    map: FxHashMap<TuplePtr, TuplePtr>,
}

impl RemapTable {
    /// Creates an empty table pre-reserved for `cardinality` entries.
    #[must_use]
    pub fn with_capacity(cardinality: u64) -> Self {
        let mut map = FxHashMap::default();
        let reserve = usize::try_from(cardinality).unwrap_or(usize::MAX);
        map.reserve(reserve);
        Self { map }
    }

    /// Publishes `old -> new`. A collision on `old` overwrites silently:
    /// the snapshot cannot legitimately have two distinct tuples at the
    /// same address, so a collision already indicates corruption the
    /// caller should have caught elsewhere (spec §4.4).
    pub fn insert(&mut self, old: TuplePtr, new: TuplePtr) {
        self.map.insert(old, new);
    }

    /// Looks up the new address for `old`.
    #[must_use]
    pub fn get(&self, old: TuplePtr) -> Option<TuplePtr> {
        self.map.get(&old).copied()
    }

    /// Number of published mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Drops all entries, releasing the backing allocation.
    pub fn clear(&mut self) {
        self.map = FxHashMap::default();
    }
}

#[cfg(test)]
#[path = "remap_tests.rs"]
mod tests;
