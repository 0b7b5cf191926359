//! The `(space_id, index_id)` entry registry shared by writer and reader.
//!
//! One [`Entry`] describes a single payload region in the sidecar file: the
//! PK entry for a space (`index_id == 0`) carries the address-remap stream,
//! every other entry carries one index's presorted payload.

use rustc_hash::FxHashMap;

/// Identifies one `(space, index)` payload region.
///
/// `index_id == 0` is reserved for the PK entry of `space_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    /// Space identifier.
    pub space_id: u32,
    /// Index identifier; `0` denotes the PK.
    pub index_id: u32,
}

impl EntryKey {
    /// Builds the key for a space's PK entry.
    #[must_use]
    pub const fn pk(space_id: u32) -> Self {
        Self {
            space_id,
            index_id: 0,
        }
    }

    /// Returns whether this key addresses a PK entry.
    #[must_use]
    pub const fn is_pk(self) -> bool {
        self.index_id == 0
    }
}

/// A header record describing one payload region.
///
/// The three `*_slot` fields are writer-only: they record the byte position
/// of the first digit of the corresponding fixed-width placeholder in the
/// header, so `commit` can seek back and overwrite it in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct Entry {
    /// Identifying key.
    pub key: EntryKey,
    /// Absolute file offset where the payload begins.
    pub offset: u64,
    /// Payload byte length.
    pub psize: u64,
    /// Tuple count carried by the payload.
    pub len: u64,
    /// Byte position of the `offset` placeholder in the header.
    pub offset_slot: u64,
    /// Byte position of the `psize` placeholder in the header.
    pub psize_slot: u64,
    /// Byte position of the `len` placeholder in the header.
    pub len_slot: u64,
    /// Set once `commit` has finalized this entry's fields.
    pub committed: bool,
}

impl Default for EntryKey {
    fn default() -> Self {
        Self {
            space_id: 0,
            index_id: 0,
        }
    }
}

impl Entry {
    /// Builds an unwritten entry for `key`.
    #[must_use]
    pub fn new(key: EntryKey) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }
}

/// In-memory map from entry key to entry record.
pub type EntryTable = FxHashMap<EntryKey, Entry>;

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
