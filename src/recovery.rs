//! The recovery driver (spec §4.5).
//!
//! Orchestrates, per space: PK tuple ingestion populates the remap table;
//! each SK then seeks, reads its run, and is handed to the index's
//! presort-build hook with every embedded tuple pointer already
//! translatable through `reader.resolve`. The snapshot's PK reader, the
//! tuple allocator, and the index builders are all external collaborators
//! (spec §1), so they are modeled here as a single `RecoveryHost` trait the
//! caller implements.

use crate::reader::Reader;
use crate::remap::TuplePtr;

/// Collaborators the recovery driver needs from the host engine. None of
/// these are implemented by this crate — the snapshot reader, tuple
/// allocator, and index data structures are all out of scope (spec §1).
pub trait RecoveryHost {
    /// Allocates the next tuple from the snapshot's PK stream for
    /// `space_id` and returns its freshly allocated address, or `None`
    /// once the space's PK stream is exhausted.
    fn next_pk_tuple(&mut self, space_id: u32) -> Option<TuplePtr>;

    /// Number of secondary indexes declared for `space_id`.
    fn sk_count(&mut self, space_id: u32) -> u32;

    /// Bulk-loads `index_id` of `space_id` from the reader's translated
    /// payload. Only called after `reader.seek` succeeded; the
    /// implementation is expected to call `reader.size()`/`reader.read()`
    /// and then walk the records, resolving each embedded pointer via
    /// `reader.resolve`.
    fn build_presorted(&mut self, space_id: u32, index_id: u32, reader: &mut Reader);

    /// Rebuilds `index_id` of `space_id` by inserting tuples one at a
    /// time, the conventional path used when no presorted data is
    /// available for this index.
    fn rebuild_conventionally(&mut self, space_id: u32, index_id: u32);
}

/// Recovers one space's secondary indexes, per spec §4.5's five steps.
///
/// If the reader has no PK entry for `space_id` (or is already invalid),
/// every SK of the space is rebuilt conventionally. Otherwise PK tuples are
/// ingested to populate the remap table, then each SK is either bulk-loaded
/// from its presorted run or rebuilt conventionally if no sort-data entry
/// exists for it (or the reader was invalidated mid-space).
pub fn recover_space(reader: &mut Reader, space_id: u32, host: &mut impl RecoveryHost) {
    if !reader.space_init(space_id) {
        let sk_count = host.sk_count(space_id);
        for index_id in 1..=sk_count {
            host.rebuild_conventionally(space_id, index_id);
        }
        return;
    }

    while reader.is_valid() {
        match host.next_pk_tuple(space_id) {
            Some(new_ptr) => reader.add_pk_tuple(new_ptr),
            None => break,
        }
    }

    let sk_count = host.sk_count(space_id);
    for index_id in 1..=sk_count {
        if reader.is_valid() && reader.seek(space_id, index_id) {
            host.build_presorted(space_id, index_id, reader);
        } else {
            host.rebuild_conventionally(space_id, index_id);
        }
    }

    reader.space_free(space_id);
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
