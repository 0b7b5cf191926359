//! Tests for the entry registry.

use super::{Entry, EntryKey};

#[test]
fn test_pk_key_has_zero_index() {
    let key = EntryKey::pk(512);
    assert_eq!(key.space_id, 512);
    assert_eq!(key.index_id, 0);
    assert!(key.is_pk());
}

#[test]
fn test_non_pk_key_is_not_pk() {
    let key = EntryKey {
        space_id: 512,
        index_id: 1,
    };
    assert!(!key.is_pk());
}

#[test]
fn test_keys_beyond_256_index_id_do_not_collide() {
    // The original's (space_id << 8) | index_id hash collides here;
    // the derived Hash/Eq must not.
    let a = EntryKey {
        space_id: 1,
        index_id: 256,
    };
    let b = EntryKey {
        space_id: 2,
        index_id: 0,
    };
    assert_ne!(a, b);
}

#[test]
fn test_new_entry_is_zeroed_and_uncommitted() {
    let entry = Entry::new(EntryKey::pk(7));
    assert_eq!(entry.offset, 0);
    assert_eq!(entry.psize, 0);
    assert_eq!(entry.len, 0);
    assert!(!entry.committed);
}
