//! Tests for the writer state machine.

use tempfile::tempdir;
use uuid::Uuid;

use super::{scan_entries, Engine, IndexDescriptor, SpaceDescriptor, Writer};
use crate::entry::EntryKey;

fn uuid() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

#[test]
fn test_scan_entries_skips_system_spaces() {
    let spaces = vec![SpaceDescriptor {
        space_id: 280,
        is_system: true,
        indexes: vec![IndexDescriptor {
            index_id: 1,
            engine: Engine::Memtx,
            supports_presort: true,
        }],
    }];
    assert!(scan_entries(spaces).is_empty());
}

#[test]
fn test_scan_entries_adds_pk_only_when_sk_added() {
    let spaces = vec![SpaceDescriptor {
        space_id: 512,
        is_system: false,
        indexes: vec![IndexDescriptor {
            index_id: 1,
            engine: Engine::Memtx,
            supports_presort: false,
        }],
    }];
    assert!(scan_entries(spaces).is_empty());
}

#[test]
fn test_scan_entries_short_circuits_on_non_memtx_index() {
    let spaces = vec![SpaceDescriptor {
        space_id: 512,
        is_system: false,
        indexes: vec![
            IndexDescriptor {
                index_id: 1,
                engine: Engine::Other,
                supports_presort: true,
            },
            IndexDescriptor {
                index_id: 2,
                engine: Engine::Memtx,
                supports_presort: true,
            },
        ],
    }];
    assert!(scan_entries(spaces).is_empty());
}

#[test]
fn test_scan_entries_full_space() {
    let spaces = vec![SpaceDescriptor {
        space_id: 512,
        is_system: false,
        indexes: vec![IndexDescriptor {
            index_id: 1,
            engine: Engine::Memtx,
            supports_presort: true,
        }],
    }];
    let entries = scan_entries(spaces);
    assert_eq!(entries.len(), 2);
    assert!(entries.contains(&EntryKey::pk(512)));
    assert!(entries.contains(&EntryKey {
        space_id: 512,
        index_id: 1
    }));
}

#[test]
fn test_begin_on_unregistered_entry_returns_false() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(1)], dir.path(), 7, uuid());
    writer.open().unwrap();
    assert!(!writer.begin(99, 0).unwrap());
    writer.close().unwrap();
}

#[test]
fn test_put_without_begin_is_noop() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(1)], dir.path(), 7, uuid());
    writer.open().unwrap();
    writer.put(b"ignored", 1, 7).unwrap();
    writer.close().unwrap();
}

#[test]
fn test_commit_without_begin_is_noop() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(1)], dir.path(), 7, uuid());
    writer.open().unwrap();
    writer.commit().unwrap();
    writer.close().unwrap();
}

#[test]
fn test_full_lifecycle_materializes_file_without_inprogress_suffix() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(512)], dir.path(), 42, uuid());
    writer.open().unwrap();
    assert!(writer.begin_pk(512).unwrap());
    writer.put_pk_tuple(0x1000u64.into()).unwrap();
    writer.commit_pk().unwrap();
    writer.close().unwrap();
    writer.materialize().unwrap();

    let final_path = dir.path().join("00000000000000000042.sortdata");
    let inprogress_path = dir.path().join("00000000000000000042.sortdata.inprogress");
    assert!(final_path.exists());
    assert!(!inprogress_path.exists());
}

#[test]
fn test_discard_leaves_no_file_on_disk() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(512)], dir.path(), 42, uuid());
    writer.open().unwrap();
    writer.begin_pk(512).unwrap();
    writer.put_pk_tuple(0x1000u64.into()).unwrap();
    writer.commit_pk().unwrap();
    writer.discard();

    let inprogress_path = dir.path().join("00000000000000000042.sortdata.inprogress");
    let final_path = dir.path().join("00000000000000000042.sortdata");
    assert!(!inprogress_path.exists());
    assert!(!final_path.exists());
}

#[test]
fn test_no_final_file_exists_before_materialize() {
    let dir = tempdir().unwrap();
    let mut writer = Writer::new(vec![EntryKey::pk(512)], dir.path(), 42, uuid());
    writer.open().unwrap();
    writer.begin_pk(512).unwrap();
    writer.commit_pk().unwrap();
    writer.close().unwrap();

    let final_path = dir.path().join("00000000000000000042.sortdata");
    assert!(!final_path.exists());
    writer.materialize().unwrap();
    assert!(final_path.exists());
}
