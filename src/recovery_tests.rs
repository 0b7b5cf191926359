//! Tests for the recovery driver.

use std::collections::VecDeque;

use tempfile::tempdir;
use uuid::Uuid;

use super::{recover_space, RecoveryHost};
use crate::entry::EntryKey;
use crate::reader::Reader;
use crate::remap::TuplePtr;
use crate::writer::Writer;

fn uuid() -> Uuid {
    Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap()
}

struct MockHost {
    new_ptrs: VecDeque<TuplePtr>,
    sk_count: u32,
    presorted_built: Vec<u32>,
    conventionally_built: Vec<u32>,
    resolved: Vec<(u32, Option<TuplePtr>)>,
}

impl RecoveryHost for MockHost {
    fn next_pk_tuple(&mut self, _space_id: u32) -> Option<TuplePtr> {
        self.new_ptrs.pop_front()
    }

    fn sk_count(&mut self, _space_id: u32) -> u32 {
        self.sk_count
    }

    fn build_presorted(&mut self, _space_id: u32, index_id: u32, reader: &mut Reader) {
        self.presorted_built.push(index_id);
        let size = reader.size();
        let mut buf = vec![0u8; size as usize];
        assert!(reader.read(&mut buf));
        let old_ptr = TuplePtr(u64::from_ne_bytes(buf[..8].try_into().unwrap()));
        let new_ptr = reader.resolve(old_ptr);
        self.resolved.push((index_id, new_ptr));
    }

    fn rebuild_conventionally(&mut self, _space_id: u32, index_id: u32) {
        self.conventionally_built.push(index_id);
    }
}

fn write_space_with_one_sk(dir: &std::path::Path, signature: u64) {
    let mut writer = Writer::new(
        vec![
            EntryKey::pk(512),
            EntryKey {
                space_id: 512,
                index_id: 1,
            },
        ],
        dir,
        signature,
        uuid(),
    );
    writer.open().unwrap();
    writer.begin_pk(512).unwrap();
    writer.put_pk_tuple(0x1000u64.into()).unwrap();
    writer.put_pk_tuple(0x1008u64.into()).unwrap();
    writer.commit_pk().unwrap();
    writer.begin(512, 1).unwrap();
    writer.put(&0x1000u64.to_ne_bytes(), 8, 1).unwrap();
    writer.commit().unwrap();
    writer.close().unwrap();
    writer.materialize().unwrap();
}

#[test]
fn test_recover_space_builds_presorted_and_resolves() {
    let dir = tempdir().unwrap();
    write_space_with_one_sk(dir.path(), 1);

    let mut reader = Reader::open(dir.path(), 1, uuid(), 1024).unwrap().unwrap();
    let mut host = MockHost {
        new_ptrs: VecDeque::from([TuplePtr(0xA), TuplePtr(0xB)]),
        sk_count: 1,
        presorted_built: Vec::new(),
        conventionally_built: Vec::new(),
        resolved: Vec::new(),
    };

    recover_space(&mut reader, 512, &mut host);

    assert_eq!(host.presorted_built, vec![1]);
    assert!(host.conventionally_built.is_empty());
    assert_eq!(host.resolved, vec![(1, Some(TuplePtr(0xA)))]);
}

#[test]
fn test_recover_space_falls_back_when_no_pk_entry() {
    let dir = tempdir().unwrap();
    write_space_with_one_sk(dir.path(), 2);

    let mut reader = Reader::open(dir.path(), 2, uuid(), 1024).unwrap().unwrap();
    let mut host = MockHost {
        new_ptrs: VecDeque::new(),
        sk_count: 2,
        presorted_built: Vec::new(),
        conventionally_built: Vec::new(),
        resolved: Vec::new(),
    };

    // Space 999 has no entries in this file.
    recover_space(&mut reader, 999, &mut host);

    assert!(host.presorted_built.is_empty());
    assert_eq!(host.conventionally_built, vec![1, 2]);
}

#[test]
fn test_recover_space_falls_back_to_conventional_for_missing_sk() {
    let dir = tempdir().unwrap();
    // Only a PK entry this time, no SK entries at all.
    let mut writer = Writer::new(vec![EntryKey::pk(700)], dir.path(), 3, uuid());
    writer.open().unwrap();
    writer.begin_pk(700).unwrap();
    writer.put_pk_tuple(0x2000u64.into()).unwrap();
    writer.commit_pk().unwrap();
    writer.close().unwrap();
    writer.materialize().unwrap();

    let mut reader = Reader::open(dir.path(), 3, uuid(), 1024).unwrap().unwrap();
    let mut host = MockHost {
        new_ptrs: VecDeque::from([TuplePtr(0xC)]),
        sk_count: 1,
        presorted_built: Vec::new(),
        conventionally_built: Vec::new(),
        resolved: Vec::new(),
    };

    recover_space(&mut reader, 700, &mut host);

    assert!(host.presorted_built.is_empty());
    assert_eq!(host.conventionally_built, vec![1]);
}
