//! The writer state machine (spec §4.2).
//!
//! `Fresh → Open → (Writing ↔ Idle)* → Closed → Materialized | Discarded`.
//! The writer owns an `.inprogress` file until [`Writer::materialize`]
//! atomically renames it to its final name; any error before that point is
//! handled by the caller invoking [`Writer::discard`], which unlinks the
//! partial file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::entry::{Entry, EntryKey, EntryTable};
use crate::error::{Error, Result};
use crate::format;
use crate::remap::TuplePtr;

/// Whether an index's owning engine supports presort dumps.
///
/// Only `Memtx` indexes can ever produce a sort-data entry; encountering
/// any other engine short-circuits the rest of that space's scan, matching
/// the original's "first non-memtx SK skips the whole space" policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    /// The in-memory (`memtx`) storage engine.
    Memtx,
    /// Any other engine (e.g. a disk-based one).
    Other,
}

/// One secondary index as seen during entry-set construction.
#[derive(Debug, Clone, Copy)]
pub struct IndexDescriptor {
    /// Index identifier; `0` is reserved for the PK and should not appear
    /// in a space's `indexes` list.
    pub index_id: u32,
    /// Owning storage engine.
    pub engine: Engine,
    /// Whether the index's read view exposes a `dump_sort_data` hook.
    pub supports_presort: bool,
}

/// One space as seen during entry-set construction, in the order the
/// snapshot's read view produces it.
#[derive(Debug, Clone)]
pub struct SpaceDescriptor {
    /// Space identifier.
    pub space_id: u32,
    /// System spaces are never given sort-data entries.
    pub is_system: bool,
    /// Secondary indexes, in ascending `index_id` order (PK excluded).
    pub indexes: Vec<IndexDescriptor>,
}

/// Builds the set of entries a writer should register, per spec §4.2:
/// system spaces are skipped; a non-`Memtx` index short-circuits the rest
/// of its space; an index with no presort hook is skipped but does not
/// stop the scan; the PK entry is added only if at least one SK entry was
/// added for that space.
#[must_use]
pub fn scan_entries(spaces: impl IntoIterator<Item = SpaceDescriptor>) -> Vec<EntryKey> {
    let mut out = Vec::new();
    for space in spaces {
        if space.is_system {
            continue;
        }
        let mut added_sk = false;
        for index in &space.indexes {
            if index.engine != Engine::Memtx {
                break;
            }
            if !index.supports_presort {
                continue;
            }
            out.push(EntryKey {
                space_id: space.space_id,
                index_id: index.index_id,
            });
            added_sk = true;
        }
        if added_sk {
            out.push(EntryKey::pk(space.space_id));
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Open,
    Closed,
    Materialized,
    Discarded,
}

/// Drives the write side of a sort-data file.
pub struct Writer {
    dirname: PathBuf,
    final_path: PathBuf,
    inprogress_path: PathBuf,
    instance_uuid: Uuid,
    file: Option<File>,
    entries: EntryTable,
    active: Option<EntryKey>,
    cardinality: u64,
    cardinality_slot: u64,
    state: State,
    /// Set once a seek fails mid-`begin`; every subsequent `begin` is then
    /// a guaranteed no-op (spec §4.1: "the whole container is invalidated").
    poisoned: bool,
}

impl Writer {
    /// Builds a writer for the given entry set. No entries may be added
    /// after this point (spec §3 invariant).
    #[must_use]
    pub fn new(
        entries: impl IntoIterator<Item = EntryKey>,
        dirname: impl Into<PathBuf>,
        signature: u64,
        instance_uuid: Uuid,
    ) -> Self {
        let dirname = dirname.into();
        let file_stem = format!("{signature:020}.sortdata");
        let final_path = dirname.join(&file_stem);
        let inprogress_path = dirname.join(format!("{file_stem}.inprogress"));

        let mut table = EntryTable::default();
        for key in entries {
            table.insert(key, Entry::new(key));
        }

        Self {
            dirname,
            final_path,
            inprogress_path,
            instance_uuid,
            file: None,
            entries: table,
            active: None,
            cardinality: 0,
            cardinality_slot: 0,
            state: State::Fresh,
            poisoned: false,
        }
    }

    /// Creates the `.inprogress` file and writes the zeroed header
    /// skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on filesystem failure.
    pub fn open(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, State::Fresh, "Writer::open called twice");
        fs::create_dir_all(&self.dirname)?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&self.inprogress_path)?;

        let entries = std::mem::take(&mut self.entries);
        let (cardinality_slot, entries) = format::write_skeleton(
            &mut file,
            env!("CARGO_PKG_VERSION"),
            self.instance_uuid,
            entries,
        )?;
        self.entries = entries;
        self.cardinality_slot = cardinality_slot;
        self.file = Some(file);
        self.state = State::Open;
        tracing::debug!(path = %self.inprogress_path.display(), entries = self.entries.len(), "sort data writer opened");
        Ok(())
    }

    /// Begins a PK entry for `space_id`. Equivalent to
    /// `begin(space_id, 0)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the underlying seek fails for a reason
    /// other than the invalidation path described in spec §4.1.
    pub fn begin_pk(&mut self, space_id: u32) -> Result<bool> {
        self.begin(space_id, 0)
    }

    /// Begins an entry for `(space_id, index_id)`. Returns `false` if the
    /// entry was never registered (not an error: the caller should treat
    /// this as "this index is not included").
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] only if writing has already been invalidated
    /// in a way that must be surfaced; transient seek failures invalidate
    /// the writer and return `Ok(false)` per spec §4.1.
    pub fn begin(&mut self, space_id: u32, index_id: u32) -> Result<bool> {
        debug_assert!(self.active.is_none(), "Writer::begin called while an entry is active");
        if self.poisoned {
            return Ok(false);
        }

        let key = EntryKey {
            space_id,
            index_id,
        };
        if !self.entries.contains_key(&key) {
            return Ok(false);
        }

        let file = self.file.as_mut().expect("open() called before begin()");
        let offset = match seek_end(file) {
            Ok(offset) => offset,
            Err(_) => {
                tracing::error!(
                    space_id,
                    index_id,
                    "sort data seek failed, writer invalidated"
                );
                self.poisoned = true;
                return Ok(false);
            }
        };

        let entry = self.entries.get_mut(&key).expect("checked contains_key above");
        entry.offset = offset;
        entry.psize = 0;
        entry.len = 0;
        self.active = Some(key);
        Ok(true)
    }

    /// Appends `elem_count` elements of `elem_size` bytes each from `bytes`
    /// to the active entry. A no-op if no entry is active, so callers may
    /// emit SK payload unconditionally without checking `begin`'s result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write is short.
    pub fn put(&mut self, bytes: &[u8], elem_size: u64, elem_count: u64) -> Result<()> {
        let Some(key) = self.active else {
            return Ok(());
        };
        let file = self.file.as_mut().expect("open() called before put()");
        file.write_all_checked(bytes)?;

        let entry = self.entries.get_mut(&key).expect("active key is always registered");
        entry.psize += elem_size * elem_count;
        entry.len += elem_count;
        Ok(())
    }

    /// Appends a single PK tuple address to the active PK entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write is short.
    pub fn put_pk_tuple(&mut self, tuple_ptr: TuplePtr) -> Result<()> {
        // Pointer byte order is host-defined (spec §6): the file is never
        // read back on a different instance, so native order avoids a
        // needless byte swap on the hot PK-streaming path.
        self.put(&tuple_ptr.0.to_ne_bytes(), 8, 1)
    }

    /// Backpatches the active entry's header placeholders and clears it.
    /// A no-op if no entry is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a backpatch seek/write fails.
    pub fn commit(&mut self) -> Result<()> {
        let Some(key) = self.active.take() else {
            return Ok(());
        };
        let file = self.file.as_mut().expect("open() called before commit()");
        let entry = *self.entries.get(&key).expect("active key is always registered");

        format::backpatch_hex16(file, entry.offset_slot, entry.offset)?;
        format::backpatch_hex16(file, entry.psize_slot, entry.psize)?;
        format::backpatch_dec20(file, entry.len_slot, entry.len)?;

        if key.is_pk() {
            self.cardinality += entry.len;
        }

        let entry = self.entries.get_mut(&key).expect("active key is always registered");
        entry.committed = true;
        Ok(())
    }

    /// Equivalent to `commit()`, named for symmetry with [`Writer::begin_pk`].
    ///
    /// # Errors
    ///
    /// See [`Writer::commit`].
    pub fn commit_pk(&mut self) -> Result<()> {
        self.commit()
    }

    /// Backpatches the cardinality placeholder and closes the file handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on filesystem failure.
    pub fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            format::backpatch_dec20(file, self.cardinality_slot, self.cardinality)?;
            file.sync_all()?;
        }
        self.file = None;
        self.state = State::Closed;
        tracing::debug!(cardinality = self.cardinality, "sort data writer closed");
        Ok(())
    }

    /// Atomically renames the `.inprogress` file to its final name. Until
    /// this returns successfully, no file named without the
    /// `.inprogress` suffix exists (spec §8, property 6).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on filesystem failure.
    pub fn materialize(&mut self) -> Result<()> {
        debug_assert_eq!(self.state, State::Closed, "materialize() called before close()");
        fs::rename(&self.inprogress_path, &self.final_path)?;
        self.state = State::Materialized;
        tracing::info!(path = %self.final_path.display(), "sort data file materialized");
        Ok(())
    }

    /// Closes (if needed) and unlinks the in-progress file. Idempotent:
    /// safe to call even if nothing was ever written.
    pub fn discard(&mut self) {
        self.file = None;
        if let Err(error) = fs::remove_file(&self.inprogress_path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.inprogress_path.display(), %error, "failed to discard sort data file");
            }
        }
        self.state = State::Discarded;
    }

    /// The final (post-materialize) path this writer targets.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }
}

fn seek_end(file: &mut File) -> std::io::Result<u64> {
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::End(0))
}

/// Small helper so `put`'s short-write case reports the right error kind
/// without pulling in a generic `io::Write` bound at the call site.
trait WriteAllChecked {
    fn write_all_checked(&mut self, bytes: &[u8]) -> Result<()>;
}

impl WriteAllChecked for File {
    fn write_all_checked(&mut self, bytes: &[u8]) -> Result<()> {
        use std::io::Write;
        self.write_all(bytes).map_err(Error::Io)
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
