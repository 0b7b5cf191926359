//! The reader state machine (spec §4.3).
//!
//! Parses and validates the header, streams PK addresses through a bounded
//! buffer to populate the [`RemapTable`], seeks per-SK payload, and hands
//! the translated payload to the caller's index builder. Any detected
//! corruption invalidates the reader: from then on `seek` returns `false`
//! and `resolve` returns `None`, so the caller falls back to a full index
//! rebuild instead of aborting recovery (spec §7).

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use uuid::Uuid;

use crate::entry::{EntryKey, EntryTable};
use crate::error::Result;
use crate::format;
use crate::remap::{RemapTable, TuplePtr};

const POINTER_WIDTH: usize = std::mem::size_of::<u64>();

/// Reads into `buf` until it's full or the file is at EOF, returning the
/// number of bytes actually read. Unlike `read_exact`, a short file is not
/// an error here — the caller decides what a partial fill means.
fn read_as_much_as_possible(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match file.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
    Ok(total)
}

/// The read side of a sort-data file.
pub struct Reader {
    file: Option<File>,
    fname: String,
    entries: EntryTable,
    active: Option<EntryKey>,
    remaining_in_current_entry: u64,
    buffer: Vec<u64>,
    buffer_size: usize,
    buffer_index: usize,
    buffer_capacity: usize,
    remap: RemapTable,
    valid: bool,
}

impl Reader {
    /// Opens `<dirname>/<signature>.sortdata` and parses its header.
    ///
    /// Returns `Ok(None)` whenever the file cannot be used as a sidecar —
    /// missing file, bad magic/version/entry grammar, or an instance UUID
    /// mismatch — since a failed sidecar must never block recovery, only
    /// slow it down (spec §7). `instance_uuid` may be [`Uuid::nil`] to skip
    /// the instance check.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Io`] only for filesystem failures
    /// unrelated to the sidecar's own format (e.g. the directory itself
    /// being unreadable).
    pub fn open(
        dirname: impl AsRef<Path>,
        signature: u64,
        instance_uuid: Uuid,
        buffer_capacity: usize,
    ) -> Result<Option<Self>> {
        let fname = dirname
            .as_ref()
            .join(format!("{signature:020}.sortdata"));
        let fname_display = fname.display().to_string();

        let file = match File::open(&fname) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        let parsed = match format::parse_header(file, &fname_display) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(file = %fname_display, %error, "memtx sort data file ignored");
                return Ok(None);
            }
        };

        if !instance_uuid.is_nil() && parsed.instance_uuid != instance_uuid {
            tracing::error!(
                file = %fname_display,
                found = %parsed.instance_uuid,
                expected = %instance_uuid,
                "sort data file instance UUID mismatch, ignored"
            );
            return Ok(None);
        }

        tracing::info!(file = %fname_display, "using the memtx sort data");

        Ok(Some(Self {
            file: Some(parsed.file),
            fname: fname_display,
            entries: parsed.entries,
            active: None,
            remaining_in_current_entry: 0,
            buffer: Vec::with_capacity(buffer_capacity.min(1 << 20)),
            buffer_size: 0,
            buffer_index: 0,
            buffer_capacity: buffer_capacity.max(1),
            remap: RemapTable::with_capacity(parsed.cardinality),
            valid: true,
        }))
    }

    /// Whether the reader is still usable. Once invalidated this is
    /// permanently `false`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn invalidate(&mut self, reason: &str) {
        tracing::error!(file = %self.fname, reason, "sort data reader invalidated");
        self.valid = false;
        self.active = None;
        self.file = None;
        self.remap.clear();
        self.entries.clear();
    }

    /// Seeks to the PK entry for `space_id` and prepares to stream its
    /// addresses. Returns `false` if there is no PK entry (or the reader
    /// is already invalid).
    pub fn space_init(&mut self, space_id: u32) -> bool {
        if !self.valid {
            return false;
        }
        let Some(entry) = self.entries.get(&EntryKey::pk(space_id)).copied() else {
            return false;
        };
        let Some(file) = self.file.as_mut() else {
            return false;
        };
        if file.seek(SeekFrom::Start(entry.offset)).is_err() {
            self.invalidate("PK seek failed");
            return false;
        }
        self.active = Some(entry.key);
        self.remaining_in_current_entry = entry.len;
        self.buffer_size = 0;
        self.buffer_index = 0;
        true
    }

    /// Publishes `old_ptr -> new_ptr` for the next address pulled off the
    /// PK stream. Called once per tuple, in PK order, by the snapshot's PK
    /// reader. A no-op if the reader is invalid or `space_init` was never
    /// called (or already exhausted its entry without error).
    pub fn add_pk_tuple(&mut self, new_ptr: TuplePtr) {
        if !self.valid || self.active.is_none() {
            return;
        }
        if self.buffer_index >= self.buffer_size && !self.refill_buffer() {
            return;
        }
        let old = TuplePtr(self.buffer[self.buffer_index]);
        self.buffer_index += 1;
        self.remap.insert(old, new_ptr);
    }

    // `remaining_in_current_entry` is the header's claim; the file may in
    // fact be shorter (spec §8 S4: a truncated PK stream). A short physical
    // read is therefore not immediately fatal — we hand back however many
    // whole pointer-sized values actually made it to disk, and only
    // invalidate once a refill can't produce even one more value while the
    // header still claims there should be one.
    fn refill_buffer(&mut self) -> bool {
        if self.remaining_in_current_entry == 0 {
            self.invalidate("PK stream exhausted before add_pk_tuple stopped");
            return false;
        }
        let to_read = self
            .buffer_capacity
            .min(usize::try_from(self.remaining_in_current_entry).unwrap_or(usize::MAX));

        let Some(file) = self.file.as_mut() else {
            return false;
        };
        let mut raw = vec![0u8; to_read * POINTER_WIDTH];
        let n = match read_as_much_as_possible(file, &mut raw) {
            Ok(n) => n,
            Err(_) => {
                self.invalidate("PK read failed");
                return false;
            }
        };
        let whole = n / POINTER_WIDTH;
        if whole == 0 {
            self.invalidate("PK stream truncated before header's claimed length");
            return false;
        }
        raw.truncate(whole * POINTER_WIDTH);

        self.buffer.clear();
        self.buffer.extend(
            raw.chunks_exact(POINTER_WIDTH)
                .map(|chunk| u64::from_ne_bytes(chunk.try_into().expect("chunk is 8 bytes"))),
        );
        self.remaining_in_current_entry -= whole as u64;
        self.buffer_size = whole;
        self.buffer_index = 0;
        true
    }

    /// Seeks to the `(space_id, index_id)` SK entry. Returns `false` if no
    /// such entry exists (a legitimate "this SK has no presorted data", not
    /// corruption) or the reader is already invalid.
    pub fn seek(&mut self, space_id: u32, index_id: u32) -> bool {
        if !self.valid {
            return false;
        }
        let key = EntryKey {
            space_id,
            index_id,
        };
        let Some(entry) = self.entries.get(&key).copied() else {
            return false;
        };
        let Some(file) = self.file.as_mut() else {
            return false;
        };
        if file.seek(SeekFrom::Start(entry.offset)).is_err() {
            self.invalidate("SK seek failed");
            return false;
        }
        self.active = Some(key);
        true
    }

    /// Byte length of the currently seeked entry's payload.
    ///
    /// # Panics
    ///
    /// Panics if no entry is active; callers must only invoke this after a
    /// successful `seek`/`space_init`.
    #[must_use]
    pub fn size(&self) -> u64 {
        let key = self.active.expect("size() called with no active entry");
        self.entries[&key].psize
    }

    /// Reads exactly `size()` bytes of the active entry's payload into
    /// `buf`. Returns `false` (and invalidates the reader) on a short
    /// read.
    ///
    /// # Panics
    ///
    /// Panics if no entry is active, or if `buf.len()` does not match
    /// `size()`.
    pub fn read(&mut self, buf: &mut [u8]) -> bool {
        let key = self.active.expect("read() called with no active entry");
        let expected = self.entries[&key].psize;
        assert_eq!(
            buf.len() as u64,
            expected,
            "read() buffer size must equal size()"
        );
        let Some(file) = self.file.as_mut() else {
            return false;
        };
        if file.read_exact(buf).is_err() {
            self.invalidate("SK payload read failed");
            return false;
        }
        true
    }

    /// Translates an old (save-time) tuple address into its freshly
    /// allocated new address. Returns `None` (and invalidates the reader)
    /// if `old_ptr` was never published via `add_pk_tuple`.
    pub fn resolve(&mut self, old_ptr: TuplePtr) -> Option<TuplePtr> {
        if !self.valid {
            return None;
        }
        match self.remap.get(old_ptr) {
            Some(new_ptr) => Some(new_ptr),
            None => {
                self.invalidate("unresolved tuple pointer");
                None
            }
        }
    }

    /// Releases remap entries scoped to `space_id`. The remap table is not
    /// partitioned by space (spec §9 notes the original only clears on
    /// invalidation too), so this is currently a documented no-op; callers
    /// should not rely on memory being reclaimed before the whole reader is
    /// dropped.
    pub fn space_free(&mut self, _space_id: u32) {}
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
