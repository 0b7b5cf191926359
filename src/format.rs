//! The §4.1 text-header / binary-payload container codec.
//!
//! A sort-data file opens with a small ASCII header (magic, version,
//! `Instance`, `Cardinality`, an `Entries` count, then one line per entry)
//! terminated by a blank line, followed by the raw payload region. Three
//! header fields are written as fixed-width placeholders — `offset`/`psize`
//! as 16 lowercase hex digits, `len`/`Cardinality` as 20 decimal digits — so
//! the writer can seek back and overwrite them once the real values are
//! known, instead of buffering the whole header in memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};

use uuid::Uuid;

use crate::entry::{Entry, EntryKey, EntryTable};
use crate::error::{Error, Result};

pub(crate) const MAGIC: &str = "SORTDATA\n";
pub(crate) const VERSION_LINE: &str = "1\n";

fn hex16(value: u64) -> String {
    format!("{value:016x}")
}

fn dec20(value: u64) -> String {
    format!("{value:020}")
}

/// Writes `s` at the current position and returns the position past it.
fn emit(file: &mut File, pos: u64, s: &str) -> Result<u64> {
    file.write_all(s.as_bytes())?;
    Ok(pos + s.len() as u64)
}

/// Writes the header skeleton (zeroed placeholders) and returns the byte
/// offset of the `Cardinality` placeholder, plus the entry table with its
/// writer-only slot fields filled in.
pub(crate) fn write_skeleton(
    file: &mut File,
    version: &str,
    instance_uuid: Uuid,
    mut entries: EntryTable,
) -> Result<(u64, EntryTable)> {
    let mut pos: u64 = 0;

    pos = emit(file, pos, MAGIC)?;
    pos = emit(file, pos, VERSION_LINE)?;
    pos = emit(file, pos, &format!("Version: {version}\n"))?;
    pos = emit(file, pos, &format!("Instance: {instance_uuid}\n"))?;

    pos = emit(file, pos, "Cardinality: ")?;
    let cardinality_slot = pos;
    pos = emit(file, pos, &format!("{}\n", dec20(0)))?;

    let mut keys: Vec<EntryKey> = entries.keys().copied().collect();
    keys.sort_by_key(|k| (k.space_id, k.index_id));

    pos = emit(file, pos, &format!("Entries: {}\n", keys.len()))?;

    for key in &keys {
        pos = emit(file, pos, &format!("{}/{}: ", key.space_id, key.index_id))?;

        let offset_slot = pos;
        pos = emit(file, pos, &format!("{}, ", hex16(0)))?;

        let psize_slot = pos;
        pos = emit(file, pos, &format!("{}, ", hex16(0)))?;

        let len_slot = pos;
        pos = emit(file, pos, &format!("{}\n", dec20(0)))?;

        let entry = entries.get_mut(key).expect("key came from this map");
        entry.offset_slot = offset_slot;
        entry.psize_slot = psize_slot;
        entry.len_slot = len_slot;
    }

    emit(file, pos, "\n")?;

    Ok((cardinality_slot, entries))
}

/// Reads one line into `line`, replacing its previous contents.
fn read_line(reader: &mut BufReader<File>, line: &mut String) -> Result<usize> {
    line.clear();
    let n = reader.read_line(line)?;
    Ok(n)
}

/// Overwrites a 16-hex-digit placeholder in place.
pub(crate) fn backpatch_hex16(file: &mut File, slot: u64, value: u64) -> Result<()> {
    file.seek(SeekFrom::Start(slot))?;
    file.write_all(hex16(value).as_bytes())?;
    Ok(())
}

/// Overwrites a 20-decimal-digit placeholder in place.
pub(crate) fn backpatch_dec20(file: &mut File, slot: u64, value: u64) -> Result<()> {
    file.seek(SeekFrom::Start(slot))?;
    file.write_all(dec20(value).as_bytes())?;
    Ok(())
}

/// Result of a successful header parse.
pub(crate) struct ParsedHeader {
    pub(crate) instance_uuid: Uuid,
    pub(crate) cardinality: u64,
    pub(crate) entries: EntryTable,
    /// The file handle, cursor positioned at the start of the payload
    /// region (right after the header's blank line).
    pub(crate) file: File,
}

/// Parses the header of an open file, leaving the file's cursor positioned
/// exactly at the start of the payload region (right after the blank line).
pub(crate) fn parse_header(file: File, fname: &str) -> Result<ParsedHeader> {
    let mut reader = BufReader::new(file);
    let mut pos: u64 = 0;
    let mut line = String::new();

    let n = read_line(&mut reader, &mut line)?;
    pos += n as u64;
    if n == 0 || line != MAGIC {
        return Err(Error::Malformed(format!("{fname}: file magic is invalid")));
    }
    let n = read_line(&mut reader, &mut line)?;
    pos += n as u64;
    if n == 0 || line != VERSION_LINE {
        return Err(Error::Malformed(format!(
            "{fname}: file version is unsupported"
        )));
    }

    let mut instance_uuid = Uuid::nil();
    let mut cardinality: u64 = 0;
    let mut entries = EntryTable::default();
    let mut expected_entries: u64 = 0;
    let mut saw_entries_key = false;

    loop {
        let n = read_line(&mut reader, &mut line)?;
        pos += n as u64;
        if n == 0 {
            return Err(Error::Malformed(format!(
                "{fname}: header ended before blank line"
            )));
        }

        if let Some(rest) = line.strip_prefix("Version: ") {
            let _ = rest;
            continue;
        }
        if let Some(rest) = line.strip_prefix("Instance: ") {
            let uuid_str = rest.trim_end_matches('\n');
            instance_uuid = Uuid::parse_str(uuid_str)
                .map_err(|_| Error::Malformed(format!("{fname}: invalid UUID")))?;
            continue;
        }
        if let Some(rest) = line.strip_prefix("Cardinality: ") {
            let digits = rest.trim_end_matches('\n');
            cardinality = digits
                .parse()
                .map_err(|_| Error::Malformed(format!("{fname}: invalid cardinality: {line}")))?;
            continue;
        }
        if let Some(rest) = line.strip_prefix("Entries: ") {
            let digits = rest.trim_end_matches('\n');
            expected_entries = digits
                .parse()
                .map_err(|_| Error::Malformed(format!("{fname}: invalid entry count: {line}")))?;
            saw_entries_key = true;
            continue;
        }
        if saw_entries_key && expected_entries > 0 {
            expected_entries -= 1;
            match parse_entry_line(&line) {
                Some(entry) => {
                    if (entry.len == 0) != (entry.psize == 0) {
                        return Err(Error::Malformed(format!(
                            "{fname}: entry size verification failed: {line}"
                        )));
                    }
                    entries.insert(entry.key, entry);
                }
                None => {
                    tracing::warn!(file = fname, line = line.trim_end(), "sort data entry line malformed, skipped");
                }
            }
            continue;
        }
        if line == "\n" {
            break;
        }
    }

    let mut file = reader.into_inner();
    file.seek(SeekFrom::Start(pos))?;

    Ok(ParsedHeader {
        instance_uuid,
        cardinality,
        entries,
        file,
    })
}

/// Parses one `<space>/<index>: <offset>, <psize>, <len>\n` line.
///
/// Returns `None` on any deviation from the exact separator grammar; the
/// caller logs a warning and skips the line rather than rejecting the
/// whole file.
fn parse_entry_line(line: &str) -> Option<Entry> {
    let (space_part, rest) = line.split_once('/')?;
    let space_id: u32 = space_part.parse().ok()?;

    let (index_part, rest) = rest.split_once(": ")?;
    let index_id: u32 = index_part.parse().ok()?;

    let (offset_part, rest) = rest.split_once(", ")?;
    let offset = u64::from_str_radix(offset_part, 16).ok()?;

    let (psize_part, rest) = rest.split_once(", ")?;
    let psize = u64::from_str_radix(psize_part, 16).ok()?;

    let len_part = rest.trim_end_matches('\n');
    let len: u64 = len_part.parse().ok()?;

    Some(Entry {
        key: EntryKey {
            space_id,
            index_id,
        },
        offset,
        psize,
        len,
        ..Entry::default()
    })
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
