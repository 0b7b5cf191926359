//! # sortdata
//!
//! Presorted secondary-index sidecar file for an in-memory database
//! engine's point-in-time snapshot.
//!
//! At snapshot time the engine already serializes primary-key tuples in
//! sorted order; without this sidecar, secondary indexes would have to be
//! rebuilt on startup by re-inserting every tuple into each index — an
//! `O(N log N)` operation repeated per index. This crate records, alongside
//! the snapshot, the sorted leaf arrangement of each secondary index and a
//! primary-key tuple-address table that lets recovery translate addresses
//! captured at save time into freshly allocated addresses at load time.
//! With the sidecar present, indexes are rebuilt by bulk-loading
//! pre-sorted runs — linear streaming instead of per-tuple insertion.
//!
//! ## What this crate does *not* do
//!
//! The snapshot reader/writer, the tuple allocator and tuple-format
//! decoding, individual index data structures (B-tree/hash), space/schema
//! metadata, the scheduling runtime, and CLI/host-language bindings are all
//! external collaborators. This crate exposes narrow traits and closures at
//! those seams rather than reimplementing them.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use sortdata::entry::EntryKey;
//! use sortdata::writer::Writer;
//! use sortdata::reader::Reader;
//! use uuid::Uuid;
//!
//! # fn main() -> sortdata::error::Result<()> {
//! let instance = Uuid::new_v4();
//! let mut writer = Writer::new(vec![EntryKey::pk(512)], "/tmp", 1, instance);
//! writer.open()?;
//! writer.begin_pk(512)?;
//! writer.put_pk_tuple(0x1000u64.into())?;
//! writer.commit_pk()?;
//! writer.close()?;
//! writer.materialize()?;
//!
//! if let Some(mut reader) = Reader::open("/tmp", 1, instance, 1024)? {
//!     reader.space_init(512);
//!     reader.add_pk_tuple(0xAu64.into());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entry;
pub mod error;
mod format;
pub mod gc;
pub mod reader;
pub mod recovery;
pub mod remap;
pub mod writer;

pub use config::SortDataConfig;
pub use entry::{Entry, EntryKey};
pub use error::{Error, Result};
pub use reader::Reader;
pub use recovery::{recover_space, RecoveryHost};
pub use remap::TuplePtr;
pub use writer::Writer;
