//! Sort-data garbage collection (spec §4.6).
//!
//! A sort-data file is pinned to its snapshot purely by filename: both
//! share the `<20-digit signature>` prefix. When the engine's snapshot GC
//! collects `<signature>.snap`, it should also collect the companion
//! `<signature>.sortdata` — a missing sidecar is not an error, since the
//! file is optional to begin with.

use std::path::Path;

use crate::error::Result;

/// Unlinks `<dir>/<signature>.sortdata` if it exists.
///
/// # Errors
///
/// Returns [`crate::error::Error::Io`] for filesystem failures other than
/// the file simply not being there.
pub fn collect(dir: impl AsRef<Path>, snapshot_signature: u64) -> Result<()> {
    let path = dir.as_ref().join(format!("{snapshot_signature:020}.sortdata"));
    match std::fs::remove_file(&path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "collected sort data file");
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
#[path = "gc_tests.rs"]
mod tests;
