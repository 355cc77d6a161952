//! The write-merge engine.
//!
//! A write request is a delta against whatever tags the file currently
//! holds: each incoming row either replaces one key's value list or, with
//! an empty value segment, deletes the key. Since the stateless call
//! surface keeps no state between calls, the full merge is recomputed on
//! every write. Two flags adjust the semantics: [`WriteFlags::CLEAR`]
//! discards the existing tags first, and [`WriteFlags::DIFF_SAVE`] skips
//! the save entirely when the merge result equals what is already stored.

use std::path::Path;

use crate::error::Result;
use crate::file::TagFile;
use crate::rows;
use crate::tags::TagMap;

/// Write option flags stored as a u32 bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteFlags(pub u32);

impl WriteFlags {
    /// Discard all existing tags before applying the delta.
    pub const CLEAR: u32 = 1 << 0;
    /// Skip the save when the merged tag set equals the stored one.
    pub const DIFF_SAVE: u32 = 1 << 1;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Apply a row delta to `base`, returning the merged map.
///
/// Per row: no tab means the row is skipped (lenient decoding); an empty
/// value segment removes the key; otherwise the key's value list is
/// replaced, never appended to, by the segment's sub-values split on the
/// private separator.
pub fn apply<I, S>(base: &TagMap, rows: I) -> TagMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut working = base.clone();
    for row in rows {
        let Some((key, segment)) = rows::decode_row(row.as_ref()) else {
            continue;
        };
        if segment.is_empty() {
            working.remove(key);
        } else {
            working.set(key, rows::split_values(segment));
        }
    }
    working
}

/// Merge a row delta into the file at `path` and persist the result.
///
/// Returns whether the underlying save ran: `Ok(false)` means the
/// diff-save check found the merged set identical to the stored one and
/// skipped persistence; both outcomes are success. The whole mutation is
/// held in memory until the single save call, so a failure never leaves a
/// partially flushed tag set.
///
/// # Errors
///
/// Fails if the file cannot be opened as an audio container or the save
/// step is rejected.
pub fn write_tags<I, S>(path: &Path, rows: I, flags: WriteFlags) -> Result<bool>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut file = TagFile::open(path)?;
    let current = file.tags();

    let base = if flags.has(WriteFlags::CLEAR) {
        TagMap::new()
    } else {
        current.clone()
    };
    let merged = apply(&base, rows);

    if flags.has(WriteFlags::DIFF_SAVE) && merged == current {
        tracing::debug!(path = %path.display(), "tag set unchanged, skipping save");
        return Ok(false);
    }

    file.set_tags(&merged)?;
    file.save()?;
    Ok(true)
}
