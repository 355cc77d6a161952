//! Core audio metadata engine behind the `tagbridge` C surface.
//!
//! Everything format-specific is delegated to `lofty`; this crate owns the
//! exchange model layered on top of it:
//!
//! - [`TagMap`]: the typed, case-normalized, multi-valued tag mapping
//! - [`rows`]: the flat tab-separated row codec the boundary speaks
//! - [`TagFile`]: one probed file, with in-memory mutation and one-shot save
//! - [`merge`]: the delta-based write engine with clear and diff-save flags
//! - [`picture`]: the single front-cover slot with MIME sniffing
//!
//! The path-oriented free functions ([`read_tags`], [`write_tags`],
//! [`read_properties`], [`read_front_cover`], [`write_front_cover`],
//! [`clear_pictures`]) each open, act, and close in one call. [`TagFile`]
//! is the handle-oriented alternative for callers that batch edits.

pub mod error;
pub mod file;
pub mod merge;
pub mod picture;
pub mod rows;
pub mod tags;

pub use error::{Result, TagError};
pub use file::{read_properties, read_tags, AudioProperties, TagFile};
pub use merge::{apply, write_tags, WriteFlags};
pub use picture::{clear_pictures, read_front_cover, sniff_mime, write_front_cover};
pub use tags::TagMap;

#[cfg(test)]
pub(crate) mod testutil {
    use std::path::PathBuf;

    use tempfile::TempDir;

    /// Create a minimal valid PCM WAV file in a fresh temp directory.
    ///
    /// Mono, 44100 Hz, 16-bit, one sample of silence. Enough for probing,
    /// property reads, and ID3v2 tag writes without shipping binary assets.
    pub(crate) fn wav_file() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eg.wav");

        let mut data: Vec<u8> = Vec::with_capacity(46);
        data.extend_from_slice(b"RIFF");
        data.extend_from_slice(&38u32.to_le_bytes());
        data.extend_from_slice(b"WAVE");
        data.extend_from_slice(b"fmt ");
        data.extend_from_slice(&16u32.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes()); // PCM
        data.extend_from_slice(&1u16.to_le_bytes()); // mono
        data.extend_from_slice(&44100u32.to_le_bytes());
        data.extend_from_slice(&88200u32.to_le_bytes()); // byte rate
        data.extend_from_slice(&2u16.to_le_bytes()); // block align
        data.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        data.extend_from_slice(b"data");
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&[0u8, 0u8]);

        std::fs::write(&path, &data).unwrap();
        (dir, path)
    }
}
