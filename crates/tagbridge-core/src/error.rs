//! Error types for the tagbridge core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing audio file metadata.
///
/// Invalid boundary input (null pointers, non-UTF-8 paths) never reaches
/// this crate; the FFI layer rejects it before core code runs. Malformed
/// tag rows are not errors either: rows without a key/value separator are
/// skipped by the codec (lenient decoding).
#[derive(Error, Debug)]
pub enum TagError {
    #[error("cannot read {path} as an audio file: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("file has no embedded pictures")]
    NoPictures,

    #[error("cannot persist changes to {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, TagError>;
