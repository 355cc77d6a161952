//! Opening audio files and moving tag data between the typed model and the
//! underlying tag library.
//!
//! [`TagFile`] wraps one probed `lofty` file. All format detection, byte
//! layout, and tag serialization is the library's business; this module
//! only translates between [`TagMap`] and the generic tag, reads the audio
//! properties, and drives the one-shot save.

use std::path::{Path, PathBuf};

use lofty::config::WriteOptions;
use lofty::file::{FileType, TaggedFile};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, ItemValue, Tag, TagItem, TagType};

use crate::error::{Result, TagError};
use crate::tags::TagMap;

/// ID3v2 user-defined text frames surface through the generic tag as
/// unknown keys carrying this prefix.
const ID3V2_USER_TEXT_PREFIX: &str = "TXXX:";
/// MP4 freeform atoms surface as `----:mean:name` unknown keys.
const MP4_FREEFORM_PREFIX: &str = "----:";
const MP4_FREEFORM_MEAN: &str = "com.apple.iTunes";

/// ID3v2.4 separates multiple values inside one text frame with NUL.
const FRAME_VALUE_SEPARATOR: &str = "\0";

/// Fixed audio properties of one file, in the boundary's marshaling order:
/// length, channels, sample rate, bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioProperties {
    /// Stream length in milliseconds.
    pub length_ms: u32,
    /// Number of audio channels.
    pub channels: u32,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Audio bitrate in kbps.
    pub bitrate_kbps: u32,
}

impl AudioProperties {
    /// The 4-element integer vector exchanged across the boundary.
    pub fn to_array(self) -> [i32; 4] {
        [
            self.length_ms as i32,
            self.channels as i32,
            self.sample_rate as i32,
            self.bitrate_kbps as i32,
        ]
    }
}

/// One open audio file: a path plus the parsed tag state.
///
/// Mutations (`set_tags`, picture edits) are held in memory and only reach
/// disk through [`TagFile::save`], so a failed call never leaves a
/// partially written tag set behind.
pub struct TagFile {
    path: PathBuf,
    inner: TaggedFile,
}

impl TagFile {
    /// Probe and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Unreadable`] if the file is missing or is not a
    /// recognized audio container.
    pub fn open(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "probing audio file");

        let inner = Probe::open(path)
            .map_err(|e| TagError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .read()
            .map_err(|e| TagError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current tag set as a [`TagMap`].
    ///
    /// Reads the primary tag (first tag as a fallback); a file with no tags
    /// yields an empty map, which is a normal starting state, not an error.
    /// Non-text items (pictures, binary frames) are not part of the map.
    pub fn tags(&self) -> TagMap {
        let mut map = TagMap::new();
        let Some(tag) = self.inner.primary_tag().or_else(|| self.inner.first_tag()) else {
            return map;
        };

        for item in tag.items() {
            let ItemValue::Text(value) = item.value() else {
                continue;
            };
            let Some(raw_key) = item.key().map_key(TagType::VorbisComments, true) else {
                continue;
            };
            let key = unmarshal_key(raw_key);
            for part in value.split(FRAME_VALUE_SEPARATOR) {
                map.push_value(key, part.to_owned());
            }
        }
        map
    }

    /// Replace the file's text tag set with `map`, in memory.
    ///
    /// Every existing text item in the target tag is removed and the map's
    /// entries inserted in its place; pictures and other non-text items are
    /// left untouched. Keys without a native field in the target format go
    /// through its user-defined container (`TXXX` frames for ID3v2, freeform
    /// atoms for MP4). On ID3v2 a multi-valued key is stored as one frame
    /// with NUL-separated values, the v2.4 convention; same-id frames would
    /// otherwise collapse to the last value on save. Nothing is written
    /// until [`TagFile::save`].
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Persistence`] if the target tag rejects one of
    /// the keys; the write is abandoned and nothing reaches disk.
    pub fn set_tags(&mut self, map: &TagMap) -> Result<()> {
        let tag_type = self.target_tag_type();
        let path = self.path.clone();
        let tag = self.target_tag_mut()?;

        let existing: Vec<ItemKey> = tag
            .items()
            .filter(|item| matches!(item.value(), ItemValue::Text(_)))
            .map(|item| item.key().clone())
            .collect();
        for key in &existing {
            tag.remove_key(key);
        }

        for (key, values) in map.iter() {
            let item_key = marshal_key(tag_type, key);
            let stored = if tag_type == TagType::Id3v2 {
                let joined = values.join(FRAME_VALUE_SEPARATOR);
                tag.push(TagItem::new(item_key, ItemValue::Text(joined)))
            } else {
                values.iter().all(|value| {
                    tag.push(TagItem::new(item_key.clone(), ItemValue::Text(value.clone())))
                })
            };
            if !stored {
                return Err(TagError::Persistence {
                    path,
                    reason: format!("tag format cannot store key {key}"),
                });
            }
        }

        tracing::debug!(
            keys = map.len(),
            values = map.value_count(),
            "replaced in-memory tag set"
        );
        Ok(())
    }

    /// Audio properties of the decoded stream.
    pub fn properties(&self) -> AudioProperties {
        let props = self.inner.properties();
        AudioProperties {
            length_ms: props.duration().as_millis() as u32,
            channels: u32::from(props.channels().unwrap_or(0)),
            sample_rate: props.sample_rate().unwrap_or(0),
            bitrate_kbps: props
                .audio_bitrate()
                .or_else(|| props.overall_bitrate())
                .unwrap_or(0),
        }
    }

    /// Persist all in-memory tag state back to the file.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::Persistence`] if the format rejects the write or
    /// the filesystem refuses it (e.g. read-only mount).
    pub fn save(&mut self) -> Result<()> {
        tracing::debug!(path = %self.path.display(), "saving tags");
        self.inner
            .save_to_path(&self.path, WriteOptions::default())
            .map_err(|e| TagError::Persistence {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// The tag type all write operations target.
    ///
    /// The file's primary tag type, except WAV which targets ID3v2: RIFF
    /// INFO carries no pictures and drops free-form keys.
    pub(crate) fn target_tag_type(&self) -> TagType {
        if self.inner.file_type() == FileType::Wav {
            TagType::Id3v2
        } else {
            self.inner.primary_tag_type()
        }
    }

    /// Get the target tag mutably, creating it if the file has none yet.
    pub(crate) fn target_tag_mut(&mut self) -> Result<&mut Tag> {
        let tag_type = self.target_tag_type();
        if self.inner.tag(tag_type).is_none() {
            self.inner.insert_tag(Tag::new(tag_type));
        }
        self.inner.tag_mut(tag_type).ok_or_else(|| TagError::Persistence {
            path: self.path.clone(),
            reason: format!("file does not support {tag_type:?} tags"),
        })
    }

    pub(crate) fn inner(&self) -> &TaggedFile {
        &self.inner
    }

    pub(crate) fn inner_mut(&mut self) -> &mut TaggedFile {
        &mut self.inner
    }
}

/// Map a property-map key to the item key actually stored for `tag_type`.
///
/// Known keys go through the generic mapping and re-map to native fields
/// on save. A free-form key needs the format's user-defined container
/// spelled out (`TXXX:` for ID3v2, `----:mean:` for MP4) or the tag drops
/// the item on push.
fn marshal_key(tag_type: TagType, key: &str) -> ItemKey {
    let mapped = ItemKey::from_key(TagType::VorbisComments, key);
    if let ItemKey::Unknown(raw) = &mapped {
        match tag_type {
            TagType::Id3v2 => return ItemKey::Unknown(format!("{ID3V2_USER_TEXT_PREFIX}{raw}")),
            TagType::Mp4Ilst => {
                return ItemKey::Unknown(format!(
                    "{MP4_FREEFORM_PREFIX}{MP4_FREEFORM_MEAN}:{raw}"
                ))
            }
            _ => {}
        }
    }
    mapped
}

/// Undo [`marshal_key`]'s format wrapping on a key read back from a tag.
fn unmarshal_key(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix(ID3V2_USER_TEXT_PREFIX) {
        return rest;
    }
    if raw.starts_with(MP4_FREEFORM_PREFIX) {
        if let Some(idx) = raw.rfind(':') {
            return &raw[idx + 1..];
        }
    }
    raw
}

/// Read the full tag set of the file at `path`.
pub fn read_tags(path: &Path) -> Result<TagMap> {
    Ok(TagFile::open(path)?.tags())
}

/// Read the audio properties of the file at `path`.
pub fn read_properties(path: &Path) -> Result<AudioProperties> {
    Ok(TagFile::open(path)?.properties())
}
