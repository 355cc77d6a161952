//! Embedded picture handling: a single front-cover slot.
//!
//! Reads prefer the picture classified as the front cover and silently
//! fall back to the first available picture. Writes are destructive: the
//! entire embedded picture set is replaced by one front-cover entry whose
//! MIME type is sniffed from the first bytes of the payload. No image
//! validation happens beyond that sniff.

use std::path::Path;

use lofty::picture::{MimeType, Picture, PictureType};
use lofty::prelude::*;
use lofty::tag::Tag;

use crate::error::{Result, TagError};
use crate::file::TagFile;

/// The 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Description attached to every picture this library writes.
pub const COVER_DESCRIPTION: &str = "tagbridge front cover";

/// Sniff the MIME type of a picture payload.
///
/// A buffer starting with the PNG signature is `image/png`; anything else
/// is assumed to be `image/jpeg`.
pub fn sniff_mime(data: &[u8]) -> MimeType {
    if data.len() >= PNG_SIGNATURE.len() && data[..PNG_SIGNATURE.len()] == PNG_SIGNATURE {
        MimeType::Png
    } else {
        MimeType::Jpeg
    }
}

impl TagFile {
    /// The front cover's raw bytes, or the first embedded picture's if no
    /// entry is classified as the front cover.
    ///
    /// # Errors
    ///
    /// Returns [`TagError::NoPictures`] when the file has no pictures in
    /// any tag.
    pub fn front_cover(&self) -> Result<Vec<u8>> {
        let pictures: Vec<&Picture> = self
            .inner()
            .tags()
            .iter()
            .flat_map(|tag| tag.pictures())
            .collect();

        let picture = pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .ok_or(TagError::NoPictures)?;

        Ok(picture.data().to_vec())
    }

    /// Replace the whole embedded picture set with one front-cover entry,
    /// in memory. The MIME type is sniffed from `data`.
    pub fn set_front_cover(&mut self, data: &[u8]) -> Result<()> {
        let mime = sniff_mime(data);
        tracing::debug!(bytes = data.len(), mime = mime.as_str(), "setting front cover");

        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(mime),
            Some(COVER_DESCRIPTION.to_owned()),
            data.to_vec(),
        );

        self.remove_all_pictures();
        self.target_tag_mut()?.push_picture(picture);
        Ok(())
    }

    /// Remove every embedded picture from every tag, in memory.
    pub fn clear_pictures(&mut self) {
        self.remove_all_pictures();
    }

    fn remove_all_pictures(&mut self) {
        let tag_types: Vec<_> = self.inner().tags().iter().map(Tag::tag_type).collect();
        for tag_type in tag_types {
            if let Some(tag) = self.inner_mut().tag_mut(tag_type) {
                while !tag.pictures().is_empty() {
                    let _ = tag.remove_picture(0);
                }
            }
        }
    }
}

/// Read the front cover (or first picture) of the file at `path`.
pub fn read_front_cover(path: &Path) -> Result<Vec<u8>> {
    TagFile::open(path)?.front_cover()
}

/// Replace the picture set of the file at `path` with one front cover.
pub fn write_front_cover(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = TagFile::open(path)?;
    file.set_front_cover(data)?;
    file.save()
}

/// Remove all embedded pictures from the file at `path`.
pub fn clear_pictures(path: &Path) -> Result<()> {
    let mut file = TagFile::open(path)?;
    file.clear_pictures();
    file.save()
}
