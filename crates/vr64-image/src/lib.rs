//! Program image loading.
//!
//! Images come in three on-disk byte orders, distinguished by a 4-byte magic. Everything past
//! [`ProgramImage::from_bytes`] sees only the canonical big-endian layout.

#![forbid(unsafe_code)]

mod error;
mod order;

pub use crate::error::{LoadError, Result};
pub use crate::order::{ByteOrder, MAGIC_BIG_ENDIAN, MAGIC_BYTE_SWAPPED, MAGIC_LITTLE_ENDIAN};

use std::ops::Range;
use std::path::Path;

/// Smallest image with a complete header.
pub const MIN_IMAGE_LEN: usize = 64;
pub const TITLE_RANGE: Range<usize> = 0x20..0x34;

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Cartridge(ByteOrder),
    /// Expansion disk image. Loaded raw; no header is checked.
    Disk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    bytes: Vec<u8>,
    kind: ImageKind,
    title: String,
    md5: [u8; 16],
}

impl ProgramImage {
    /// Validates and normalizes a cartridge image.
    ///
    /// `fallback_title` is used when the header title is blank (typically the file name).
    pub fn from_bytes(bytes: Vec<u8>, fallback_title: &str) -> Result<Self> {
        if bytes.len() < MIN_IMAGE_LEN {
            return Err(LoadError::TooSmall {
                len: bytes.len(),
                min: MIN_IMAGE_LEN,
            });
        }
        let order = ByteOrder::detect(&bytes)?;
        let bytes = order.normalize(bytes)?;
        let title = header_title(&bytes).unwrap_or_else(|| fallback_title.to_string());
        let md5 = md5::compute(&bytes).0;
        tracing::info!(
            order = order.extension(),
            len = bytes.len(),
            %title,
            "loaded program image"
        );
        Ok(Self {
            bytes,
            kind: ImageKind::Cartridge(order),
            title,
            md5,
        })
    }

    pub fn from_disk_bytes(bytes: Vec<u8>, name: &str) -> Self {
        let md5 = md5::compute(&bytes).0;
        tracing::info!(len = bytes.len(), name, "loaded disk image");
        Self {
            bytes,
            kind: ImageKind::Disk,
            title: name.to_string(),
            md5,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, &file_name(path))
    }

    pub fn load_disk(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_disk_bytes(bytes, &file_name(path)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn md5(&self) -> [u8; 16] {
        self.md5
    }

    pub fn md5_hex(&self) -> String {
        format!("{:x}", md5::Digest(self.md5))
    }

    /// Big-endian word at `offset`, or `None` if fewer than four bytes remain.
    pub fn read_word(&self, offset: u32) -> Option<u32> {
        read_word_be(&self.bytes, offset)
    }
}

pub fn read_word_be(bytes: &[u8], offset: u32) -> Option<u32> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(4)?;
    let word = bytes.get(start..end)?;
    Some(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

fn header_title(bytes: &[u8]) -> Option<String> {
    let raw = bytes.get(TITLE_RANGE)?;
    let ascii: String = raw
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect();
    let title = ascii.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!title.is_empty()).then(|| title.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with_title(magic: [u8; 4], title: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x40];
        bytes[..4].copy_from_slice(&magic);
        bytes[0x20..0x20 + title.len()].copy_from_slice(title);
        bytes
    }

    #[test]
    fn rejects_short_images() {
        let err = ProgramImage::from_bytes(vec![0x80, 0x37, 0x12, 0x40], "x").unwrap_err();
        assert!(matches!(err, LoadError::TooSmall { len: 4, min: 64 }));
    }

    #[test]
    fn title_is_trimmed_ascii() {
        let bytes = image_with_title(MAGIC_BIG_ENDIAN, b"  SUPER\xffGAME   \0\0");
        let image = ProgramImage::from_bytes(bytes, "fallback.z64").unwrap();
        assert_eq!(image.title(), "SUPERGAME");
        assert_eq!(image.kind(), ImageKind::Cartridge(ByteOrder::BigEndian));
    }

    #[test]
    fn blank_title_falls_back() {
        let bytes = image_with_title(MAGIC_BIG_ENDIAN, b"");
        let image = ProgramImage::from_bytes(bytes, "demo.z64").unwrap();
        assert_eq!(image.title(), "demo.z64");
    }

    #[test]
    fn md5_matches_normalized_bytes() {
        let bytes = image_with_title(MAGIC_BIG_ENDIAN, b"HASHME");
        let expected = format!("{:x}", md5::compute(&bytes));
        let image = ProgramImage::from_bytes(bytes, "x").unwrap();
        assert_eq!(image.md5_hex(), expected);
    }

    #[test]
    fn read_word_is_big_endian_and_bounds_checked() {
        let image = ProgramImage::from_bytes(image_with_title(MAGIC_BIG_ENDIAN, b""), "x").unwrap();
        assert_eq!(image.read_word(0), Some(0x8037_1240));
        assert_eq!(image.read_word(60), Some(0));
        assert_eq!(image.read_word(61), None);
        assert_eq!(image.read_word(u32::MAX), None);
    }

    #[test]
    fn disk_images_skip_header_checks() {
        let image = ProgramImage::from_disk_bytes(vec![1, 2, 3], "expansion.ndd");
        assert_eq!(image.kind(), ImageKind::Disk);
        assert_eq!(image.title(), "expansion.ndd");
        assert_eq!(image.as_bytes(), &[1, 2, 3]);
    }
}
