use crate::error::{LoadError, Result};

pub const MAGIC_BIG_ENDIAN: [u8; 4] = [0x80, 0x37, 0x12, 0x40];
pub const MAGIC_BYTE_SWAPPED: [u8; 4] = [0x37, 0x80, 0x40, 0x12];
pub const MAGIC_LITTLE_ENDIAN: [u8; 4] = [0x40, 0x12, 0x37, 0x80];

/// On-disk byte ordering of a program image, identified by its first four bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// `.z64`: already canonical.
    BigEndian,
    /// `.v64`: 16-bit halves swapped.
    ByteSwapped,
    /// `.n64`: fully reversed.
    LittleEndian,
}

impl ByteOrder {
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        match magic {
            MAGIC_BIG_ENDIAN => Ok(ByteOrder::BigEndian),
            MAGIC_BYTE_SWAPPED => Ok(ByteOrder::ByteSwapped),
            MAGIC_LITTLE_ENDIAN => Ok(ByteOrder::LittleEndian),
            _ => Err(LoadError::InvalidHeader { magic }),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ByteOrder::BigEndian => "z64",
            ByteOrder::ByteSwapped => "v64",
            ByteOrder::LittleEndian => "n64",
        }
    }

    /// Rewrites `bytes` into canonical order. The output always has the input's length.
    pub fn normalize(self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            ByteOrder::BigEndian => Ok(bytes),
            ByteOrder::ByteSwapped => deinterleave_pairs(&bytes),
            ByteOrder::LittleEndian => {
                let mut bytes = bytes;
                bytes.reverse();
                Ok(bytes)
            }
        }
    }
}

/// The high byte of every pair, then the low byte of every pair.
///
/// This is not an in-place swap of each 16-bit word: a `37 80 40 12` header comes out as
/// `80 12 ... 37 40 ...`.
fn deinterleave_pairs(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() % 2 != 0 {
        return Err(LoadError::UnpairedByte { len: bytes.len() });
    }
    let mut out = Vec::with_capacity(bytes.len());
    out.extend(bytes.chunks_exact(2).map(|pair| pair[1]));
    out.extend(bytes.chunks_exact(2).map(|pair| pair[0]));
    Ok(out)
}
