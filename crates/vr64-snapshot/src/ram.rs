use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::io::{ReadLeExt, WriteLeExt};

const MAX_CHUNK_SIZE: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Lz4 = 1,
}

impl Compression {
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Lz4),
            _ => Err(SnapshotError::Corrupt("invalid compression kind")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RamWriteOptions {
    pub compression: Compression,
    pub chunk_size: u32,
}

impl Default for RamWriteOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Lz4,
            chunk_size: 1024 * 1024,
        }
    }
}

/// Layout: `total_len u64, chunk_size u32, compression u8, reserved u8 x3`, then per chunk
/// `uncompressed_len u32, compressed_len u32, bytes`.
pub fn encode_ram_section<W: Write>(
    w: &mut W,
    total_len: u64,
    opts: RamWriteOptions,
    mut read_ram: impl FnMut(u64, &mut [u8]) -> Result<()>,
) -> Result<()> {
    if opts.chunk_size == 0 || opts.chunk_size > MAX_CHUNK_SIZE {
        return Err(SnapshotError::Corrupt("invalid chunk size"));
    }

    w.write_u64_le(total_len)?;
    w.write_u32_le(opts.chunk_size)?;
    w.write_u8(opts.compression as u8)?;
    w.write_bytes(&[0; 3])?; // reserved

    let chunk_size = opts.chunk_size as u64;
    let mut offset = 0u64;
    let mut buf = vec![0u8; (total_len.min(chunk_size)) as usize];
    while offset < total_len {
        let uncompressed_len = (total_len - offset).min(chunk_size) as usize;
        let chunk = &mut buf[..uncompressed_len];
        read_ram(offset, chunk)?;

        let compressed = compress(opts.compression, chunk);
        w.write_u32_le(uncompressed_len as u32)?;
        w.write_u32_le(
            compressed
                .len()
                .try_into()
                .map_err(|_| SnapshotError::Corrupt("compressed chunk too large"))?,
        )?;
        w.write_bytes(&compressed)?;

        offset += uncompressed_len as u64;
    }
    Ok(())
}

pub fn decode_ram_section_into<R: Read>(
    r: &mut R,
    expected_total_len: u64,
    mut write_ram: impl FnMut(u64, &[u8]) -> Result<()>,
) -> Result<()> {
    let total_len = r.read_u64_le()?;
    if total_len != expected_total_len {
        return Err(SnapshotError::RamLenMismatch {
            expected: expected_total_len,
            found: total_len,
        });
    }
    let chunk_size = r.read_u32_le()?;
    if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
        return Err(SnapshotError::Corrupt("invalid chunk size"));
    }
    let compression = Compression::from_u8(r.read_u8()?)?;
    let mut reserved = [0u8; 3];
    r.read_exact(&mut reserved)?;

    let chunk_size = chunk_size as u64;
    let mut offset = 0u64;
    while offset < total_len {
        let expected_uncompressed = (total_len - offset).min(chunk_size) as u32;
        let uncompressed_len = r.read_u32_le()?;
        if uncompressed_len != expected_uncompressed {
            return Err(SnapshotError::Corrupt("chunk uncompressed length mismatch"));
        }
        let compressed_len = r.read_u32_le()?;
        validate_compressed_len(compression, uncompressed_len, compressed_len)?;
        let compressed = r.read_exact_vec(compressed_len as usize)?;
        let chunk = decompress(compression, &compressed, uncompressed_len as usize)?;
        write_ram(offset, &chunk)?;
        offset += uncompressed_len as u64;
    }
    Ok(())
}

fn compress(kind: Compression, input: &[u8]) -> Vec<u8> {
    match kind {
        Compression::None => input.to_vec(),
        Compression::Lz4 => lz4_flex::block::compress(input),
    }
}

fn decompress(kind: Compression, compressed: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    match kind {
        Compression::None => Ok(compressed.to_vec()),
        Compression::Lz4 => {
            let out = lz4_flex::block::decompress(compressed, expected_len)?;
            if out.len() != expected_len {
                return Err(SnapshotError::Corrupt("lz4 chunk length mismatch"));
            }
            Ok(out)
        }
    }
}

fn max_lz4_compressed_len(uncompressed_len: u32) -> u32 {
    // LZ4 worst case: n + n/255 + 16
    uncompressed_len
        .saturating_add(uncompressed_len / 255)
        .saturating_add(16)
}

fn validate_compressed_len(
    compression: Compression,
    uncompressed_len: u32,
    compressed_len: u32,
) -> Result<()> {
    match compression {
        Compression::None if compressed_len != uncompressed_len => Err(SnapshotError::Corrupt(
            "compressed_len must equal uncompressed_len for no compression",
        )),
        Compression::Lz4 if compressed_len > max_lz4_compressed_len(uncompressed_len) => {
            Err(SnapshotError::Corrupt("lz4 chunk too large"))
        }
        _ => Ok(()),
    }
}
