//! Machine state capture, binary encoding and in-memory save slots.

#![forbid(unsafe_code)]

mod error;
mod format;
mod io;
mod ram;
mod slots;
mod types;

pub use crate::error::{Result, SlotError, SnapshotError};
pub use crate::format::{
    SectionId, SNAPSHOT_ENDIANNESS_LITTLE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION_V1,
};
pub use crate::ram::{Compression, RamWriteOptions};
pub use crate::slots::{SnapshotSlots, SLOT_RANGE};
pub use crate::types::{
    CpuState, FramebufferState, SnapshotMeta, VectorState, GPR_COUNT, VREG_COUNT,
};

use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::io::{ReadLeExt, WriteLeExt};

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    pub ram: RamWriteOptions,
}

pub trait SnapshotSource {
    fn snapshot_meta(&self) -> SnapshotMeta;
    fn cpu_state(&self) -> CpuState;
    fn vector_state(&self) -> VectorState;
    fn framebuffer_state(&self) -> FramebufferState;

    fn ram_len(&self) -> usize;
    fn read_ram(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

pub trait SnapshotTarget {
    fn restore_meta(&mut self, _meta: SnapshotMeta) {}
    fn restore_cpu_state(&mut self, state: CpuState);
    fn restore_vector_state(&mut self, state: VectorState);
    fn restore_framebuffer_state(&mut self, state: FramebufferState);

    fn ram_len(&self) -> usize;
    fn write_ram(&mut self, offset: u64, data: &[u8]) -> Result<()>;
}

pub fn save_snapshot<W: Write + Seek, S: SnapshotSource + ?Sized>(
    w: &mut W,
    source: &S,
    options: SaveOptions,
) -> Result<()> {
    write_file_header(w)?;

    write_section(w, SectionId::META, 1, |w| source.snapshot_meta().encode(w))?;
    write_section(w, SectionId::CPU, 1, |w| source.cpu_state().encode(w))?;
    write_section(w, SectionId::VECTOR, 1, |w| source.vector_state().encode(w))?;
    write_section(w, SectionId::FRAMEBUFFER, 1, |w| {
        source.framebuffer_state().encode(w)
    })?;
    write_section(w, SectionId::RAM, 1, |w| {
        ram::encode_ram_section(w, source.ram_len() as u64, options.ram, |offset, buf| {
            source.read_ram(offset, buf)
        })
    })?;

    Ok(())
}

/// Streams a snapshot into `target`.
///
/// Sections are applied as they are read, so a corrupt stream can leave `target` partially
/// updated. Decode into a [`Snapshot`] first when that matters.
pub fn restore_snapshot<R: Read, T: SnapshotTarget + ?Sized>(
    r: &mut R,
    target: &mut T,
) -> Result<()> {
    read_file_header(r)?;

    let mut seen_cpu = false;
    let mut seen_ram = false;

    while let Some(header) = read_section_header(r)? {
        let mut section_reader = r.take(header.len);
        match header.id {
            id if id == SectionId::META => {
                if header.version == 1 {
                    target.restore_meta(SnapshotMeta::decode(&mut section_reader)?);
                }
            }
            id if id == SectionId::CPU => {
                if header.version == 1 {
                    target.restore_cpu_state(CpuState::decode(&mut section_reader)?);
                    seen_cpu = true;
                }
            }
            id if id == SectionId::VECTOR => {
                if header.version == 1 {
                    target.restore_vector_state(VectorState::decode(&mut section_reader)?);
                }
            }
            id if id == SectionId::FRAMEBUFFER => {
                if header.version == 1 {
                    target.restore_framebuffer_state(FramebufferState::decode(
                        &mut section_reader,
                    )?);
                }
            }
            id if id == SectionId::RAM => {
                if header.version == 1 {
                    let expected_len = target.ram_len() as u64;
                    ram::decode_ram_section_into(
                        &mut section_reader,
                        expected_len,
                        |offset, data| target.write_ram(offset, data),
                    )?;
                    seen_ram = true;
                }
            }
            id => {
                tracing::debug!(
                    id = id.0,
                    len = header.len,
                    "skipping unknown snapshot section"
                );
            }
        }

        // Trailing bytes inside a known section are tolerated.
        std::io::copy(&mut section_reader, &mut std::io::sink())?;
        if section_reader.limit() != 0 {
            return Err(SnapshotError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated section payload",
            )));
        }
    }

    if !seen_cpu {
        return Err(SnapshotError::Corrupt("missing CPU section"));
    }
    if !seen_ram {
        return Err(SnapshotError::Corrupt("missing RAM section"));
    }
    Ok(())
}

/// xxHash64 of a snapshot's uncompressed encoding. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Owned copy of the complete machine state.
///
/// Shares nothing with the machine it was captured from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub cpu: CpuState,
    pub vector: VectorState,
    pub framebuffer: FramebufferState,
    pub ram: Vec<u8>,
}

impl Snapshot {
    pub fn capture<S: SnapshotSource + ?Sized>(source: &S) -> Result<Self> {
        let mut ram = Vec::new();
        let len = source.ram_len();
        ram.try_reserve_exact(len)
            .map_err(|_| SnapshotError::OutOfMemory { len })?;
        ram.resize(len, 0);
        source.read_ram(0, &mut ram)?;

        Ok(Self {
            meta: source.snapshot_meta(),
            cpu: source.cpu_state(),
            vector: source.vector_state(),
            framebuffer: source.framebuffer_state(),
            ram,
        })
    }

    /// Replaces every snapshotted field of `target`. Fails without touching `target` if its RAM
    /// size differs.
    pub fn restore_into<T: SnapshotTarget + ?Sized>(&self, target: &mut T) -> Result<()> {
        let expected = target.ram_len() as u64;
        if expected != self.ram.len() as u64 {
            return Err(SnapshotError::RamLenMismatch {
                expected,
                found: self.ram.len() as u64,
            });
        }
        target.restore_meta(self.meta.clone());
        target.restore_cpu_state(self.cpu.clone());
        target.restore_vector_state(self.vector.clone());
        target.restore_framebuffer_state(self.framebuffer.clone());
        target.write_ram(0, &self.ram)
    }

    pub fn encode<W: Write + Seek>(&self, w: &mut W, options: SaveOptions) -> Result<()> {
        save_snapshot(w, self, options)
    }

    /// Decodes a complete snapshot whose RAM must be exactly `ram_len` bytes.
    pub fn decode<R: Read>(r: &mut R, ram_len: usize) -> Result<Self> {
        let mut ram = Vec::new();
        ram.try_reserve_exact(ram_len)
            .map_err(|_| SnapshotError::OutOfMemory { len: ram_len })?;
        ram.resize(ram_len, 0);
        let mut snapshot = Snapshot {
            ram,
            ..Snapshot::default()
        };
        restore_snapshot(r, &mut snapshot)?;
        Ok(snapshot)
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let options = SaveOptions {
            ram: RamWriteOptions {
                compression: Compression::None,
                ..RamWriteOptions::default()
            },
        };
        let mut buf = Cursor::new(Vec::new());
        self.encode(&mut buf, options)?;
        Ok(Fingerprint(xxhash_rust::xxh64::xxh64(buf.get_ref(), 0)))
    }
}

impl SnapshotSource for Snapshot {
    fn snapshot_meta(&self) -> SnapshotMeta {
        self.meta.clone()
    }

    fn cpu_state(&self) -> CpuState {
        self.cpu.clone()
    }

    fn vector_state(&self) -> VectorState {
        self.vector.clone()
    }

    fn framebuffer_state(&self) -> FramebufferState {
        self.framebuffer.clone()
    }

    fn ram_len(&self) -> usize {
        self.ram.len()
    }

    fn read_ram(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let range = ram_range(offset, buf.len(), self.ram.len())?;
        buf.copy_from_slice(&self.ram[range]);
        Ok(())
    }
}

impl SnapshotTarget for Snapshot {
    fn restore_meta(&mut self, meta: SnapshotMeta) {
        self.meta = meta;
    }

    fn restore_cpu_state(&mut self, state: CpuState) {
        self.cpu = state;
    }

    fn restore_vector_state(&mut self, state: VectorState) {
        self.vector = state;
    }

    fn restore_framebuffer_state(&mut self, state: FramebufferState) {
        self.framebuffer = state;
    }

    fn ram_len(&self) -> usize {
        self.ram.len()
    }

    fn write_ram(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let range = ram_range(offset, data.len(), self.ram.len())?;
        self.ram[range].copy_from_slice(data);
        Ok(())
    }
}

fn ram_range(offset: u64, len: usize, ram_len: usize) -> Result<std::ops::Range<usize>> {
    let start: usize = offset
        .try_into()
        .map_err(|_| SnapshotError::Corrupt("ram offset overflow"))?;
    let end = start
        .checked_add(len)
        .filter(|&end| end <= ram_len)
        .ok_or(SnapshotError::Corrupt("ram access out of bounds"))?;
    Ok(start..end)
}

#[derive(Debug, Clone, Copy)]
struct SectionHeader {
    id: SectionId,
    version: u16,
    len: u64,
}

fn write_file_header<W: Write>(w: &mut W) -> Result<()> {
    w.write_bytes(SNAPSHOT_MAGIC)?;
    w.write_u16_le(SNAPSHOT_VERSION_V1)?;
    w.write_u8(SNAPSHOT_ENDIANNESS_LITTLE)?;
    w.write_u8(0)?; // reserved
    w.write_u32_le(0)?; // flags
    Ok(())
}

fn read_file_header<R: Read>(r: &mut R) -> Result<()> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let version = r.read_u16_le()?;
    if version != SNAPSHOT_VERSION_V1 {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let endianness = r.read_u8()?;
    if endianness != SNAPSHOT_ENDIANNESS_LITTLE {
        return Err(SnapshotError::InvalidEndianness(endianness));
    }
    let _reserved = r.read_u8()?;
    let _flags = r.read_u32_le()?;
    Ok(())
}

fn write_section<W: Write + Seek>(
    w: &mut W,
    id: SectionId,
    version: u16,
    f: impl FnOnce(&mut W) -> Result<()>,
) -> Result<()> {
    let header_pos = w.stream_position()?;
    w.write_u32_le(id.0)?;
    w.write_u16_le(version)?;
    w.write_u16_le(0)?; // flags
    w.write_u64_le(0)?; // placeholder len

    let payload_start = w.stream_position()?;
    f(w)?;
    let payload_end = w.stream_position()?;

    let len = payload_end
        .checked_sub(payload_start)
        .ok_or(SnapshotError::Corrupt("stream position underflow"))?;

    w.seek(SeekFrom::Start(header_pos + 8))?;
    w.write_u64_le(len)?;
    w.seek(SeekFrom::Start(payload_end))?;
    Ok(())
}

fn read_section_header<R: Read>(r: &mut R) -> Result<Option<SectionHeader>> {
    let mut first = [0u8; 1];
    if r.read(&mut first)? == 0 {
        return Ok(None);
    }
    let mut tag_bytes = [0u8; 4];
    tag_bytes[0] = first[0];
    r.read_exact(&mut tag_bytes[1..])?;
    let id = SectionId(u32::from_le_bytes(tag_bytes));
    let version = r.read_u16_le()?;
    let _flags = r.read_u16_le()?;
    let len = r.read_u64_le()?;
    Ok(Some(SectionHeader { id, version, len }))
}
