use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::io::{ReadLeExt, WriteLeExt};

pub const GPR_COUNT: usize = 32;
pub const VREG_COUNT: usize = 32;

const MAX_TITLE_LEN: usize = 4096;
const MAX_SCRATCH_WORDS: usize = 1 << 20;
const MAX_PIXELS: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotMeta {
    pub frame_count: u64,
    pub title: String,
}

impl SnapshotMeta {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64_le(self.frame_count)?;
        w.write_string_u32(&self.title)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let frame_count = r.read_u64_le()?;
        let title = r.read_string_u32(MAX_TITLE_LEN)?;
        Ok(Self { frame_count, title })
    }
}

/// Scalar core registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuState {
    pub pc: u32,
    pub gpr: [u32; GPR_COUNT],
}

impl CpuState {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.pc)?;
        w.write_u32_slice_le(&self.gpr)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let pc = r.read_u32_le()?;
        let mut gpr = [0u32; GPR_COUNT];
        for reg in &mut gpr {
            *reg = r.read_u32_le()?;
        }
        Ok(Self { pc, gpr })
    }
}

/// Vector coprocessor registers, program counter, cycle counter and scratch memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorState {
    pub regs: [u16; VREG_COUNT],
    pub pc: u32,
    pub cycles: u64,
    pub scratch: Vec<u32>,
}

impl VectorState {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        for &reg in &self.regs {
            w.write_u16_le(reg)?;
        }
        w.write_u32_le(self.pc)?;
        w.write_u64_le(self.cycles)?;
        let count: u32 = self
            .scratch
            .len()
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("scratch too large"))?;
        w.write_u32_le(count)?;
        w.write_u32_slice_le(&self.scratch)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut regs = [0u16; VREG_COUNT];
        for reg in &mut regs {
            *reg = r.read_u16_le()?;
        }
        let pc = r.read_u32_le()?;
        let cycles = r.read_u64_le()?;
        let count = r.read_u32_le()? as usize;
        if count > MAX_SCRATCH_WORDS {
            return Err(SnapshotError::Corrupt("scratch too large"));
        }
        let scratch = r.read_u32_vec_le(count)?;
        Ok(Self {
            regs,
            pc,
            cycles,
            scratch,
        })
    }
}

/// Row-major `0xRRGGBB` pixels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramebufferState {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl FramebufferState {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        if self.pixels.len() as u64 != u64::from(self.width) * u64::from(self.height) {
            return Err(SnapshotError::Corrupt("framebuffer size mismatch"));
        }
        w.write_u32_le(self.width)?;
        w.write_u32_le(self.height)?;
        w.write_u32_slice_le(&self.pixels)
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let width = r.read_u32_le()?;
        let height = r.read_u32_le()?;
        let count = u64::from(width) * u64::from(height);
        if count > MAX_PIXELS {
            return Err(SnapshotError::Corrupt("framebuffer too large"));
        }
        let pixels = r.read_u32_vec_le(count as usize)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}
