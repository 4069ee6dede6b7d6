use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};

pub trait WriteLeExt: Write {
    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])?;
        Ok(())
    }

    fn write_u16_le(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u32_le(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_u64_le(&mut self, v: u64) -> Result<()> {
        self.write_all(&v.to_le_bytes())?;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        Ok(())
    }

    fn write_string_u32(&mut self, s: &str) -> Result<()> {
        let len: u32 = s
            .len()
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("string length does not fit in u32"))?;
        self.write_u32_le(len)?;
        self.write_bytes(s.as_bytes())
    }

    fn write_u32_slice_le(&mut self, words: &[u32]) -> Result<()> {
        for &word in words {
            self.write_u32_le(word)?;
        }
        Ok(())
    }
}

impl<T: Write + ?Sized> WriteLeExt for T {}

pub trait ReadLeExt: Read {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_exact_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| SnapshotError::OutOfMemory { len })?;
        buf.resize(len, 0);
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Length-prefixed UTF-8, rejecting anything longer than `max_len` bytes.
    fn read_string_u32(&mut self, max_len: usize) -> Result<String> {
        let len = self.read_u32_le()? as usize;
        if len > max_len {
            return Err(SnapshotError::Corrupt("string too long"));
        }
        Ok(String::from_utf8(self.read_exact_vec(len)?)?)
    }

    fn read_u32_vec_le(&mut self, count: usize) -> Result<Vec<u32>> {
        let bytes = self.read_exact_vec(
            count
                .checked_mul(4)
                .ok_or(SnapshotError::Corrupt("word count overflow"))?,
        )?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

impl<T: Read + ?Sized> ReadLeExt for T {}
