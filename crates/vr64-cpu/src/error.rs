use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("instruction fetch at {pc:#x} runs past end of image ({len} bytes)")]
    OutOfBounds { pc: u32, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("RAM size must be a non-zero power of two (got {0} words)")]
pub struct InvalidRamSize(pub usize);
