use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image too small ({len} bytes, need at least {min})")]
    TooSmall { len: usize, min: usize },

    #[error("invalid image header {magic:02x?}")]
    InvalidHeader { magic: [u8; 4] },

    #[error("byte-swapped image has odd length {len}")]
    UnpairedByte { len: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
