use std::path::PathBuf;

use thiserror::Error;

use vr64_image::LoadError;
use vr64_snapshot::{SlotError, SnapshotError};

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("no program image loaded")]
    NoImage,

    #[error("register index {index} out of range (0..32)")]
    RegisterIndex { index: usize },

    #[error("invalid cheat code {code:?}: expected hexadecimal")]
    InvalidCheat { code: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("netplay setup failed: {0}")]
    Netplay(#[source] std::io::Error),

    #[error("failed to spawn worker thread: {0}")]
    Worker(#[source] std::io::Error),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
