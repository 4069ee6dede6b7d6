//! The assembled machine and its worker-thread runtime.
//!
//! [`Machine`] owns every piece of emulated state and runs one outer iteration at a time.
//! [`Runtime`] puts it behind a mutex and drives it from a worker thread.

#![forbid(unsafe_code)]

mod cheats;
mod config;
mod error;
mod input;
mod machine;
mod peer;
mod runtime;

pub use crate::cheats::{CheatCode, CheatList, CHEAT_PROBABILITY, CHEAT_REGISTER};
pub use crate::config::{check_speed, ConfigError, MachineConfig, SPEED_MAX, SPEED_MIN};
pub use crate::error::MachineError;
pub use crate::input::{Action, ControllerConfig};
pub use crate::machine::{Iteration, Machine, BOOT_STACK_POINTER, INPUT_REGISTER, REG_SP};
pub use crate::peer::{payload_value, PeerInput, UdpPeer, DEFAULT_NETPLAY_PORT, PEER_REGISTER};
pub use crate::runtime::{frame_interval, EngineState, Runtime};
