//! Scalar core: registers, main memory, and a decode-once dispatch loop.

#![forbid(unsafe_code)]

mod cpu;
mod error;
pub mod instruction;
mod interpreter;
mod memory;

pub use crate::cpu::{CpuState, GPR_COUNT, REG_RA, RESET_PC};
pub use crate::error::{DecodeError, InvalidRamSize};
pub use crate::instruction::Instruction;
pub use crate::interpreter::{execute, HandlerCache, Interpreter, Next, Step};
pub use crate::memory::{Ram, DEFAULT_RAM_WORDS};
