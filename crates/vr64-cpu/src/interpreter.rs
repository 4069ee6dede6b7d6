use rustc_hash::FxHashMap;
use vr64_image::read_word_be;
use vr64_vector::VectorUnit;

use crate::cpu::{CpuState, REG_RA};
use crate::error::DecodeError;
use crate::instruction::{jump_target, Instruction};
use crate::memory::Ram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Continue,
    Jump(u32),
}

/// Outcome of one successful [`Interpreter::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub pc: u32,
    pub next_pc: u32,
    pub instruction: Instruction,
    pub cache_hit: bool,
}

/// Per-address memo of decoded instructions.
///
/// The first decode at an address is reused for every later visit, even if the bytes under it
/// change. Only [`HandlerCache::clear`] forgets an entry.
#[derive(Debug, Default)]
pub struct HandlerCache {
    entries: FxHashMap<u32, Instruction>,
    hits: u64,
    misses: u64,
}

impl HandlerCache {
    pub fn get(&self, pc: u32) -> Option<Instruction> {
        self.entries.get(&pc).copied()
    }

    fn lookup_or_insert(
        &mut self,
        pc: u32,
        decode: impl FnOnce() -> Instruction,
    ) -> (Instruction, bool) {
        if let Some(inst) = self.entries.get(&pc) {
            self.hits += 1;
            return (*inst, true);
        }
        self.misses += 1;
        let inst = decode();
        self.entries.insert(pc, inst);
        (inst, false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

#[derive(Debug, Default)]
pub struct Interpreter {
    pub cpu: CpuState,
    cache: HandlerCache,
}

impl Interpreter {
    pub fn new(cpu: CpuState) -> Self {
        Self {
            cpu,
            cache: HandlerCache::default(),
        }
    }

    pub fn cache(&self) -> &HandlerCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        tracing::debug!(entries = self.cache.len(), "handler cache cleared");
        self.cache.clear();
    }

    /// Executes the instruction at the current PC.
    ///
    /// On `Err` the CPU is left untouched; the caller decides how to skip.
    pub fn step(
        &mut self,
        image: &[u8],
        ram: &mut Ram,
        vector: &mut VectorUnit,
    ) -> Result<Step, DecodeError> {
        let pc = self.cpu.pc;
        let word = read_word_be(image, pc).ok_or(DecodeError::OutOfBounds {
            pc,
            len: image.len(),
        })?;

        let (instruction, cache_hit) = self.cache.lookup_or_insert(pc, || {
            let inst = Instruction::decode(word);
            if let Instruction::Unknown { opcode } = inst {
                tracing::debug!(
                    pc = format_args!("{pc:#x}"),
                    opcode,
                    "unknown opcode; cached as no-op"
                );
            } else {
                tracing::trace!(pc = format_args!("{pc:#x}"), op = inst.mnemonic(), "decoded");
            }
            inst
        });

        let next_pc = match execute(&instruction, pc, &mut self.cpu, ram, vector, image) {
            Next::Continue => pc.wrapping_add(4),
            Next::Jump(target) => target,
        };
        self.cpu.pc = next_pc;

        Ok(Step {
            pc,
            next_pc,
            instruction,
            cache_hit,
        })
    }

    /// Moves past an instruction that could not be executed.
    pub fn skip(&mut self) {
        self.cpu.pc = self.cpu.pc.wrapping_add(4);
    }
}

/// Applies one decoded instruction located at `pc`.
pub fn execute(
    inst: &Instruction,
    pc: u32,
    cpu: &mut CpuState,
    ram: &mut Ram,
    vector: &mut VectorUnit,
    image: &[u8],
) -> Next {
    match *inst {
        Instruction::Add { rd, rs, rt } => {
            let sum = cpu.reg(rs as usize).wrapping_add(cpu.reg(rt as usize));
            cpu.set_reg(rd as usize, sum);
            Next::Continue
        }
        Instruction::Lui { rt, imm } => {
            cpu.set_reg(rt as usize, (imm as u32) << 16);
            Next::Continue
        }
        Instruction::Lw { rt, imm } => {
            cpu.set_reg(rt as usize, ram.read(imm as u32));
            Next::Continue
        }
        Instruction::Sw { rt } => {
            vector.set_reg(0, cpu.reg(rt as usize));
            Next::Jump(vector.execute_at(image, pc))
        }
        Instruction::J { target } => Next::Jump(jump_target(pc, target)),
        Instruction::Jal { target } => {
            cpu.set_reg(REG_RA, pc.wrapping_add(8));
            Next::Jump(jump_target(pc, target))
        }
        Instruction::Unknown { .. } => Next::Continue,
    }
}
