//! Vector coprocessor.
//!
//! The coprocessor owns 32 sixteen-bit vector registers, a small scratch memory addressed by its
//! own program counter, and the output [`Framebuffer`]. The scalar core hands it a program offset
//! via [`VectorUnit::execute_at`]; every execution recolors the whole frame from `v0..v2`.

#![forbid(unsafe_code)]

mod framebuffer;

pub use crate::framebuffer::{pack_rgb, Framebuffer, FB_HEIGHT, FB_PIXELS, FB_WIDTH};

pub const VREG_COUNT: usize = 32;
pub const SCRATCH_WORDS: usize = 0x1000;

pub const OP_VADD: u8 = 0x32;
pub const OP_VMUL: u8 = 0x33;
pub const OP_VMOV: u8 = 0x34;

const CYCLES_DISPATCH: u64 = 10;
const CYCLES_VADD: u64 = 8;
const CYCLES_VMUL: u64 = 10;
const CYCLES_VMOV: u64 = 6;
const CYCLES_RENDER: u64 = 1000;

/// One decoded coprocessor micro-instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    Vadd { vd: u8, vs: u8, vt: u8 },
    Vmul { vd: u8, vs: u8, vt: u8 },
    Vmov { vd: u8, vs: u8 },
    /// Any other sub-opcode. Registers are left alone but the frame is still redrawn.
    Other { op: u8 },
}

impl VectorOp {
    pub fn decode(word: u32) -> Self {
        let op = ((word >> 26) & 0x3F) as u8;
        let vs = ((word >> 21) & 0x1F) as u8;
        let vt = ((word >> 16) & 0x1F) as u8;
        let vd = ((word >> 11) & 0x1F) as u8;
        match op {
            OP_VADD => VectorOp::Vadd { vd, vs, vt },
            OP_VMUL => VectorOp::Vmul { vd, vs, vt },
            OP_VMOV => VectorOp::Vmov { vd, vs },
            op => VectorOp::Other { op },
        }
    }
}

/// Which contents the last [`VectorUnit::render`] presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSource {
    Framebuffer,
    TestPattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorUnit {
    regs: [u16; VREG_COUNT],
    scratch: Vec<u32>,
    pc: u32,
    cycles: u64,
    framebuffer: Framebuffer,
    use_test_pattern: bool,
}

impl Default for VectorUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorUnit {
    pub fn new() -> Self {
        Self {
            regs: [0; VREG_COUNT],
            scratch: vec![0; SCRATCH_WORDS],
            pc: 0,
            cycles: 0,
            framebuffer: Framebuffer::new(),
            use_test_pattern: true,
        }
    }

    pub fn reg(&self, index: usize) -> u16 {
        self.regs[index % VREG_COUNT]
    }

    /// Writes are truncated to 16 bits.
    pub fn set_reg(&mut self, index: usize, value: u32) {
        self.regs[index % VREG_COUNT] = (value & 0xFFFF) as u16;
    }

    pub fn regs(&self) -> &[u16; VREG_COUNT] {
        &self.regs
    }

    pub fn set_regs(&mut self, regs: [u16; VREG_COUNT]) {
        self.regs = regs;
    }

    pub fn scratch(&self) -> &[u32] {
        &self.scratch
    }

    /// Replaces scratch memory. Returns `false` (and changes nothing) on a length mismatch.
    pub fn load_scratch(&mut self, words: &[u32]) -> bool {
        if words.len() != SCRATCH_WORDS {
            return false;
        }
        self.scratch.copy_from_slice(words);
        true
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_cycles(&mut self, cycles: u64) {
        self.cycles = cycles;
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    pub fn use_test_pattern(&self) -> bool {
        self.use_test_pattern
    }

    pub fn set_use_test_pattern(&mut self, enabled: bool) {
        self.use_test_pattern = enabled;
    }

    /// Flips the test-pattern flag and returns the new value.
    pub fn toggle_test_pattern(&mut self) -> bool {
        self.use_test_pattern = !self.use_test_pattern;
        tracing::info!(enabled = self.use_test_pattern, "test pattern toggled");
        self.use_test_pattern
    }

    /// Clears registers, scratch memory and the coprocessor PC. The frame and test-pattern flag
    /// are kept.
    pub fn reset(&mut self) {
        self.regs = [0; VREG_COUNT];
        self.scratch.fill(0);
        self.pc = 0;
    }

    /// The frame color derived from the low bytes of `v0`, `v1`, `v2`.
    pub fn seed_color(&self) -> u32 {
        pack_rgb(self.regs[0] as u8, self.regs[1] as u8, self.regs[2] as u8)
    }

    /// Executes the micro-instruction at `pc` in `image` and returns the next scalar PC.
    ///
    /// Never fails: a fetch past the end of `image` is logged and treated as a skipped slot.
    pub fn execute_at(&mut self, image: &[u8], pc: u32) -> u32 {
        self.cycles = self.cycles.wrapping_add(CYCLES_DISPATCH);
        let next = pc.wrapping_add(4);

        let Some(word) = fetch(image, pc) else {
            tracing::warn!(pc = format_args!("{pc:#x}"), "vector fetch out of image bounds");
            return next;
        };

        let op = VectorOp::decode(word);
        self.apply(op);
        self.framebuffer.fill(self.seed_color());

        self.scratch[self.pc as usize % SCRATCH_WORDS] = word & 0xFFFF;
        self.pc = self.pc.wrapping_add(4);

        tracing::trace!(
            pc = format_args!("{pc:#x}"),
            ?op,
            color = format_args!("{:06x}", self.seed_color()),
            "vector step"
        );
        next
    }

    fn apply(&mut self, op: VectorOp) {
        match op {
            VectorOp::Vadd { vd, vs, vt } => {
                let sum = self.regs[vs as usize].wrapping_add(self.regs[vt as usize]);
                self.regs[vd as usize] = sum;
                self.cycles = self.cycles.wrapping_add(CYCLES_VADD);
            }
            VectorOp::Vmul { vd, vs, vt } => {
                let product = self.regs[vs as usize].wrapping_mul(self.regs[vt as usize]);
                self.regs[vd as usize] = product;
                self.cycles = self.cycles.wrapping_add(CYCLES_VMUL);
            }
            VectorOp::Vmov { vd, vs } => {
                self.regs[vd as usize] = self.regs[vs as usize];
                self.cycles = self.cycles.wrapping_add(CYCLES_VMOV);
            }
            VectorOp::Other { .. } => {}
        }
    }

    /// Prepares the frame for presentation.
    ///
    /// An all-zero frame is replaced by the coordinate test pattern when the flag is set, so the
    /// output is never blank. Does not touch registers or scratch memory.
    pub fn render(&mut self) -> RenderSource {
        self.cycles = self.cycles.wrapping_add(CYCLES_RENDER);
        if self.use_test_pattern && self.framebuffer.is_blank() {
            self.framebuffer.fill_test_pattern();
            return RenderSource::TestPattern;
        }
        RenderSource::Framebuffer
    }
}

fn fetch(image: &[u8], pc: u32) -> Option<u32> {
    let start = usize::try_from(pc).ok()?;
    let bytes = image.get(start..start.checked_add(4)?)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
