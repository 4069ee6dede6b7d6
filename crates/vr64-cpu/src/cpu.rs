pub const GPR_COUNT: usize = 32;

/// Program counter value after reset.
pub const RESET_PC: u32 = 0x1000;

/// Return-address register written by `JAL`.
pub const REG_RA: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuState {
    gpr: [u32; GPR_COUNT],
    pub pc: u32,
}

impl Default for CpuState {
    fn default() -> Self {
        Self {
            gpr: [0; GPR_COUNT],
            pc: RESET_PC,
        }
    }
}

impl CpuState {
    /// Register 0 is an ordinary register; nothing pins it to zero.
    pub fn reg(&self, index: usize) -> u32 {
        self.gpr[index % GPR_COUNT]
    }

    pub fn set_reg(&mut self, index: usize, value: u32) {
        self.gpr[index % GPR_COUNT] = value;
    }

    pub fn regs(&self) -> &[u32; GPR_COUNT] {
        &self.gpr
    }

    pub fn set_regs(&mut self, regs: [u32; GPR_COUNT]) {
        self.gpr = regs;
    }

    pub fn clear_regs(&mut self) {
        self.gpr = [0; GPR_COUNT];
    }
}
