pub const OP_ADD: u8 = 0x00;
pub const OP_J: u8 = 0x02;
pub const OP_JAL: u8 = 0x03;
pub const OP_LUI: u8 = 0x0F;
pub const OP_LW: u8 = 0x23;
pub const OP_SW: u8 = 0x2B;

/// Decoded scalar instruction. Register fields are already reduced to `0..32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Add { rd: u8, rs: u8, rt: u8 },
    Lui { rt: u8, imm: u16 },
    Lw { rt: u8, imm: u16 },
    /// Hands `rt` to the vector unit and lets it pick the next PC.
    Sw { rt: u8 },
    J { target: u32 },
    Jal { target: u32 },
    Unknown { opcode: u8 },
}

impl Instruction {
    pub fn decode(word: u32) -> Self {
        let opcode = (word >> 26) as u8;
        let rs = ((word >> 21) & 0x1F) as u8;
        let rt = ((word >> 16) & 0x1F) as u8;
        let rd = ((word >> 11) & 0x1F) as u8;
        let imm = word as u16;
        let target = word & 0x03FF_FFFF;

        match opcode {
            OP_ADD => Instruction::Add { rd, rs, rt },
            OP_LUI => Instruction::Lui { rt, imm },
            OP_LW => Instruction::Lw { rt, imm },
            OP_SW => Instruction::Sw { rt },
            OP_J => Instruction::J { target },
            OP_JAL => Instruction::Jal { target },
            opcode => Instruction::Unknown { opcode },
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Add { .. } => "add",
            Instruction::Lui { .. } => "lui",
            Instruction::Lw { .. } => "lw",
            Instruction::Sw { .. } => "sw",
            Instruction::J { .. } => "j",
            Instruction::Jal { .. } => "jal",
            Instruction::Unknown { .. } => "unknown",
        }
    }
}

/// Absolute jump target: the top nibble of `pc` joined with `target << 2`.
pub fn jump_target(pc: u32, target: u32) -> u32 {
    (pc & 0xF000_0000) | (target << 2)
}
