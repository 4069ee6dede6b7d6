#![allow(dead_code)]

use vr64_cpu::RESET_PC;
use vr64_image::{ProgramImage, MAGIC_BIG_ENDIAN};
use vr64_machine::{Machine, MachineConfig};

pub fn config() -> MachineConfig {
    MachineConfig {
        ram_words: 1 << 12,
        seed: 1234,
        ..MachineConfig::default()
    }
}

/// Image with `title` in the header and `words` starting at the reset vector.
pub fn image(title: &str, words: &[u32]) -> ProgramImage {
    let mut bytes = vec![0u8; RESET_PC as usize + words.len() * 4];
    bytes[..4].copy_from_slice(&MAGIC_BIG_ENDIAN);
    bytes[0x20..0x20 + title.len()].copy_from_slice(title.as_bytes());
    for (i, word) in words.iter().enumerate() {
        let at = RESET_PC as usize + i * 4;
        bytes[at..at + 4].copy_from_slice(&word.to_be_bytes());
    }
    ProgramImage::from_bytes(bytes, "test.z64").unwrap()
}

pub fn machine_with(title: &str, words: &[u32]) -> Machine {
    let mut machine = Machine::new(config()).unwrap();
    machine.load_image(image(title, words));
    machine
}

pub fn add(rd: u32, rs: u32, rt: u32) -> u32 {
    rs << 21 | rt << 16 | rd << 11
}

pub fn jump(target: u32) -> u32 {
    0x02 << 26 | (target >> 2)
}

pub fn ram_digest(machine: &Machine) -> blake3::Hash {
    let mut bytes = vec![0u8; machine.ram().len_bytes()];
    assert!(machine.ram().read_bytes(0, &mut bytes));
    blake3::hash(&bytes)
}
