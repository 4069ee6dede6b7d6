use rand::Rng;

use crate::error::MachineError;

/// Chance that an active code fires on a given iteration.
pub const CHEAT_PROBABILITY: f64 = 0.1;

/// Register a firing cheat overwrites.
pub const CHEAT_REGISTER: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheatCode {
    code: String,
    value: u32,
}

impl CheatCode {
    /// Parses a hexadecimal code, with or without a `0x` prefix.
    pub fn parse(code: &str) -> Result<Self, MachineError> {
        let trimmed = code.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let invalid = || MachineError::InvalidCheat {
            code: code.to_string(),
        };
        if digits.is_empty() || digits.len() > 32 {
            return Err(invalid());
        }
        let parsed = u128::from_str_radix(digits, 16).map_err(|_| invalid())?;
        Ok(Self {
            code: trimmed.to_string(),
            value: (parsed % 0xFFFF) as u32,
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Parsed value reduced modulo `0xFFFF`.
    pub fn value(&self) -> u32 {
        self.value
    }
}

/// Active cheat codes. Adding a code that is already active is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CheatList {
    codes: Vec<CheatCode>,
}

impl CheatList {
    pub fn add(&mut self, code: &str) -> Result<&CheatCode, MachineError> {
        let cheat = CheatCode::parse(code)?;
        let index = match self.codes.iter().position(|c| c.code == cheat.code) {
            Some(index) => index,
            None => {
                tracing::info!(code = cheat.code(), "cheat added");
                self.codes.push(cheat);
                self.codes.len() - 1
            }
        };
        Ok(&self.codes[index])
    }

    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.codes.len();
        self.codes.retain(|c| c.code != code.trim());
        before != self.codes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheatCode> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Rolls each code independently; every hit overwrites the target. Returns the last value
    /// written, if any.
    pub fn roll<R: Rng>(&self, rng: &mut R, mut write: impl FnMut(u32)) -> Option<u32> {
        let mut last = None;
        for cheat in &self.codes {
            if rng.gen_bool(CHEAT_PROBABILITY) {
                tracing::debug!(code = cheat.code(), "cheat applied");
                write(cheat.value);
                last = Some(cheat.value);
            }
        }
        last
    }
}
