use crate::error::InvalidRamSize;

/// 2^20 words (4 MiB).
pub const DEFAULT_RAM_WORDS: usize = 1 << 20;

/// Word-addressed main memory. Addresses wrap modulo the (power-of-two) size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ram {
    words: Vec<u32>,
    mask: usize,
}

impl Default for Ram {
    fn default() -> Self {
        Self {
            words: vec![0; DEFAULT_RAM_WORDS],
            mask: DEFAULT_RAM_WORDS - 1,
        }
    }
}

impl Ram {
    pub fn new(words: usize) -> Result<Self, InvalidRamSize> {
        if words == 0 || !words.is_power_of_two() {
            return Err(InvalidRamSize(words));
        }
        Ok(Self {
            words: vec![0; words],
            mask: words - 1,
        })
    }

    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * 4
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn read(&self, index: u32) -> u32 {
        self.words[index as usize & self.mask]
    }

    pub fn write(&mut self, index: u32, value: u32) {
        self.words[index as usize & self.mask] = value;
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Copies out the little-endian byte image starting at byte `offset`.
    ///
    /// Returns `false` when the range does not lie entirely inside memory.
    pub fn read_bytes(&self, offset: usize, buf: &mut [u8]) -> bool {
        if offset.checked_add(buf.len()).map_or(true, |end| end > self.len_bytes()) {
            return false;
        }
        for (i, out) in buf.iter_mut().enumerate() {
            let byte = offset + i;
            *out = self.words[byte / 4].to_le_bytes()[byte % 4];
        }
        true
    }

    /// Inverse of [`Ram::read_bytes`].
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) -> bool {
        if offset.checked_add(data.len()).map_or(true, |end| end > self.len_bytes()) {
            return false;
        }
        for (i, &value) in data.iter().enumerate() {
            let byte = offset + i;
            let mut word = self.words[byte / 4].to_le_bytes();
            word[byte % 4] = value;
            self.words[byte / 4] = u32::from_le_bytes(word);
        }
        true
    }
}
