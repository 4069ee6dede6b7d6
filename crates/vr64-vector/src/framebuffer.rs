pub const FB_WIDTH: usize = 320;
pub const FB_HEIGHT: usize = 240;
pub const FB_PIXELS: usize = FB_WIDTH * FB_HEIGHT;

/// Packs 8-bit channels as `0xRRGGBB`.
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// 320x240 grid of `0xRRGGBB` pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Vec<u32>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; FB_PIXELS],
        }
    }

    pub fn width(&self) -> usize {
        FB_WIDTH
    }

    pub fn height(&self) -> usize {
        FB_HEIGHT
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= FB_WIDTH || y >= FB_HEIGHT {
            return None;
        }
        Some(self.pixels[y * FB_WIDTH + x])
    }

    /// Replaces the whole buffer. Returns `false` (and changes nothing) on a length mismatch.
    pub fn copy_from(&mut self, pixels: &[u32]) -> bool {
        if pixels.len() != FB_PIXELS {
            return false;
        }
        self.pixels.copy_from_slice(pixels);
        true
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == 0)
    }

    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color & 0x00FF_FFFF);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Coordinate gradient shown in place of an empty frame.
    pub fn fill_test_pattern(&mut self) {
        for y in 0..FB_HEIGHT {
            for x in 0..FB_WIDTH {
                let r = (x * 255 / FB_WIDTH) % 256;
                let g = (y * 255 / FB_HEIGHT) % 256;
                let b = ((x + y) * 255 / (FB_WIDTH + FB_HEIGHT)) % 256;
                self.pixels[y * FB_WIDTH + x] = pack_rgb(r as u8, g as u8, b as u8);
            }
        }
    }

    /// Tightly packed RGB8 bytes, suitable for image encoders.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for &p in &self.pixels {
            out.push((p >> 16) as u8);
            out.push((p >> 8) as u8);
            out.push(p as u8);
        }
        out
    }
}
