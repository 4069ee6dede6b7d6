use proptest::prelude::*;
use vr64_vector::{pack_rgb, RenderSource, VectorUnit, OP_VADD, OP_VMOV, OP_VMUL};

fn encode(op: u8, vs: u8, vt: u8, vd: u8) -> u32 {
    (op as u32) << 26 | (vs as u32) << 21 | (vt as u32) << 16 | (vd as u32) << 11
}

fn image_with(pc: usize, word: u32) -> Vec<u8> {
    let mut image = vec![0u8; pc + 4];
    image[pc..pc + 4].copy_from_slice(&word.to_be_bytes());
    image
}

#[test]
fn vadd_then_render_uses_low_bytes() {
    let mut vu = VectorUnit::new();
    vu.set_reg(1, 200);
    vu.set_reg(2, 100);
    let image = image_with(0x1000, encode(OP_VADD, 1, 2, 0));

    assert_eq!(vu.execute_at(&image, 0x1000), 0x1004);
    assert_eq!(vu.reg(0), 300);

    // v0 = 300 -> 44, v1 = 200, v2 = 100.
    let expected = pack_rgb(44, 200, 100);
    assert!(vu.framebuffer().pixels().iter().all(|&p| p == expected));
    assert_eq!(vu.render(), RenderSource::Framebuffer);
    assert_eq!(vu.framebuffer().pixel(160, 120), Some(expected));
}

#[test]
fn vmov_copies_register() {
    let mut vu = VectorUnit::new();
    vu.set_reg(7, 0xABCD);
    let image = image_with(0, encode(OP_VMOV, 7, 0, 3));
    vu.execute_at(&image, 0);
    assert_eq!(vu.reg(3), 0xABCD);
    assert_eq!(vu.reg(7), 0xABCD);
}

#[test]
fn cycles_accumulate_per_operation() {
    let mut vu = VectorUnit::new();
    let mut image = Vec::new();
    for word in [
        encode(OP_VADD, 0, 0, 0),
        encode(OP_VMUL, 0, 0, 0),
        encode(OP_VMOV, 0, 0, 0),
        encode(0x01, 0, 0, 0),
    ] {
        image.extend_from_slice(&word.to_be_bytes());
    }
    for pc in (0..16).step_by(4) {
        vu.execute_at(&image, pc);
    }
    assert_eq!(vu.cycles(), 4 * 10 + 8 + 10 + 6);
    vu.render();
    assert_eq!(vu.cycles(), 4 * 10 + 8 + 10 + 6 + 1000);
}

#[test]
fn blank_frame_gets_test_pattern_once() {
    let mut vu = VectorUnit::new();
    assert_eq!(vu.render(), RenderSource::TestPattern);
    let first = vu.framebuffer().clone();
    assert_eq!(vu.render(), RenderSource::Framebuffer);
    assert_eq!(vu.framebuffer(), &first);
}

#[test]
fn fetch_past_end_returns_next_pc() {
    let mut vu = VectorUnit::new();
    let image = vec![0u8; 0x1002];
    assert_eq!(vu.execute_at(&image, 0x1000), 0x1004);
    assert_eq!(vu.pc(), 0);
    assert!(vu.framebuffer().is_blank());
    assert_eq!(vu.cycles(), 10);
}

proptest! {
    #[test]
    fn vadd_wraps_to_16_bits(a in any::<u16>(), b in any::<u16>()) {
        let mut vu = VectorUnit::new();
        vu.set_reg(4, a as u32);
        vu.set_reg(5, b as u32);
        vu.execute_at(&image_with(0, encode(OP_VADD, 4, 5, 6)), 0);
        prop_assert_eq!(vu.reg(6) as u32, (a as u32 + b as u32) & 0xFFFF);
    }

    #[test]
    fn vmul_wraps_to_16_bits(a in any::<u16>(), b in any::<u16>()) {
        let mut vu = VectorUnit::new();
        vu.set_reg(4, a as u32);
        vu.set_reg(5, b as u32);
        vu.execute_at(&image_with(0, encode(OP_VMUL, 4, 5, 6)), 0);
        prop_assert_eq!(vu.reg(6) as u32, (a as u32 * b as u32) & 0xFFFF);
    }

    #[test]
    fn frame_is_uniform_after_any_step(word in any::<u32>(), v0 in any::<u16>(), v1 in any::<u16>(), v2 in any::<u16>()) {
        let mut vu = VectorUnit::new();
        vu.set_reg(0, v0 as u32);
        vu.set_reg(1, v1 as u32);
        vu.set_reg(2, v2 as u32);
        vu.execute_at(&word.to_be_bytes(), 0);
        let color = vu.seed_color();
        prop_assert!(vu.framebuffer().pixels().iter().all(|&p| p == color));
        prop_assert_eq!(vu.scratch()[0], word & 0xFFFF);
    }
}
