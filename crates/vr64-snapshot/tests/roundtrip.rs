use std::io::Cursor;

use vr64_snapshot::{
    restore_snapshot, save_snapshot, Compression, CpuState, FramebufferState, RamWriteOptions,
    SaveOptions, SectionId, SlotError, Snapshot, SnapshotError, SnapshotMeta, SnapshotSlots,
    VectorState, SNAPSHOT_MAGIC,
};

fn sample(seed: u8) -> Snapshot {
    let mut gpr = [0u32; 32];
    for (i, reg) in gpr.iter_mut().enumerate() {
        *reg = (i as u32) * 0x0101_0101 ^ seed as u32;
    }
    Snapshot {
        meta: SnapshotMeta {
            frame_count: 42 + seed as u64,
            title: "ROUNDTRIP".to_string(),
        },
        cpu: CpuState { pc: 0x1234, gpr },
        vector: VectorState {
            regs: [seed as u16; 32],
            pc: 0x20,
            cycles: 99_000,
            scratch: (0..0x1000).map(|i| i & 0xFFFF).collect(),
        },
        framebuffer: FramebufferState {
            width: 4,
            height: 3,
            pixels: (0..12).map(|i| i * 0x0001_0203).collect(),
        },
        ram: (0..4096u32).map(|i| (i * 7) as u8 ^ seed).collect(),
    }
}

#[test]
fn encode_decode_preserves_every_field() {
    for compression in [Compression::None, Compression::Lz4] {
        let original = sample(3);
        let options = SaveOptions {
            ram: RamWriteOptions {
                compression,
                chunk_size: 1000,
            },
        };
        let mut buf = Cursor::new(Vec::new());
        original.encode(&mut buf, options).unwrap();
        assert_eq!(&buf.get_ref()[..8], SNAPSHOT_MAGIC);

        let decoded = Snapshot::decode(&mut Cursor::new(buf.into_inner()), 4096).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.fingerprint().unwrap(), original.fingerprint().unwrap());
    }
}

#[test]
fn restore_streams_into_a_target() {
    let original = sample(1);
    let mut buf = Cursor::new(Vec::new());
    save_snapshot(&mut buf, &original, SaveOptions::default()).unwrap();

    let mut target = Snapshot {
        ram: vec![0; 4096],
        ..Snapshot::default()
    };
    restore_snapshot(&mut Cursor::new(buf.into_inner()), &mut target).unwrap();
    assert_eq!(target, original);
}

#[test]
fn unknown_sections_are_skipped() {
    let original = sample(2);
    let mut buf = Cursor::new(Vec::new());
    original.encode(&mut buf, SaveOptions::default()).unwrap();
    let mut bytes = buf.into_inner();

    bytes.extend_from_slice(&0xBEEFu32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&3u64.to_le_bytes());
    bytes.extend_from_slice(&[1, 2, 3]);
    assert_eq!(SectionId(0xBEEF).name(), None);

    let decoded = Snapshot::decode(&mut Cursor::new(bytes), 4096).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn corrupt_inputs_are_errors() {
    let err = Snapshot::decode(&mut Cursor::new(b"NOTASNAP\x01\x00\x01\x00".to_vec()), 16)
        .unwrap_err();
    assert!(matches!(err, SnapshotError::InvalidMagic));

    let mut buf = Cursor::new(Vec::new());
    sample(0).encode(&mut buf, SaveOptions::default()).unwrap();
    let mut bytes = buf.into_inner();
    bytes.truncate(bytes.len() - 5);
    assert!(Snapshot::decode(&mut Cursor::new(bytes), 4096).is_err());

    let mut buf = Cursor::new(Vec::new());
    sample(0).encode(&mut buf, SaveOptions::default()).unwrap();
    let err = Snapshot::decode(&mut Cursor::new(buf.into_inner()), 8192).unwrap_err();
    assert!(matches!(err, SnapshotError::RamLenMismatch { .. }));
}

#[test]
fn capture_does_not_alias_source() {
    let mut live = sample(5);
    let snap = Snapshot::capture(&live).unwrap();

    live.cpu.gpr[4] = 0xDEAD;
    live.ram[10] ^= 0xFF;
    live.framebuffer.pixels[0] = 0xFFFFFF;
    live.vector.scratch[7] = 1;

    assert_eq!(snap, sample(5));
    assert_ne!(snap, live);
}

#[test]
fn slots_enforce_range_and_presence() {
    let mut slots = SnapshotSlots::new();
    let source = sample(7);

    assert!(matches!(
        slots.save(11, &source),
        Err(SlotError::OutOfRange { slot: 11 })
    ));
    assert!(matches!(
        slots.save(0, &source),
        Err(SlotError::OutOfRange { slot: 0 })
    ));

    let mut target = Snapshot {
        ram: vec![0; 4096],
        ..Snapshot::default()
    };
    let before = target.clone();
    assert!(matches!(
        slots.load(4, &mut target),
        Err(SlotError::NotFound { slot: 4 })
    ));
    assert_eq!(target, before);

    let saved = slots.save(3, &source).unwrap();
    let loaded = slots.load(3, &mut target).unwrap();
    assert_eq!(saved, loaded);
    assert_eq!(target, source);
    assert_eq!(slots.occupied().collect::<Vec<_>>(), vec![3]);
}

#[test]
fn saving_twice_replaces_slot() {
    let mut slots = SnapshotSlots::new();
    slots.save(1, &sample(1)).unwrap();
    slots.save(1, &sample(2)).unwrap();
    assert_eq!(slots.get(1).unwrap(), &sample(2));
}
