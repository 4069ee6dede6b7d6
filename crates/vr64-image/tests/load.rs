use proptest::prelude::*;
use vr64_image::{
    ByteOrder, ImageKind, LoadError, ProgramImage, MAGIC_BIG_ENDIAN, MAGIC_BYTE_SWAPPED,
    MAGIC_LITTLE_ENDIAN,
};

fn canonical_image(len: usize) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
    bytes[..4].copy_from_slice(&MAGIC_BIG_ENDIAN);
    bytes
}

#[test]
fn all_byte_orders_keep_length() {
    let canonical = canonical_image(0x100);

    let mut swapped = canonical.clone();
    swapped[..4].copy_from_slice(&MAGIC_BYTE_SWAPPED);

    let mut reversed = canonical.clone();
    reversed.reverse();
    reversed[..4].copy_from_slice(&MAGIC_LITTLE_ENDIAN);

    for bytes in [canonical.clone(), swapped, reversed] {
        let image = ProgramImage::from_bytes(bytes, "t").unwrap();
        assert_eq!(image.len(), canonical.len());
    }
}

#[test]
fn little_endian_round_trips_to_canonical() {
    let canonical = canonical_image(0x80);
    let mut reversed = canonical.clone();
    reversed.reverse();

    let image = ProgramImage::from_bytes(reversed, "t").unwrap();
    assert_eq!(image.as_bytes(), canonical.as_slice());
    assert_eq!(image.kind(), ImageKind::Cartridge(ByteOrder::LittleEndian));
}

#[test]
fn invalid_header_is_rejected() {
    let mut bytes = canonical_image(64);
    bytes[0] = 0;
    let err = ProgramImage::from_bytes(bytes, "t").unwrap_err();
    assert!(matches!(err, LoadError::InvalidHeader { .. }));
}

#[test]
fn load_from_file_uses_file_name_as_fallback_title() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.z64");
    let mut bytes = vec![0u8; 64];
    bytes[..4].copy_from_slice(&MAGIC_BIG_ENDIAN);
    std::fs::write(&path, bytes).unwrap();

    let image = ProgramImage::load(&path).unwrap();
    assert_eq!(image.title(), "blank.z64");
}

#[test]
fn load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ProgramImage::load(&dir.path().join("missing.z64")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}

proptest! {
    #[test]
    fn loading_is_deterministic(tail in proptest::collection::vec(any::<u8>(), 60..512)) {
        for magic in [MAGIC_BIG_ENDIAN, MAGIC_BYTE_SWAPPED, MAGIC_LITTLE_ENDIAN] {
            let mut bytes = magic.to_vec();
            bytes.extend_from_slice(&tail);
            if magic == MAGIC_BYTE_SWAPPED && bytes.len() % 2 != 0 {
                bytes.push(0);
            }
            let a = ProgramImage::from_bytes(bytes.clone(), "p").unwrap();
            let b = ProgramImage::from_bytes(bytes.clone(), "p").unwrap();
            prop_assert_eq!(a.len(), bytes.len());
            prop_assert_eq!(&a, &b);
        }
    }
}
