pub const SNAPSHOT_MAGIC: &[u8; 8] = b"VR64SNAP";
pub const SNAPSHOT_VERSION_V1: u16 = 1;
pub const SNAPSHOT_ENDIANNESS_LITTLE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(pub u32);

impl SectionId {
    pub const META: SectionId = SectionId(1);
    pub const CPU: SectionId = SectionId(2);
    pub const VECTOR: SectionId = SectionId(3);
    pub const FRAMEBUFFER: SectionId = SectionId(4);
    pub const RAM: SectionId = SectionId(5);

    pub fn name(self) -> Option<&'static str> {
        match self {
            SectionId::META => Some("META"),
            SectionId::CPU => Some("CPU"),
            SectionId::VECTOR => Some("VECTOR"),
            SectionId::FRAMEBUFFER => Some("FRAMEBUFFER"),
            SectionId::RAM => Some("RAM"),
            _ => None,
        }
    }
}
