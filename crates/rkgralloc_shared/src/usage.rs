//! Buffer usage flags.

use bitflags::bitflags;

bitflags! {
    /// Producer/consumer usage of a buffer.
    ///
    /// Some entries are multi-bit fields rather than single flags (the SW read/write
    /// frequency, the vendor field under `ROT_MASK` and the YUV configuration), use the
    /// helper methods to compare them.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Usage: u64 {
        const SW_READ_RARELY = 0x2;
        const SW_READ_OFTEN = 0x3;
        const SW_READ_MASK = 0xF;
        const SW_WRITE_RARELY = 0x20;
        const SW_WRITE_OFTEN = 0x30;
        const SW_WRITE_MASK = 0xF0;
        const HW_TEXTURE = 0x100;
        const HW_RENDER = 0x200;
        const HW_2D = 0x400;
        const HW_COMPOSER = 0x800;
        const HW_FB = 0x1000;
        const EXTERNAL_DISP = 0x2000;
        const PROTECTED = 0x4000;
        const CURSOR = 0x8000;
        const HW_VIDEO_ENCODER = 0x1_0000;
        const HW_CAMERA_WRITE = 0x2_0000;
        const HW_CAMERA_READ = 0x4_0000;
        const RENDERSCRIPT = 0x10_0000;
        const HW_VIDEO_DECODER = 0x40_0000;

        /// Vendor field, compared by value
        const ROT_MASK = 0x0F00_0000;
        const TO_USE_PHY_CONT = 0x0800_0000;
        const TO_USE_ARM_P010 = 0x0A00_0000;

        const PRIVATE_MASK = 0xF000_0000;

        const AFBC_PADDING = 1 << 49;
        const YUV_CONF_MASK = 0b11 << 50;
        const ALLOCATOR_PRIVATE_MASK = 0xFFFF << 48;
    }
}

impl Usage {
    /// Usage combination that requests an AFBC composer layer.
    pub const AFBC_LAYER_HINT: Usage = Usage::from_bits_retain(0x88);

    /// Creates usage flags from a raw value, keeping unknown bits.
    pub fn from_raw(raw: u64) -> Self {
        Self::from_bits_retain(raw)
    }

    /// CPU read or write access was requested.
    pub fn has_cpu_usage(self) -> bool {
        self.bits() & (Self::SW_READ_MASK.bits() | Self::SW_WRITE_MASK.bits()) != 0
    }

    /// Any hardware IP block accesses the buffer.
    pub fn has_hw_usage(self) -> bool {
        let non_hw = Self::PRIVATE_MASK.bits()
            | Self::SW_READ_MASK.bits()
            | Self::SW_WRITE_MASK.bits()
            | Self::ALLOCATOR_PRIVATE_MASK.bits();
        self.bits() & !non_hw != 0
    }

    pub fn reads_often(self) -> bool {
        self.bits() & Self::SW_READ_MASK.bits() == Self::SW_READ_OFTEN.bits()
    }

    /// Compares the vendor field under [`Usage::ROT_MASK`] against `value`.
    pub fn vendor_field_is(self, value: Usage) -> bool {
        self.bits() & Self::ROT_MASK.bits() == value.bits()
    }

    /// YUV configuration index (0-3).
    pub fn yuv_conf(self) -> u8 {
        ((self.bits() & Self::YUV_CONF_MASK.bits()) >> 50) as u8
    }

    pub fn with_yuv_conf(self, conf: u8) -> Self {
        let bits = (self.bits() & !Self::YUV_CONF_MASK.bits()) | (u64::from(conf & 0b11) << 50);
        Self::from_bits_retain(bits)
    }
}
