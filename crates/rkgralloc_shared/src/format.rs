//! Pixel format identifiers and the extended modifier bits that ride along with them.

use std::fmt;

use bitflags::bitflags;

/// A base pixel format identifier.
///
/// Values below `0x100` and the fourcc-style values are the platform HAL codes, the
/// `0x1xx` range is private to the allocator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatId(pub u32);

impl FormatId {
    pub const RGBA_8888: FormatId = FormatId(0x1);
    pub const RGBX_8888: FormatId = FormatId(0x2);
    pub const RGB_888: FormatId = FormatId(0x3);
    pub const RGB_565: FormatId = FormatId(0x4);
    pub const BGRA_8888: FormatId = FormatId(0x5);
    /// Vendor NV12 with decoder-mandated stride semantics
    pub const RK_NV12: FormatId = FormatId(0x15);
    pub const RGBA_16161616: FormatId = FormatId(0x16);
    /// Vendor 10-bit NV12 with decoder-mandated stride semantics
    pub const RK_NV12_10: FormatId = FormatId(0x17);
    pub const BLOB: FormatId = FormatId(0x21);
    pub const IMPLEMENTATION_DEFINED: FormatId = FormatId(0x22);
    pub const YCBCR_420_888: FormatId = FormatId(0x23);
    pub const RGBA_1010102: FormatId = FormatId(0x2B);
    pub const Y8: FormatId = FormatId(0x2020_3859);
    pub const Y16: FormatId = FormatId(0x2036_3159);
    pub const YV12: FormatId = FormatId(0x3231_5659);

    pub const NV12: FormatId = FormatId(0x101);
    pub const NV21: FormatId = FormatId(0x102);
    pub const YUV422_8BIT: FormatId = FormatId(0x103);
    pub const Y210: FormatId = FormatId(0x104);
    pub const Y410: FormatId = FormatId(0x105);
    pub const P010: FormatId = FormatId(0x106);
    pub const P210: FormatId = FormatId(0x107);
    pub const YUV420_8BIT_I: FormatId = FormatId(0x108);
    pub const YUV420_10BIT_I: FormatId = FormatId(0x109);

    /// Returns `true` for the vendor NV12 variants that bypass the generic calculator.
    pub fn is_vendor_nv12(self) -> bool {
        self == Self::RK_NV12 || self == Self::RK_NV12_10
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

bitflags! {
    /// Extended format bits, stored in the upper 32 bits of an internal format.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FormatModifiers: u64 {
        const AFBC_BASIC = 1 << 32;
        const AFBC_SPLITBLK = 1 << 33;
        const AFBC_WIDEBLK = 1 << 34;
        const AFBC_TILED_HEADERS = 1 << 35;
        const AFBC_EXTRAWIDEBLK = 1 << 36;
        const AFBC_DOUBLE_BODY = 1 << 37;
        const AFBC_BCH = 1 << 38;
        const AFBC_YUV_TRANSFORM = 1 << 39;
        const AFBC_SPARSE = 1 << 40;
    }
}

impl FormatModifiers {
    /// Any modifier that turns on AFBC.
    pub const AFBC_ENABLE: FormatModifiers = FormatModifiers::AFBC_BASIC;

    pub fn is_afbc(self) -> bool {
        self.intersects(Self::AFBC_ENABLE)
    }
}

/// A base format combined with its modifier bits, as carried on a buffer handle.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct InternalFormat(pub u64);

impl InternalFormat {
    const FMT_MASK: u64 = 0x0000_0000_ffff_ffff;
    const EXT_MASK: u64 = 0xffff_ffff_0000_0000;

    pub fn new(base: FormatId, modifiers: FormatModifiers) -> Self {
        Self(u64::from(base.0) | (modifiers.bits() & Self::EXT_MASK))
    }

    pub fn base(self) -> FormatId {
        FormatId((self.0 & Self::FMT_MASK) as u32)
    }

    pub fn modifiers(self) -> FormatModifiers {
        FormatModifiers::from_bits_retain(self.0 & Self::EXT_MASK)
    }

    pub fn is_afbc(self) -> bool {
        self.modifiers().is_afbc()
    }
}

impl From<FormatId> for InternalFormat {
    fn from(base: FormatId) -> Self {
        Self::new(base, FormatModifiers::empty())
    }
}

impl fmt::Debug for InternalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
