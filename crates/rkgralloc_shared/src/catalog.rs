//! Read-only pixel format descriptors.

use crate::FormatId;

/// Maximum number of planes of any supported format.
///
/// Plane 0 holds single-plane formats and luma, plane 1 U/V or interleaved UV, plane 2 V/U.
pub const MAX_PLANES: usize = 3;

/// Static description of a pixel format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub id: FormatId,
    /// Number of planes (1-3)
    pub npln: u8,
    /// Bits per pixel of each plane in AFBC allocations
    pub bpp_afbc: [u32; MAX_PLANES],
    /// Bits per pixel of each plane in linear allocations
    pub bpp: [u32; MAX_PLANES],
    pub hsub: u32,
    pub vsub: u32,
    /// Channel/word alignment in pixels
    pub align_w: u32,
    pub align_h: u32,
    /// Width alignment in pixels whenever the CPU touches the buffer
    pub align_w_cpu: u32,
    /// Linear tile edge in pixels
    pub tile_size: u32,
    pub is_yuv: bool,
    pub afbc: bool,
    pub linear: bool,
}

impl FormatInfo {
    /// Sub-sampled YUV: chroma has fewer samples than luma.
    pub fn is_subsampled_yuv(&self) -> bool {
        self.is_yuv && (self.hsub > 1 || self.vsub > 1)
    }
}

/// Lookup from format identifier to its descriptor.
pub trait FormatCatalog: Send + Sync {
    fn lookup(&self, id: FormatId) -> Option<&FormatInfo>;

    fn is_subsampled_yuv(&self, id: FormatId) -> bool {
        self.lookup(id).is_some_and(FormatInfo::is_subsampled_yuv)
    }
}

/// The allocator's built-in format table.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinCatalog;

impl FormatCatalog for BuiltinCatalog {
    fn lookup(&self, id: FormatId) -> Option<&FormatInfo> {
        FORMATS.iter().find(|info| info.id == id)
    }
}

const fn rgb(id: FormatId, bpp: u32) -> FormatInfo {
    FormatInfo {
        id,
        npln: 1,
        bpp_afbc: [bpp, 0, 0],
        bpp: [bpp, 0, 0],
        hsub: 1,
        vsub: 1,
        align_w: 1,
        align_h: 1,
        align_w_cpu: 1,
        tile_size: 1,
        is_yuv: false,
        afbc: true,
        linear: true,
    }
}

static FORMATS: &[FormatInfo] = &[
    rgb(FormatId::RGB_565, 16),
    rgb(FormatId::RGB_888, 24),
    rgb(FormatId::RGBA_8888, 32),
    rgb(FormatId::BGRA_8888, 32),
    rgb(FormatId::RGBX_8888, 32),
    rgb(FormatId::RGBA_1010102, 32),
    rgb(FormatId::RGBA_16161616, 64),
    FormatInfo {
        id: FormatId::BLOB,
        npln: 1,
        bpp_afbc: [0, 0, 0],
        bpp: [8, 0, 0],
        hsub: 1,
        vsub: 1,
        align_w: 1,
        align_h: 1,
        align_w_cpu: 1,
        tile_size: 1,
        is_yuv: false,
        afbc: false,
        linear: true,
    },
    FormatInfo {
        id: FormatId::Y8,
        npln: 1,
        bpp_afbc: [8, 0, 0],
        bpp: [8, 0, 0],
        hsub: 1,
        vsub: 1,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::Y16,
        npln: 1,
        bpp_afbc: [16, 0, 0],
        bpp: [16, 0, 0],
        hsub: 1,
        vsub: 1,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::YV12,
        npln: 3,
        bpp_afbc: [8, 8, 8],
        bpp: [8, 8, 8],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::NV12,
        npln: 2,
        bpp_afbc: [8, 16, 0],
        bpp: [8, 16, 0],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::NV21,
        npln: 2,
        bpp_afbc: [8, 16, 0],
        bpp: [8, 16, 0],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::YUV422_8BIT,
        npln: 1,
        bpp_afbc: [16, 0, 0],
        bpp: [16, 0, 0],
        hsub: 2,
        vsub: 1,
        align_w: 2,
        align_h: 1,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::Y210,
        npln: 1,
        bpp_afbc: [20, 0, 0],
        bpp: [32, 0, 0],
        hsub: 2,
        vsub: 1,
        align_w: 2,
        align_h: 1,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::Y410,
        npln: 1,
        bpp_afbc: [32, 0, 0],
        bpp: [32, 0, 0],
        hsub: 1,
        vsub: 1,
        align_w: 1,
        align_h: 1,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: true,
    },
    FormatInfo {
        id: FormatId::P010,
        npln: 2,
        bpp_afbc: [10, 20, 0],
        bpp: [16, 32, 0],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: false,
        linear: true,
    },
    FormatInfo {
        id: FormatId::P210,
        npln: 2,
        bpp_afbc: [10, 20, 0],
        bpp: [16, 32, 0],
        hsub: 2,
        vsub: 1,
        align_w: 2,
        align_h: 1,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: false,
        linear: true,
    },
    FormatInfo {
        id: FormatId::YUV420_8BIT_I,
        npln: 1,
        bpp_afbc: [12, 0, 0],
        bpp: [0, 0, 0],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: false,
    },
    FormatInfo {
        id: FormatId::YUV420_10BIT_I,
        npln: 1,
        bpp_afbc: [15, 0, 0],
        bpp: [0, 0, 0],
        hsub: 2,
        vsub: 2,
        align_w: 2,
        align_h: 2,
        align_w_cpu: 16,
        tile_size: 1,
        is_yuv: true,
        afbc: true,
        linear: false,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_has_a_valid_plane_count() {
        for info in FORMATS {
            assert!((1..=MAX_PLANES as u8).contains(&info.npln), "{}", info.id);
            assert!(info.hsub >= 1 && info.vsub >= 1, "{}", info.id);
        }
    }

    #[test]
    fn unknown_format_is_absent() {
        assert!(BuiltinCatalog.lookup(FormatId(0xdead)).is_none());
    }

    #[test]
    fn nv12_is_subsampled_but_rgba_is_not() {
        assert!(BuiltinCatalog.is_subsampled_yuv(FormatId::NV12));
        assert!(BuiltinCatalog.is_subsampled_yuv(FormatId::YUV420_8BIT_I));
        assert!(!BuiltinCatalog.is_subsampled_yuv(FormatId::RGBA_8888));
        assert!(!BuiltinCatalog.is_subsampled_yuv(FormatId::Y8));
    }
}
