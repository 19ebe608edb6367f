//! AFBC allocation type resolution and format validation.

use log::{error, warn};
use rkgralloc_shared::{FormatId, FormatInfo, FormatModifiers, Usage};

use crate::{GrallocError, Result};

/// Compression variant of an allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AllocBaseType {
    Uncompressed,
    /// 16x16 superblocks
    Afbc,
    /// 32x8 superblocks
    AfbcWideBlock,
    /// 64x4 superblocks
    AfbcExtraWideBlock,
}

/// Width and height in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub width: u32,
    pub height: u32,
}

impl AllocBaseType {
    /// AFBC superblock dimensions. Zero for uncompressed allocations.
    pub fn superblock(self) -> Rect {
        match self {
            Self::Uncompressed => Rect::default(),
            Self::Afbc => Rect {
                width: 16,
                height: 16,
            },
            Self::AfbcWideBlock => Rect {
                width: 32,
                height: 8,
            },
            Self::AfbcExtraWideBlock => Rect {
                width: 64,
                height: 4,
            },
        }
    }
}

/// How a buffer is laid out in memory, derived from the requested modifiers and usage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocationType {
    pub primary: AllocBaseType,
    /// Each plane has its own AFBC header and body. Requires tiled headers.
    pub is_multi_plane: bool,
    pub is_tiled: bool,
    pub is_padded: bool,
    /// A second AFBC body follows the first (front-buffer safe rendering)
    pub is_frontbuffer_safe: bool,
}

impl AllocationType {
    /// Uncompressed allocation of a format with `npln` planes.
    pub fn uncompressed(npln: u8) -> Self {
        Self {
            primary: AllocBaseType::Uncompressed,
            is_multi_plane: npln > 1,
            is_tiled: false,
            is_padded: false,
            is_frontbuffer_safe: false,
        }
    }

    /// Resolves the allocation type of `format` requested with `modifiers` and `usage`.
    ///
    /// Multi-plane AFBC requests that lack tiled headers or the extra-wide block bit fall
    /// back to single-plane AFBC with a warning.
    pub fn resolve(modifiers: FormatModifiers, format: &FormatInfo, usage: Usage) -> Result<Self> {
        let mut alloc_type = Self::uncompressed(format.npln);
        if !modifiers.is_afbc() {
            return Ok(alloc_type);
        }

        if format.is_yuv && modifiers.contains(FormatModifiers::AFBC_YUV_TRANSFORM) {
            warn!(
                "YUV transform is incorrectly enabled for format {} (modifiers {:#x})",
                format.id,
                modifiers.bits()
            );
        }

        let wide = modifiers.contains(FormatModifiers::AFBC_WIDEBLK);
        let extra_wide = modifiers.contains(FormatModifiers::AFBC_EXTRAWIDEBLK);

        // Wide takes precedence, extra-wide alone only selects the luma block
        alloc_type.primary = if wide {
            AllocBaseType::AfbcWideBlock
        } else if extra_wide {
            AllocBaseType::AfbcExtraWideBlock
        } else {
            AllocBaseType::Afbc
        };

        if modifiers.contains(FormatModifiers::AFBC_TILED_HEADERS) {
            alloc_type.is_tiled = true;

            if format.npln > 1 && !extra_wide {
                warn!(
                    "Extra-wide AFBC must be signalled for multi-plane formats, falling back to single plane AFBC"
                );
                alloc_type.is_multi_plane = false;
            }

            if modifiers.contains(FormatModifiers::AFBC_DOUBLE_BODY) {
                alloc_type.is_frontbuffer_safe = true;
            }
        } else {
            if format.npln > 1 {
                warn!(
                    "Multi-plane AFBC is not supported without tiling, falling back to single plane AFBC"
                );
            }
            alloc_type.is_multi_plane = false;
        }

        if extra_wide && !alloc_type.is_tiled {
            error!("Extra-wide block requested without tiled headers");
            return Err(GrallocError::configuration(
                "extra-wide block requires tiled headers",
            ));
        }

        if alloc_type.is_frontbuffer_safe && (wide || extra_wide) {
            error!("Front-buffer safe requested with wide/extra-wide block");
            return Err(GrallocError::configuration(
                "front-buffer safe is not supported with wide or extra-wide blocks",
            ));
        }

        if format.npln == 1 && wide && extra_wide {
            error!("Multi-plane AFBC requested for single plane format {}", format.id);
            return Err(GrallocError::configuration(
                "wide and extra-wide blocks imply a multi-plane format",
            ));
        }

        if usage.contains(Usage::AFBC_PADDING) {
            alloc_type.is_padded = true;
        }

        Ok(alloc_type)
    }

    pub fn is_afbc(&self) -> bool {
        self.primary != AllocBaseType::Uncompressed
    }

    /// Superblock dimensions of `plane`.
    ///
    /// Chroma planes of a multi-plane AFBC allocation always use extra-wide blocks.
    pub fn superblock(&self, plane: usize) -> Rect {
        if plane > 0 && self.is_afbc() && self.is_multi_plane {
            AllocBaseType::AfbcExtraWideBlock.superblock()
        } else {
            self.primary.superblock()
        }
    }
}

/// Checks that `format` can be allocated as `alloc_type` with the given `height`.
pub fn validate_format(format: &FormatInfo, alloc_type: &AllocationType, height: u32) -> Result<()> {
    if alloc_type.is_afbc() {
        if !format.afbc {
            error!("AFBC selected but not supported for base format {}", format.id);
            return Err(GrallocError::configuration(format!(
                "format {} does not support AFBC",
                format.id
            )));
        }

        if (format.npln == 1 && alloc_type.is_multi_plane)
            || (format.npln > 1 && !alloc_type.is_multi_plane)
        {
            let kind = if alloc_type.is_multi_plane { "multi" } else { "single" };
            error!(
                "Format {} with {} planes is incompatible with {kind}-plane AFBC",
                format.id, format.npln
            );
            return Err(GrallocError::configuration(format!(
                "format {} with {} planes is incompatible with {kind}-plane AFBC",
                format.id, format.npln
            )));
        }
    } else if !format.linear {
        error!("Uncompressed layout requested but not supported for format {}", format.id);
        return Err(GrallocError::configuration(format!(
            "format {} has no linear layout",
            format.id
        )));
    }

    if format.id == FormatId::BLOB && height != 1 {
        error!("Height for format BLOB must be 1");
        return Err(GrallocError::configuration("BLOB height must be 1"));
    }

    Ok(())
}
