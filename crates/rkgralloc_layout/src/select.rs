//! Internal format selection and the vendor NV12 layouts.

use log::{debug, info, warn};
use rkgralloc_shared::{FormatId, FormatModifiers, InternalFormat, MAX_PLANES, Usage};

use crate::{AllocationResult, AllocationType, GrallocError, PlaneLayout, Result, geometry::align};

/// Display heights at or above this cannot scan out AFBC layers.
const AFBC_LAYER_MAX_HEIGHT: u32 = 2160;
/// Luma stride alignment expected by the video decoder for vendor NV12.
const VENDOR_NV12_STRIDE_ALIGN: u32 = 16;

/// Configuration inputs of [`select_format`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct SelectionPolicy {
    /// Force AFBC for composer layers
    pub afbc_layer: bool,
    /// Keep the framebuffer target uncompressed even with `afbc_layer`
    pub disable_afbc_fb_target: bool,
    /// Height of the main display mode
    pub framebuffer_height: u32,
}

/// Chooses the internal format to allocate for `requested` with `usage`.
///
/// Modifiers given by the caller are kept unless the AFBC layer policy replaces the format.
pub fn select_format(
    requested: FormatId,
    modifiers: FormatModifiers,
    usage: Usage,
    policy: &SelectionPolicy,
) -> InternalFormat {
    let request = InternalFormat::new(requested, modifiers);

    if policy.afbc_layer && policy.framebuffer_height < AFBC_LAYER_MAX_HEIGHT {
        let afbc_rgba = InternalFormat::new(FormatId::RGBA_8888, FormatModifiers::AFBC_BASIC);
        let external = usage.contains(Usage::EXTERNAL_DISP);
        let layer_hint = usage.contains(Usage::AFBC_LAYER_HINT);

        let selected = if !usage.contains(Usage::HW_FB) {
            if !external && layer_hint {
                debug!("AFBC layer: forcing {afbc_rgba:?} for usage {:#x}", usage.bits());
                afbc_rgba
            } else {
                request
            }
        } else if !external && !layer_hint && !policy.disable_afbc_fb_target {
            info!("AFBC layer: forcing {afbc_rgba:?} for the framebuffer target");
            afbc_rgba
        } else {
            request
        };

        if selected != request {
            return selected;
        }
    }

    let base = match requested {
        FormatId::IMPLEMENTATION_DEFINED => {
            if usage.contains(Usage::HW_VIDEO_ENCODER) || usage.contains(Usage::HW_CAMERA_WRITE) {
                info!("Selecting NV12 for implementation defined usage {:#x}", usage.bits());
                FormatId::RK_NV12
            } else {
                info!("Selecting RGBX_8888 for implementation defined usage {:#x}", usage.bits());
                FormatId::RGBX_8888
            }
        }
        FormatId::RK_NV12_10 if usage.vendor_field_is(Usage::TO_USE_ARM_P010) => {
            debug!("Forcing P010 for usage {:#x}", usage.bits());
            FormatId::P010
        }
        FormatId::YCBCR_420_888 => FormatId::RK_NV12,
        other => other,
    };

    InternalFormat::new(base, modifiers)
}

/// Layout of the vendor NV12 formats, whose requested width is the decoder's luma stride.
pub(crate) fn vendor_nv12_layout(format: FormatId, width: u32, height: u32) -> Result<AllocationResult> {
    let byte_stride = if format == FormatId::RK_NV12_10 {
        if width % 2 != 0 || height % 2 != 0 {
            return Err(GrallocError::InvalidDimensions { width, height });
        }
        width
    } else {
        if width % 2 != 0 || height % 2 != 0 {
            warn!("Unexpected odd dimensions {width}x{height} for vendor NV12");
        }
        if width % VENDOR_NV12_STRIDE_ALIGN != 0 {
            warn!(
                "Luma stride {width} is not {VENDOR_NV12_STRIDE_ALIGN} aligned, the video decoder may misbehave"
            );
        }
        align(width, VENDOR_NV12_STRIDE_ALIGN)
    };

    // The decoder stores metadata after the image, twice the luma plane is enough
    let size = 2 * u64::from(byte_stride) * u64::from(height);
    let chroma_offset = u64::from(byte_stride) * u64::from(height);

    let mut plane_info = [PlaneLayout::default(); MAX_PLANES];
    plane_info[0] = PlaneLayout {
        offset: 0,
        byte_stride,
        alloc_width: width,
        alloc_height: height,
    };
    plane_info[1] = PlaneLayout {
        offset: usize::try_from(chroma_offset)
            .map_err(|_| GrallocError::geometry(format!("offset overflows: {chroma_offset}")))?,
        byte_stride,
        alloc_width: width / 2,
        alloc_height: height / 2,
    };

    debug!("Vendor NV12 {format}: {width}x{height}, stride {byte_stride}, size {size}");

    Ok(AllocationResult {
        alloc_type: AllocationType::uncompressed(2),
        alloc_format: InternalFormat::from(format),
        plane_info,
        plane_count: 2,
        size: usize::try_from(size)
            .map_err(|_| GrallocError::geometry(format!("size overflows: {size}")))?,
        pixel_stride: byte_stride,
        byte_stride,
        internal_width: width,
        internal_height: height,
    })
}

#[cfg(test)]
mod tests {
    use rkgralloc_shared::BuiltinCatalog;

    use super::*;
    use crate::{AllocationRequest, ErrorKind, calculate_layout};

    fn afbc_layer_policy() -> SelectionPolicy {
        SelectionPolicy {
            afbc_layer: true,
            disable_afbc_fb_target: false,
            framebuffer_height: 1080,
        }
    }

    #[test]
    fn implementation_defined_depends_on_usage() {
        let policy = SelectionPolicy::default();
        let encoder = select_format(
            FormatId::IMPLEMENTATION_DEFINED,
            FormatModifiers::empty(),
            Usage::HW_VIDEO_ENCODER,
            &policy,
        );
        let texture = select_format(
            FormatId::IMPLEMENTATION_DEFINED,
            FormatModifiers::empty(),
            Usage::HW_TEXTURE,
            &policy,
        );

        assert_eq!(encoder.base(), FormatId::RK_NV12);
        assert_eq!(texture.base(), FormatId::RGBX_8888);
    }

    #[test]
    fn flexible_yuv_and_p010_hint() {
        let policy = SelectionPolicy::default();

        assert_eq!(
            select_format(
                FormatId::YCBCR_420_888,
                FormatModifiers::empty(),
                Usage::empty(),
                &policy
            )
            .base(),
            FormatId::RK_NV12
        );
        assert_eq!(
            select_format(
                FormatId::RK_NV12_10,
                FormatModifiers::empty(),
                Usage::TO_USE_ARM_P010,
                &policy
            )
            .base(),
            FormatId::P010
        );
        assert_eq!(
            select_format(
                FormatId::RK_NV12_10,
                FormatModifiers::empty(),
                Usage::empty(),
                &policy
            )
            .base(),
            FormatId::RK_NV12_10
        );
    }

    #[test]
    fn afbc_layer_hint_forces_compressed_rgba() {
        let selected = select_format(
            FormatId::RGBX_8888,
            FormatModifiers::empty(),
            Usage::AFBC_LAYER_HINT | Usage::HW_COMPOSER,
            &afbc_layer_policy(),
        );

        assert_eq!(selected.base(), FormatId::RGBA_8888);
        assert!(selected.is_afbc());
    }

    #[test]
    fn afbc_layer_respects_framebuffer_policy() {
        let mut policy = afbc_layer_policy();
        let fb_target = select_format(FormatId::RGBA_8888, FormatModifiers::empty(), Usage::HW_FB, &policy);
        assert!(fb_target.is_afbc());

        policy.disable_afbc_fb_target = true;
        let fb_target = select_format(FormatId::RGBA_8888, FormatModifiers::empty(), Usage::HW_FB, &policy);
        assert!(!fb_target.is_afbc());

        policy = afbc_layer_policy();
        policy.framebuffer_height = 2160;
        let four_k = select_format(
            FormatId::RGBA_8888,
            FormatModifiers::empty(),
            Usage::AFBC_LAYER_HINT,
            &policy,
        );
        assert!(!four_k.is_afbc());
    }

    #[test]
    fn external_display_is_never_forced() {
        let selected = select_format(
            FormatId::RGB_565,
            FormatModifiers::empty(),
            Usage::AFBC_LAYER_HINT | Usage::EXTERNAL_DISP,
            &afbc_layer_policy(),
        );

        assert_eq!(selected, InternalFormat::from(FormatId::RGB_565));
    }

    #[test]
    fn vendor_nv12_uses_width_as_stride() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                width: 1920,
                height: 1088,
                format: FormatId::RK_NV12,
                modifiers: FormatModifiers::empty(),
                usage: Usage::HW_VIDEO_DECODER,
            },
        )
        .unwrap();
        let planes = layout.planes();

        assert_eq!(layout.byte_stride, 1920);
        assert_eq!(layout.pixel_stride, 1920);
        assert_eq!(layout.size, 2 * 1920 * 1088);
        assert_eq!(planes[1].offset, 1920 * 1088);
        assert_eq!((planes[1].alloc_width, planes[1].alloc_height), (960, 544));
    }

    #[test]
    fn vendor_nv12_stride_is_forced_to_16() {
        let layout = vendor_nv12_layout(FormatId::RK_NV12, 1000, 8).unwrap();

        assert_eq!(layout.byte_stride, 1008);
        assert_eq!(layout.size, 2 * 1008 * 8);
        assert_eq!(layout.internal_width, 1000);
    }

    #[test]
    fn vendor_nv12_10_rejects_odd_dimensions() {
        let err = vendor_nv12_layout(FormatId::RK_NV12_10, 641, 480).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);

        let layout = vendor_nv12_layout(FormatId::RK_NV12_10, 640, 480).unwrap();
        assert_eq!(layout.byte_stride, 640);
        assert_eq!(layout.size, 2 * 640 * 480);
    }
}
