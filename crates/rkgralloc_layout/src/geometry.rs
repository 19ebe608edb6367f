//! Allocation geometry: plane dimensions, strides, offsets and total size.

use log::{debug, trace};
use rkgralloc_shared::{
    FormatCatalog, FormatId, FormatInfo, FormatModifiers, InternalFormat, MAX_PLANES, Usage,
};

use crate::{
    AllocationType, GrallocError, Result, alloc_type::validate_format, select::vendor_nv12_layout,
};

/// Pixels covered by one AFBC superblock, regardless of its shape.
pub const AFBC_PIXELS_PER_BLOCK: u64 = 256;
/// Bytes of AFBC header per superblock.
pub const AFBC_HEADER_BYTES_PER_BLOCK: u64 = 16;
/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 1 << 16;

const AFBC_BODY_ALIGN: u64 = 1024;
const AFBC_TILED_BODY_ALIGN: u64 = 4 * AFBC_BODY_ALIGN;
const AFBC_SUPERBLOCK_BYTE_ALIGN: u64 = 128;
const AFBC_GPU_TILE: u32 = 16;

/// A buffer as requested by a client.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    pub width: u32,
    pub height: u32,
    /// Base format, after format selection
    pub format: FormatId,
    pub modifiers: FormatModifiers,
    pub usage: Usage,
}

/// Memory layout of one plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct PlaneLayout {
    /// Byte offset from the start of the buffer. Includes the AFBC header of the plane
    pub offset: usize,
    pub byte_stride: u32,
    pub alloc_width: u32,
    pub alloc_height: u32,
}

/// The computed layout of a buffer. Immutable once computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocationResult {
    pub alloc_type: AllocationType,
    /// Base format plus the modifier bits that were honored
    pub alloc_format: InternalFormat,
    pub plane_info: [PlaneLayout; MAX_PLANES],
    pub plane_count: usize,
    /// Total size in bytes
    pub size: usize,
    /// Stride in pixels for CPU visible linear buffers, zero otherwise
    pub pixel_stride: u32,
    /// Byte stride of plane 0
    pub byte_stride: u32,
    pub internal_width: u32,
    pub internal_height: u32,
}

impl AllocationResult {
    pub fn planes(&self) -> &[PlaneLayout] {
        &self.plane_info[..self.plane_count]
    }
}

/// Rounds `value` up to a multiple of `alignment`. Alignments of 0 and 1 are no-ops.
pub fn align(value: u32, alignment: u32) -> u32 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

fn align_u64(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Least common multiple, or the larger value when either is zero.
pub fn lcm(a: u32, b: u32) -> u32 {
    if a != 0 && b != 0 {
        a / gcd(a, b) * b
    } else {
        a.max(b)
    }
}

/// Rounds an AFBC header or body size up to the buffer alignment.
pub fn afbc_buffer_align(is_tiled: bool, size: u64) -> u64 {
    align_u64(
        size,
        if is_tiled {
            AFBC_TILED_BODY_ALIGN
        } else {
            AFBC_BODY_ALIGN
        },
    )
}

/// Pads AFBC allocations to a multiple of the GPU tile size.
pub fn adjust_dimensions(modifiers: FormatModifiers, width: u32, height: u32) -> (u32, u32) {
    if modifiers.contains(FormatModifiers::AFBC_BASIC) {
        (align(width, AFBC_GPU_TILE), align(height, AFBC_GPU_TILE))
    } else {
        (width, height)
    }
}

/// Aligned allocation dimensions of `plane` in pixels.
fn plane_dimensions(
    width: u32,
    height: u32,
    format: &FormatInfo,
    alloc_type: &AllocationType,
    plane: usize,
    has_cpu_usage: bool,
) -> Result<(u32, u32)> {
    let sb = alloc_type.superblock(plane);

    let mut width = align(width, format.align_w);
    let mut height = align(height, format.align_h);

    if plane > 0 {
        if format.hsub == 0 || format.vsub == 0 {
            return Err(GrallocError::geometry(format!(
                "format {} has a zero sub-sampling factor ({}x{})",
                format.id, format.hsub, format.vsub
            )));
        }
        width /= format.hsub;
        height /= format.vsub;
    }

    let pixel_align_w = if has_cpu_usage {
        format.align_w_cpu
    } else if alloc_type.is_afbc() && alloc_type.is_padded && !format.is_yuv {
        // Four superblocks of 16 byte headers keep header rows 64 byte aligned
        4 * sb.width
    } else {
        0
    };

    let mut afbc_tile = sb;
    if alloc_type.is_tiled {
        let factor = if format.bpp_afbc[plane] > 32 { 4 } else { 8 };
        afbc_tile.width *= factor;
        afbc_tile.height *= factor;
    }

    trace!("Plane[{plane}]: [SUB-SAMPLE] w:{width}, h:{height}");
    trace!("Plane[{plane}]: [PIXEL_ALIGN] w:{pixel_align_w}");
    trace!("Plane[{plane}]: [LINEAR_TILE] w:{}", format.tile_size);
    trace!(
        "Plane[{plane}]: [AFBC_TILE] w:{}, h:{}",
        afbc_tile.width, afbc_tile.height
    );

    let align_w = 1.max(pixel_align_w).max(format.tile_size).max(afbc_tile.width);
    let align_h = 1.max(format.tile_size).max(afbc_tile.height);
    Ok((align(width, align_w), align(height, align_h)))
}

fn exact_div(value: u64, divisor: u64, what: &str) -> Result<u64> {
    if divisor == 0 || value % divisor != 0 {
        return Err(GrallocError::geometry(format!(
            "{what}: {value} is not divisible by {divisor}"
        )));
    }
    Ok(value / divisor)
}

fn to_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| GrallocError::geometry(format!("{what} overflows: {value}")))
}

/// Per-plane layout, total size and pixel stride computed for an already aligned size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    pub planes: [PlaneLayout; MAX_PLANES],
    pub size: u64,
    pub pixel_stride: u32,
}

/// Computes plane dimensions, strides, offsets and the total size of an allocation.
pub fn calc_allocation_size(
    width: u32,
    height: u32,
    alloc_type: &AllocationType,
    format: &FormatInfo,
    usage: Usage,
) -> Result<PlaneGeometry> {
    let has_cpu_usage = usage.has_cpu_usage();
    let has_hw_usage = usage.has_hw_usage();
    let mut planes = [PlaneLayout::default(); MAX_PLANES];
    let mut pixel_stride = 0;
    let mut size = 0u64;

    for plane in 0..usize::from(format.npln) {
        let (alloc_width, alloc_height) =
            plane_dimensions(width, height, format, alloc_type, plane, has_cpu_usage)?;
        trace!("Aligned w={alloc_width}, h={alloc_height} (in pixels)");

        let byte_stride = if alloc_type.is_afbc() {
            let bits = u64::from(alloc_width) * u64::from(format.bpp_afbc[plane]);
            to_u32(exact_div(bits, 8, "AFBC stride")?, "AFBC stride")?
        } else {
            let bits = u64::from(alloc_width) * u64::from(format.bpp[plane]);
            let mut byte_stride = to_u32(exact_div(bits, 8, "linear stride")?, "linear stride")?;

            let hw_align = match (has_hw_usage, format.is_yuv) {
                (false, _) => 0,
                (true, true) => 128,
                (true, false) => 64,
            };
            let cpu_align = if has_cpu_usage {
                let bits = u64::from(format.bpp[plane]) * u64::from(format.align_w_cpu);
                to_u32(exact_div(bits, 8, "CPU stride alignment")?, "CPU stride alignment")?
            } else {
                0
            };
            let stride_align = lcm(hw_align, cpu_align);
            byte_stride = align(byte_stride, stride_align);

            if format.id == FormatId::YV12 && has_hw_usage && has_cpu_usage {
                byte_stride = yv12_stride(plane, planes[0].byte_stride, byte_stride, stride_align)?;
            }
            byte_stride
        };
        trace!("Byte stride: {byte_stride}");

        if plane == 0 && !alloc_type.is_afbc() && has_cpu_usage {
            let bits = u64::from(byte_stride) * 8;
            pixel_stride = to_u32(
                exact_div(bits, u64::from(format.bpp[0]), "pixel stride")?,
                "pixel stride",
            )?;
            trace!("Pixel stride: {pixel_stride}");
        }

        let sb_num = u64::from(alloc_width) * u64::from(alloc_height) / AFBC_PIXELS_PER_BLOCK;

        let body_size = if alloc_type.is_afbc() {
            let sb = alloc_type.superblock(plane);
            let sb_bits = u64::from(format.bpp_afbc[plane]) * u64::from(sb.width * sb.height);
            let sb_bytes = align_u64(sb_bits / 8, AFBC_SUPERBLOCK_BYTE_ALIGN);
            let mut body_size = sb_num * sb_bytes;

            // Keeps the header of the following plane aligned
            if format.npln > 1 && plane < 2 {
                body_size = afbc_buffer_align(alloc_type.is_tiled, body_size);
            }

            if alloc_type.is_frontbuffer_safe {
                body_size += afbc_buffer_align(alloc_type.is_tiled, body_size);
            }
            body_size
        } else {
            u64::from(byte_stride) * u64::from(alloc_height)
        };
        trace!("Body size: {body_size}");

        let header_size = if alloc_type.is_afbc() {
            afbc_buffer_align(alloc_type.is_tiled, sb_num * AFBC_HEADER_BYTES_PER_BLOCK)
        } else {
            0
        };
        trace!("AFBC header size: {header_size}");

        let offset = if plane > 0 { size } else { 0 };
        planes[plane] = PlaneLayout {
            offset: usize::try_from(offset)
                .map_err(|_| GrallocError::geometry(format!("offset overflows: {offset}")))?,
            byte_stride,
            alloc_width,
            alloc_height,
        };

        size += body_size + header_size;
        trace!("size={size}");
    }

    Ok(PlaneGeometry {
        planes,
        size,
        pixel_stride,
    })
}

/// Chroma stride of YV12 must be half the luma stride, so luma gets twice the alignment.
fn yv12_stride(plane: usize, luma_stride: u32, byte_stride: u32, stride_align: u32) -> Result<u32> {
    if plane == 0 {
        return Ok(align(byte_stride, 2 * stride_align));
    }

    let chroma_stride = luma_stride / 2;
    if align(chroma_stride, stride_align) != chroma_stride || chroma_stride % 16 != 0 {
        return Err(GrallocError::geometry(format!(
            "YV12 chroma stride {chroma_stride} does not satisfy alignment {stride_align}"
        )));
    }
    Ok(chroma_stride)
}

/// Computes the full layout of `request`.
///
/// `request.format` is the selected base format. The vendor NV12 formats use the video
/// decoder's stride semantics instead of the generic calculation.
pub fn calculate_layout(
    catalog: &dyn FormatCatalog,
    request: &AllocationRequest,
) -> Result<AllocationResult> {
    let AllocationRequest {
        width,
        height,
        format,
        modifiers,
        usage,
    } = *request;

    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(GrallocError::InvalidDimensions { width, height });
    }

    if format.is_vendor_nv12() {
        return vendor_nv12_layout(format, width, height);
    }

    let info = catalog
        .lookup(format)
        .ok_or(GrallocError::UnknownFormat(format))?;

    let alloc_type = AllocationType::resolve(modifiers, info, usage)?;
    validate_format(info, &alloc_type, height)?;

    let (alloc_width, alloc_height) = adjust_dimensions(modifiers, width, height);
    let geometry = calc_allocation_size(alloc_width, alloc_height, &alloc_type, info, usage)?;
    let size = usize::try_from(geometry.size)
        .map_err(|_| GrallocError::geometry(format!("size overflows: {}", geometry.size)))?;

    debug!(
        "Layout for {width}x{height} format {format}: type {:?}, size {size}, stride {}",
        alloc_type.primary, geometry.planes[0].byte_stride
    );

    Ok(AllocationResult {
        alloc_type,
        alloc_format: InternalFormat::new(format, modifiers),
        plane_info: geometry.planes,
        plane_count: usize::from(info.npln),
        size,
        pixel_stride: geometry.pixel_stride,
        byte_stride: geometry.planes[0].byte_stride,
        internal_width: geometry.planes[0].alloc_width,
        internal_height: geometry.planes[0].alloc_height,
    })
}

#[cfg(test)]
mod tests {
    use rkgralloc_shared::BuiltinCatalog;

    use super::*;
    use crate::{AllocBaseType, ErrorKind};

    fn request(width: u32, height: u32, format: FormatId, usage: Usage) -> AllocationRequest {
        AllocationRequest {
            width,
            height,
            format,
            modifiers: FormatModifiers::empty(),
            usage,
        }
    }

    /// Catalog holding a single hand-written format.
    struct OneFormat(FormatInfo);

    impl FormatCatalog for OneFormat {
        fn lookup(&self, id: FormatId) -> Option<&FormatInfo> {
            (id == self.0.id).then_some(&self.0)
        }
    }

    const CUSTOM: FormatId = FormatId(0x1000);

    fn custom_format(npln: u8, bpp: u32, hsub: u32, vsub: u32) -> FormatInfo {
        FormatInfo {
            id: CUSTOM,
            npln,
            bpp_afbc: [bpp; MAX_PLANES],
            bpp: [bpp; MAX_PLANES],
            hsub,
            vsub,
            align_w: 1,
            align_h: 1,
            align_w_cpu: 1,
            tile_size: 1,
            is_yuv: npln > 1,
            afbc: false,
            linear: true,
        }
    }

    #[test]
    fn lcm_falls_back_to_the_larger_value() {
        assert_eq!(lcm(128, 16), 128);
        assert_eq!(lcm(64, 48), 192);
        assert_eq!(lcm(0, 16), 16);
        assert_eq!(lcm(0, 0), 0);
    }

    #[test]
    fn nv12_1080p_with_hw_and_cpu_usage() {
        let usage = Usage::HW_TEXTURE | Usage::SW_READ_OFTEN;
        let layout = calculate_layout(
            &BuiltinCatalog,
            &request(1920, 1080, FormatId::NV12, usage),
        )
        .unwrap();

        let [luma, chroma] = layout.planes() else {
            panic!("expected two planes");
        };
        assert_eq!(luma.offset, 0);
        assert_eq!(luma.byte_stride, 1920);
        assert_eq!((luma.alloc_width, luma.alloc_height), (1920, 1080));
        assert_eq!(chroma.offset, 1920 * 1080);
        assert_eq!(chroma.byte_stride, 1920);
        assert_eq!((chroma.alloc_width, chroma.alloc_height), (960, 540));
        assert_eq!(layout.size, 1920 * 1080 + 1920 * 540);
        assert_eq!(layout.pixel_stride, 1920);
        assert_eq!(layout.alloc_type.primary, AllocBaseType::Uncompressed);
    }

    #[test]
    fn rgba_afbc_256_square() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                modifiers: FormatModifiers::AFBC_BASIC,
                ..request(256, 256, FormatId::RGBA_8888, Usage::HW_TEXTURE)
            },
        )
        .unwrap();

        assert_eq!(layout.byte_stride, 1024);
        assert_eq!(layout.pixel_stride, 0);
        // 4096 bytes of header plus 256 superblocks of 1024 bytes
        assert_eq!(layout.size, 4096 + 256 * 1024);
        assert!(layout.alloc_format.is_afbc());
    }

    #[test]
    fn linear_rgba_stride_is_aligned_for_hardware() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &request(100, 10, FormatId::RGBA_8888, Usage::HW_COMPOSER),
        )
        .unwrap();

        assert_eq!(layout.byte_stride, 448);
        assert_eq!(layout.size, 4480);
        assert_eq!(layout.pixel_stride, 0);
    }

    #[test]
    fn rgb565_cpu_only_has_pixel_stride() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &request(33, 4, FormatId::RGB_565, Usage::SW_WRITE_OFTEN),
        )
        .unwrap();

        assert_eq!(layout.byte_stride, 66);
        assert_eq!(layout.pixel_stride, 33);
    }

    #[test]
    fn yv12_luma_alignment_is_doubled() {
        let usage = Usage::HW_TEXTURE | Usage::SW_READ_RARELY;
        let layout =
            calculate_layout(&BuiltinCatalog, &request(1920, 1080, FormatId::YV12, usage))
                .unwrap();
        let planes = layout.planes();

        assert_eq!(planes[0].byte_stride, 2048);
        assert_eq!(planes[1].byte_stride, 1024);
        assert_eq!(planes[2].byte_stride, 1024);
        assert_eq!(planes[1].offset, 2048 * 1080);
        assert_eq!(planes[2].offset, 2048 * 1080 + 1024 * 540);
        assert_eq!(layout.size, 2048 * 1080 + 2 * 1024 * 540);
    }

    #[test]
    fn tiled_afbc_uses_larger_alignment() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                modifiers: FormatModifiers::AFBC_BASIC | FormatModifiers::AFBC_TILED_HEADERS,
                ..request(100, 100, FormatId::RGBA_8888, Usage::HW_RENDER)
            },
        )
        .unwrap();
        let plane = layout.planes()[0];

        // Tile of 8x8 superblocks
        assert_eq!((plane.alloc_width, plane.alloc_height), (128, 128));
        let sb_num = 128 * 128 / 256;
        assert_eq!(layout.size, 4096 + sb_num * 1024);
    }

    #[test]
    fn frontbuffer_safe_doubles_the_body() {
        let modifiers = FormatModifiers::AFBC_BASIC
            | FormatModifiers::AFBC_TILED_HEADERS
            | FormatModifiers::AFBC_DOUBLE_BODY;
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                modifiers,
                ..request(128, 128, FormatId::RGBA_8888, Usage::HW_RENDER)
            },
        )
        .unwrap();

        assert!(layout.alloc_type.is_frontbuffer_safe);
        assert_eq!(layout.size, 4096 + 2 * 64 * 1024);
    }

    #[test]
    fn padded_afbc_aligns_width_to_four_superblocks() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                modifiers: FormatModifiers::AFBC_BASIC,
                ..request(80, 16, FormatId::RGBA_8888, Usage::HW_RENDER | Usage::AFBC_PADDING)
            },
        )
        .unwrap();

        assert_eq!(layout.internal_width, 128);
        assert_eq!(layout.byte_stride, 512);
    }

    #[test]
    fn multi_plane_afbc_offsets_follow_headers() {
        let modifiers = FormatModifiers::AFBC_BASIC
            | FormatModifiers::AFBC_TILED_HEADERS
            | FormatModifiers::AFBC_WIDEBLK
            | FormatModifiers::AFBC_EXTRAWIDEBLK;
        let layout = calculate_layout(
            &BuiltinCatalog,
            &AllocationRequest {
                modifiers,
                ..request(256, 64, FormatId::NV12, Usage::HW_VIDEO_DECODER)
            },
        )
        .unwrap();
        let planes = layout.planes();

        assert!(layout.alloc_type.is_multi_plane);
        assert_eq!((planes[0].alloc_width, planes[0].alloc_height), (256, 64));
        assert_eq!((planes[1].alloc_width, planes[1].alloc_height), (512, 32));
        assert_eq!(planes[1].offset, 4096 + 64 * 256);
        assert_eq!(layout.size, planes[1].offset + 4096 + 64 * 512);
    }

    #[test]
    fn rejects_bad_requests() {
        let catalog = BuiltinCatalog;
        let zero = calculate_layout(&catalog, &request(0, 16, FormatId::RGBA_8888, Usage::empty()));
        let unknown = calculate_layout(&catalog, &request(16, 16, FormatId(0x999), Usage::empty()));
        let blob = calculate_layout(&catalog, &request(16, 16, FormatId::BLOB, Usage::empty()));

        assert_eq!(zero.unwrap_err().kind(), ErrorKind::InvalidRequest);
        assert_eq!(unknown.unwrap_err().kind(), ErrorKind::InvalidRequest);
        assert_eq!(blob.unwrap_err().kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn blob_is_a_single_row() {
        let layout = calculate_layout(
            &BuiltinCatalog,
            &request(4096, 1, FormatId::BLOB, Usage::SW_READ_OFTEN | Usage::SW_WRITE_OFTEN),
        )
        .unwrap();

        assert_eq!(layout.size, 4096);
        assert_eq!(layout.pixel_stride, 4096);
    }

    #[test]
    fn identical_requests_give_identical_layouts() {
        let req = request(641, 479, FormatId::NV21, Usage::HW_CAMERA_WRITE | Usage::SW_READ_OFTEN);

        assert_eq!(
            calculate_layout(&BuiltinCatalog, &req).unwrap(),
            calculate_layout(&BuiltinCatalog, &req).unwrap()
        );
    }

    #[test]
    fn strides_respect_combined_alignment() {
        for format in [FormatId::NV12, FormatId::Y8, FormatId::RGB_888, FormatId::P010] {
            let usage = Usage::HW_TEXTURE | Usage::SW_READ_RARELY;
            let layout = calculate_layout(&BuiltinCatalog, &request(333, 77, format, usage)).unwrap();
            let info = BuiltinCatalog.lookup(format).unwrap();
            let hw_align = if info.is_yuv { 128 } else { 64 };

            let mut linear_total = 0;
            for (plane, layout) in layout.planes().iter().enumerate() {
                let cpu_align = info.bpp[plane] * info.align_w_cpu / 8;
                assert_eq!(layout.byte_stride % lcm(hw_align, cpu_align), 0, "{format}");
                linear_total += layout.byte_stride as usize * layout.alloc_height as usize;
            }
            assert!(layout.size >= linear_total, "{format}");
        }
    }

    #[test]
    fn stride_with_partial_bytes_is_a_geometry_error() {
        let catalog = OneFormat(custom_format(1, 12, 1, 1));

        // 3 pixels of 12 bits are 4.5 bytes
        let err = calculate_layout(&catalog, &request(3, 4, CUSTOM, Usage::HW_TEXTURE))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidFormatGeometry);
    }

    #[test]
    fn zero_subsampling_is_a_geometry_error() {
        let usage = Usage::HW_TEXTURE;
        for (hsub, vsub) in [(0, 2), (2, 0)] {
            let format = custom_format(2, 8, hsub, vsub);
            let alloc_type = AllocationType::uncompressed(format.npln);

            let err = calc_allocation_size(64, 64, &alloc_type, &format, usage).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormatGeometry);

            let catalog = OneFormat(format);
            let err = calculate_layout(&catalog, &request(64, 64, CUSTOM, usage)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidFormatGeometry);
        }
    }

    #[test]
    fn single_plane_formats_ignore_subsampling() {
        let catalog = OneFormat(custom_format(1, 8, 0, 0));

        let layout =
            calculate_layout(&catalog, &request(64, 64, CUSTOM, Usage::HW_TEXTURE)).unwrap();

        assert_eq!(layout.size, 64 * 64);
    }

    #[test]
    fn yv12_luma_doubles_the_alignment() {
        assert_eq!(yv12_stride(0, 0, 200, 64).unwrap(), 256);
        assert_eq!(yv12_stride(1, 256, 128, 64).unwrap(), 128);
    }

    #[test]
    fn yv12_rejects_misaligned_chroma() {
        // Half of 200 is not a multiple of 64
        let err = yv12_stride(1, 200, 128, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormatGeometry);

        // 72 is 8 aligned but not 16 aligned
        let err = yv12_stride(2, 144, 72, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormatGeometry);
    }
}
