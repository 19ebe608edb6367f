//! AFBC header initialization.

use log::trace;
use rkgralloc_shared::{FormatCatalog, FormatModifiers, InternalFormat};

use crate::{
    AllocationResult, GrallocError, Result,
    geometry::{AFBC_HEADER_BYTES_PER_BLOCK, AFBC_PIXELS_PER_BLOCK, afbc_buffer_align},
};

/// One 16 byte header entry, as four little-endian words.
type HeaderEntry = [u32; 4];

/// Superblock layouts 0, 3, 4 and 7 (not sub-sampled). The first word is the body offset.
const LAYOUT_PLAIN: HeaderEntry = [0, 0x1, 0x10000, 0x0];
/// Superblock layouts 1 and 5 (4:2:0 sub-sampled). The body offset is added to the first word.
const LAYOUT_SUBSAMPLED: HeaderEntry = [1 << 28, 0x8020_0040, 0x0100_4000, 0x0002_0080];

/// Header entry written for every superblock of a `width` x `height` plane.
pub fn header_entry(
    alloc_format: InternalFormat,
    subsampled_yuv: bool,
    is_multi_plane: bool,
    width: u32,
    height: u32,
) -> HeaderEntry {
    let is_tiled = alloc_format
        .modifiers()
        .contains(FormatModifiers::AFBC_TILED_HEADERS);
    let n_headers = u64::from(width) * u64::from(height) / AFBC_PIXELS_PER_BLOCK;
    let body_offset = afbc_buffer_align(is_tiled, n_headers * AFBC_HEADER_BYTES_PER_BLOCK) as u32;

    // Each plane of a multi-plane allocation has its own header, with no sub-sampling inside
    if subsampled_yuv && !is_multi_plane {
        let mut entry = LAYOUT_SUBSAMPLED;
        entry[0] = entry[0].wrapping_add(body_offset);
        entry
    } else if is_tiled {
        [0; 4]
    } else {
        let mut entry = LAYOUT_PLAIN;
        entry[0] = body_offset;
        entry
    }
}

/// Writes the initial AFBC header of one plane to the start of `buf`.
///
/// `width` and `height` must already be AFBC aligned.
pub fn init_afbc(
    buf: &mut [u8],
    alloc_format: InternalFormat,
    subsampled_yuv: bool,
    is_multi_plane: bool,
    width: u32,
    height: u32,
) -> Result<()> {
    let n_headers = u64::from(width) * u64::from(height) / AFBC_PIXELS_PER_BLOCK;
    let header_bytes = n_headers * AFBC_HEADER_BYTES_PER_BLOCK;
    if header_bytes > buf.len() as u64 {
        return Err(GrallocError::geometry(format!(
            "AFBC header of {header_bytes} bytes does not fit in {} bytes",
            buf.len()
        )));
    }

    let entry = header_entry(alloc_format, subsampled_yuv, is_multi_plane, width, height);
    trace!("Writing AFBC header {entry:x?} for format {alloc_format:?}");

    let mut bytes = [0u8; AFBC_HEADER_BYTES_PER_BLOCK as usize];
    for (chunk, word) in bytes.chunks_exact_mut(4).zip(entry) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    for header in buf[..header_bytes as usize].chunks_exact_mut(bytes.len()) {
        header.copy_from_slice(&bytes);
    }

    Ok(())
}

/// Writes the initial AFBC headers of every plane of `layout` into the mapped buffer `buf`.
pub fn init_afbc_planes(
    buf: &mut [u8],
    layout: &AllocationResult,
    catalog: &dyn FormatCatalog,
) -> Result<()> {
    if buf.len() < layout.size {
        return Err(GrallocError::geometry(format!(
            "mapping of {} bytes is smaller than the buffer size {}",
            buf.len(),
            layout.size
        )));
    }

    let subsampled_yuv = catalog.is_subsampled_yuv(layout.alloc_format.base());
    for plane in layout.planes() {
        init_afbc(
            &mut buf[plane.offset..],
            layout.alloc_format,
            subsampled_yuv,
            layout.alloc_type.is_multi_plane,
            plane.alloc_width,
            plane.alloc_height,
        )?;
    }

    Ok(())
}
