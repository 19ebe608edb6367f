//! Y, Cb and Cr plane description of CPU mapped YUV buffers.

use rkgralloc_shared::FormatId;

use crate::{GrallocError, Result, geometry::align};

/// Location of the Y, Cb and Cr samples of a CPU mapped YUV buffer, relative to the mapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct YcbcrLayout {
    pub y_offset: usize,
    pub cb_offset: usize,
    pub cr_offset: usize,
    pub y_stride: usize,
    pub c_stride: usize,
    /// Distance in bytes between two chroma samples of one component
    pub chroma_step: usize,
}

/// Describes the planes of a `format` buffer with luma stride `byte_stride` and `height` rows.
pub fn ycbcr_layout(format: FormatId, byte_stride: u32, height: u32) -> Result<YcbcrLayout> {
    let y_stride = byte_stride as usize;
    // Sub-sampled chroma needs an even number of luma rows
    let adjusted_height = align(height, 2) as usize;
    let y_size = y_stride * adjusted_height;

    let layout = match format {
        FormatId::NV12 | FormatId::RK_NV12 | FormatId::YCBCR_420_888 => YcbcrLayout {
            y_offset: 0,
            cb_offset: y_size,
            cr_offset: y_size + 1,
            y_stride,
            c_stride: y_stride,
            chroma_step: 2,
        },
        FormatId::NV21 => YcbcrLayout {
            y_offset: 0,
            cb_offset: y_size + 1,
            cr_offset: y_size,
            y_stride,
            c_stride: y_stride,
            chroma_step: 2,
        },
        FormatId::YV12 => {
            let c_stride = align(byte_stride / 2, 16) as usize;
            let c_size = c_stride * (adjusted_height / 2);
            YcbcrLayout {
                y_offset: 0,
                cb_offset: y_size + c_size,
                cr_offset: y_size,
                y_stride,
                c_stride,
                chroma_step: 1,
            }
        }
        other => {
            return Err(GrallocError::configuration(format!(
                "format {other} has no Y/Cb/Cr description"
            )));
        }
    };

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_chroma_is_interleaved_after_luma() {
        let layout = ycbcr_layout(FormatId::NV12, 1920, 1079).unwrap();

        assert_eq!(layout.cb_offset, 1920 * 1080);
        assert_eq!(layout.cr_offset, 1920 * 1080 + 1);
        assert_eq!(layout.c_stride, 1920);
        assert_eq!(layout.chroma_step, 2);
    }

    #[test]
    fn nv21_swaps_chroma() {
        let layout = ycbcr_layout(FormatId::NV21, 64, 64).unwrap();

        assert_eq!(layout.cr_offset, 64 * 64);
        assert_eq!(layout.cb_offset, 64 * 64 + 1);
    }

    #[test]
    fn yv12_has_separate_chroma_planes() {
        let layout = ycbcr_layout(FormatId::YV12, 2048, 1080).unwrap();

        assert_eq!(layout.c_stride, 1024);
        assert_eq!(layout.cr_offset, 2048 * 1080);
        assert_eq!(layout.cb_offset, 2048 * 1080 + 1024 * 540);
        assert_eq!(layout.chroma_step, 1);
    }

    #[test]
    fn rgb_has_no_ycbcr_description() {
        assert!(ycbcr_layout(FormatId::RGBA_8888, 256, 16).is_err());
    }
}
