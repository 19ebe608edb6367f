use crate::{FormatId, Usage};

/// Colour space and range tag carried on YUV buffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum YuvInfo {
    #[default]
    NoInfo,
    Bt601Narrow,
    Bt601Wide,
    Bt709Narrow,
    Bt709Wide,
}

impl YuvInfo {
    /// Derives the tag from the YUV configuration bits of `usage`.
    pub fn from_usage(usage: Usage, requested: FormatId) -> Self {
        match usage.yuv_conf() {
            0 if usage.vendor_field_is(Usage::TO_USE_ARM_P010) => Self::Bt709Wide,
            0 => Self::Bt601Narrow,
            1 if requested == FormatId::YCBCR_420_888 => {
                log::debug!("YCbCr_420_888 uses BT601 narrow");
                Self::Bt601Narrow
            }
            1 => Self::Bt601Wide,
            2 => Self::Bt709Narrow,
            _ => Self::Bt709Wide,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_conf_is_bt601_narrow() {
        assert_eq!(
            YuvInfo::from_usage(Usage::HW_TEXTURE, FormatId::NV12),
            YuvInfo::Bt601Narrow
        );
    }

    #[test]
    fn p010_hint_selects_bt709_wide() {
        let usage = Usage::TO_USE_ARM_P010;
        assert_eq!(YuvInfo::from_usage(usage, FormatId::RK_NV12_10), YuvInfo::Bt709Wide);
    }

    #[test]
    fn flexible_yuv_stays_narrow() {
        let usage = Usage::empty().with_yuv_conf(1);

        assert_eq!(
            YuvInfo::from_usage(usage, FormatId::YCBCR_420_888),
            YuvInfo::Bt601Narrow
        );
        assert_eq!(YuvInfo::from_usage(usage, FormatId::NV12), YuvInfo::Bt601Wide);
    }

    #[test]
    fn conf_two_and_three_are_bt709() {
        let narrow = Usage::empty().with_yuv_conf(2);
        let wide = Usage::empty().with_yuv_conf(3);

        assert_eq!(YuvInfo::from_usage(narrow, FormatId::NV12), YuvInfo::Bt709Narrow);
        assert_eq!(YuvInfo::from_usage(wide, FormatId::NV12), YuvInfo::Bt709Wide);
    }
}
