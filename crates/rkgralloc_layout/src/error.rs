//! Error types for buffer layout and allocation.

use rkgralloc_shared::FormatId;
use thiserror::Error;

/// Result type alias using [`GrallocError`].
pub type Result<T> = std::result::Result<T, GrallocError>;

/// Coarse classification of a [`GrallocError`], as reported to callers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad dimensions, unknown format or a rejected format/usage combination.
    InvalidRequest,
    /// An alignment or divisibility invariant did not hold. Indicates a defect.
    InvalidFormatGeometry,
    /// The backing-object transport failed.
    ResourceExhausted,
    /// Mapping refused for a protected buffer.
    MappingDenied,
    /// Release of an object without a live reference.
    DoubleRelease,
}

/// Main error type for rkgralloc operations.
#[derive(Error, Debug)]
pub enum GrallocError {
    /// Format id is not in the catalog.
    #[error("unknown format {0}")]
    UnknownFormat(FormatId),

    /// Width or height is zero or out of range.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Modifier, usage and format do not fit together.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Layout invariant violated.
    #[error("format geometry invariant violated: {0}")]
    FormatGeometry(String),

    /// Backing-object transport call failed.
    #[error("{op} failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("mapping denied for protected buffer")]
    MappingDenied,

    #[error("object {0} released without a live reference")]
    DoubleRelease(u32),

    /// The reference count of an object would exceed `u32::MAX`.
    #[error("too many references to object {0}")]
    RefCountOverflow(u32),
}

impl GrallocError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownFormat(_)
            | Self::InvalidDimensions { .. }
            | Self::InvalidConfiguration(_) => ErrorKind::InvalidRequest,
            Self::FormatGeometry(_) => ErrorKind::InvalidFormatGeometry,
            Self::Transport { .. } | Self::RefCountOverflow(_) => ErrorKind::ResourceExhausted,
            Self::MappingDenied => ErrorKind::MappingDenied,
            Self::DoubleRelease(_) => ErrorKind::DoubleRelease,
        }
    }

    /// Wraps a failed transport call.
    pub fn transport(op: &'static str, source: impl Into<std::io::Error>) -> Self {
        Self::Transport {
            op,
            source: source.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Self::FormatGeometry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_their_kind() {
        assert_eq!(
            GrallocError::UnknownFormat(FormatId(7)).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            GrallocError::geometry("odd stride").kind(),
            ErrorKind::InvalidFormatGeometry
        );
        assert_eq!(
            GrallocError::transport("create", std::io::ErrorKind::OutOfMemory).kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(GrallocError::DoubleRelease(3).kind(), ErrorKind::DoubleRelease);
        assert_eq!(
            GrallocError::RefCountOverflow(3).kind(),
            ErrorKind::ResourceExhausted
        );
    }

    #[test]
    fn transport_error_names_the_operation() {
        let err = GrallocError::transport("import", std::io::Error::other("bad fd"));

        assert_eq!(err.to_string(), "import failed: bad fd");
    }
}
