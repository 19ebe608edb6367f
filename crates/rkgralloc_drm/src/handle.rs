//! Buffer handles handed out by the [`Allocator`].

use std::{
    fmt,
    os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd},
    sync::Arc,
};

use log::{debug, warn};
use rkgralloc_layout::{AllocationResult, GrallocError, Result, YcbcrLayout, ycbcr_layout};
use rkgralloc_shared::{FormatId, InternalFormat, Usage, YuvInfo};

use crate::{Allocator, BoFlags, Mapping, ObjectId, SyncAccess};

/// Attribute queries answered by [`BufferHandle::query`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleQuery {
    PhysAddr,
    PrimeFd,
    /// Width, height, pixel stride, format, size and a reserved zero
    Attributes,
    InternalFormat,
    Width,
    Height,
    /// Row pitch in pixels
    Stride,
    ByteStride,
    Format,
    Size,
    Usage,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueryValue {
    U32(u32),
    Size(usize),
    Fd(RawFd),
    Format(FormatId),
    InternalFormat(InternalFormat),
    Usage(Usage),
    Attributes([u64; 6]),
}

/// Everything another process or component needs to import a buffer.
///
/// The layout travels with the descriptor, importers never recompute it.
#[derive(Debug)]
pub struct ExportedBuffer {
    pub fd: OwnedFd,
    pub width: u32,
    pub height: u32,
    pub format: FormatId,
    pub usage: Usage,
    pub flags: BoFlags,
    pub yuv_info: YuvInfo,
    pub phys_addr: u32,
    pub layout: AllocationResult,
}

/// A backed buffer: one reference to a backing object plus its layout.
///
/// Dropping the handle frees it: a live mapping is unmapped (ending CPU access) and the
/// object reference is released.
pub struct BufferHandle {
    pub(crate) allocator: Arc<Allocator>,
    pub(crate) object: ObjectId,
    pub(crate) prime_fd: OwnedFd,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: FormatId,
    pub(crate) usage: Usage,
    pub(crate) flags: BoFlags,
    pub(crate) yuv_info: YuvInfo,
    pub(crate) phys_addr: u32,
    pub(crate) layout: AllocationResult,
    pub(crate) mapping: Option<Mapping>,
}

impl BufferHandle {
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Format requested by the allocating caller.
    pub fn format(&self) -> FormatId {
        self.format
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn flags(&self) -> BoFlags {
        self.flags
    }

    pub fn yuv_info(&self) -> YuvInfo {
        self.yuv_info
    }

    pub fn layout(&self) -> &AllocationResult {
        &self.layout
    }

    pub fn is_protected(&self) -> bool {
        self.flags.contains(BoFlags::SECURE)
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn prime_fd(&self) -> BorrowedFd<'_> {
        self.prime_fd.as_fd()
    }

    /// Maps the buffer for CPU access.
    ///
    /// Protected buffers are never mapped and return `None`. Mapping an already mapped
    /// buffer returns the existing mapping.
    pub fn map(&mut self) -> Result<Option<&mut [u8]>> {
        if self.is_protected() {
            debug!("{}", GrallocError::MappingDenied);
            return Ok(None);
        }

        if self.mapping.is_none() {
            let mapping = self
                .allocator
                .registry()
                .transport()
                .map(self.object, self.layout.size)
                .map_err(|err| GrallocError::transport("map", err))?;
            if self.flags.contains(BoFlags::CACHABLE) {
                self.allocator
                    .begin_cpu_access(self.prime_fd.as_fd(), SyncAccess::READ_WRITE);
            }
            debug!("Mapped object {} ({} bytes)", self.object, mapping.len());
            self.mapping = Some(mapping);
        }

        Ok(self.mapping.as_mut().map(Mapping::as_mut_slice))
    }

    /// Ends CPU access and drops the mapping. Does nothing when not mapped.
    pub fn unmap(&mut self) {
        let Some(mapping) = self.mapping.take() else {
            return;
        };
        if self.flags.contains(BoFlags::CACHABLE) {
            self.allocator
                .end_cpu_access(self.prime_fd.as_fd(), SyncAccess::READ_WRITE);
        }
        drop(mapping);
        debug!("Unmapped object {}", self.object);
    }

    /// Duplicates the descriptor and describes the buffer for import elsewhere.
    pub fn export(&self) -> Result<ExportedBuffer> {
        let fd = self
            .prime_fd
            .try_clone()
            .map_err(|err| GrallocError::transport("export", err))?;

        Ok(ExportedBuffer {
            fd,
            width: self.width,
            height: self.height,
            format: self.format,
            usage: self.usage,
            flags: self.flags,
            yuv_info: self.yuv_info,
            phys_addr: self.phys_addr,
            layout: self.layout,
        })
    }

    pub fn query(&self, query: HandleQuery) -> QueryValue {
        match query {
            HandleQuery::PhysAddr => QueryValue::U32(self.phys_addr),
            HandleQuery::PrimeFd => QueryValue::Fd(self.prime_fd.as_raw_fd()),
            HandleQuery::Attributes => QueryValue::Attributes([
                u64::from(self.width),
                u64::from(self.height),
                u64::from(self.layout.pixel_stride),
                u64::from(self.format.0),
                self.layout.size as u64,
                0,
            ]),
            HandleQuery::InternalFormat => QueryValue::InternalFormat(self.layout.alloc_format),
            HandleQuery::Width => QueryValue::U32(self.width),
            HandleQuery::Height => QueryValue::U32(self.height),
            HandleQuery::Stride => QueryValue::U32(self.layout.pixel_stride),
            HandleQuery::ByteStride => QueryValue::U32(self.layout.byte_stride),
            HandleQuery::Format => QueryValue::Format(self.format),
            HandleQuery::Size => QueryValue::Size(self.layout.size),
            HandleQuery::Usage => QueryValue::Usage(self.usage),
        }
    }

    /// Checks that a consumer's view of the buffer fits what was allocated.
    pub fn validate_size(
        &self,
        width: u32,
        height: u32,
        format: FormatId,
        layer_count: u32,
        stride: u32,
    ) -> Result<()> {
        if width > self.width || height > self.height {
            return Err(GrallocError::InvalidDimensions { width, height });
        }

        let pixel_stride = self.layout.pixel_stride;
        if stride > pixel_stride {
            if pixel_stride > 0 {
                return Err(GrallocError::InvalidConfiguration(format!(
                    "stride {stride} exceeds the buffer's pixel stride {pixel_stride}"
                )));
            }
            warn!("Buffer has no pixel stride, not checking stride {stride}");
        }

        let flexible_request =
            format == FormatId::YCBCR_420_888 || format == FormatId::IMPLEMENTATION_DEFINED;
        if format != self.format && !(self.format.is_vendor_nv12() && flexible_request) {
            return Err(GrallocError::InvalidConfiguration(format!(
                "format {format} does not match the buffer format {}",
                self.format
            )));
        }

        if layer_count > 1 {
            return Err(GrallocError::InvalidConfiguration(format!(
                "{layer_count} layers requested, buffers have one"
            )));
        }

        Ok(())
    }

    /// Plane description of a YUV buffer for CPU access.
    pub fn ycbcr_layout(&self) -> Result<YcbcrLayout> {
        ycbcr_layout(
            self.layout.alloc_format.base(),
            self.layout.byte_stride,
            self.height,
        )
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle")
            .field("object", &self.object)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("flags", &self.flags)
            .field("size", &self.layout.size)
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        self.unmap();
        self.allocator.registry().release(self.object);
        debug!("Freed buffer on object {}", self.object);
    }
}
