//! Backing-object transports.

use std::{
    collections::HashMap,
    fmt, io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
    ptr::NonNull,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU32, Ordering},
    },
};

use bitflags::bitflags;
use libc::{MAP_FAILED, MAP_SHARED, PROT_READ, PROT_WRITE, mmap, munmap};
use log::trace;
use rkgralloc_shared::{FormatId, Usage};
use rustix::fs::{MemfdFlags, fstat, ftruncate, memfd_create};

use crate::sync::set_dmabuf_name;

/// Process-local identifier of a backing memory object (a GEM handle for DRM transports).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Flags for creating or importing a backing object.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
    pub struct BoFlags: u32 {
        /// Physically contiguous memory
        const CONTIG = 1 << 0;
        /// CPU cacheable, requires CPU access synchronization
        const CACHABLE = 1 << 1;
        /// Write-combined
        const WC = 1 << 2;
        const SECURE = 1 << 3;
    }
}

impl BoFlags {
    /// Flags derived from the usage of a buffer requested as `requested`.
    pub fn for_usage(usage: Usage, requested: FormatId) -> Self {
        let mut flags = BoFlags::empty();
        if usage.reads_often() || requested == FormatId::RK_NV12_10 {
            flags |= BoFlags::CACHABLE;
        }
        if usage.vendor_field_is(Usage::TO_USE_PHY_CONT) {
            flags |= BoFlags::CONTIG;
        }
        if usage.contains(Usage::PROTECTED) {
            flags |= BoFlags::SECURE;
        }
        flags
    }
}

/// A shared, writable CPU mapping. Unmapped on drop.
pub struct Mapping {
    address: NonNull<u8>,
    len: usize,
}

// The mapping is plain shared memory owned by this value
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    /// Maps `len` bytes of `fd` starting at `offset`.
    pub fn new(fd: BorrowedFd<'_>, len: usize, offset: u64) -> io::Result<Self> {
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "mmap offset out of range"))?;
        let address = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                fd.as_raw_fd(),
                offset,
            )
        };
        if address == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let address = NonNull::new(address.cast::<u8>())
            .ok_or_else(|| io::Error::other("mmap returned a null address"))?;
        trace!("Mapped {len} bytes at {address:p}");

        Ok(Self { address, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.address.as_ptr()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the region stays mapped for the lifetime of self
        unsafe { std::slice::from_raw_parts(self.address.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the region stays mapped for the lifetime of self
        unsafe { std::slice::from_raw_parts_mut(self.address.as_ptr(), self.len) }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("address", &self.address)
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            munmap(self.address.as_ptr().cast(), self.len);
        }
        trace!("Unmapped {} bytes at {:p}", self.len, self.address);
    }
}

/// Creates, imports, maps and destroys backing memory objects.
///
/// Importing a descriptor that refers to an object already known to the transport returns
/// the existing id, the same way the kernel hands out one GEM handle per object and DRM fd.
/// `destroy` invalidates the id for every holder, so callers go through
/// [`ObjectRegistry`](crate::ObjectRegistry) instead of calling it directly.
pub trait ObjectTransport: Send + Sync {
    fn create(&self, size: usize, flags: BoFlags) -> io::Result<ObjectId>;

    fn import(&self, fd: BorrowedFd<'_>, flags: BoFlags, size: usize) -> io::Result<ObjectId>;

    fn destroy(&self, id: ObjectId) -> io::Result<()>;

    fn map(&self, id: ObjectId, size: usize) -> io::Result<Mapping>;

    /// Exports the object as a dma-buf style descriptor.
    fn export(&self, id: ObjectId) -> io::Result<OwnedFd>;

    /// Physical address of a contiguous object.
    fn phys_addr(&self, _id: ObjectId) -> io::Result<u32> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Names the exported descriptor `fd` of `id`.
    fn set_name(&self, _id: ObjectId, fd: BorrowedFd<'_>, name: &str) -> io::Result<()> {
        set_dmabuf_name(fd, name)
    }
}

struct SystemObject {
    memfd: OwnedFd,
    inode: u64,
    name: Option<String>,
}

/// System memory transport backed by memfds.
///
/// Imports are matched to known objects by inode, so importing an exported descriptor in the
/// same process yields the id it was created with.
#[derive(Default)]
pub struct SystemTransport {
    next_id: AtomicU32,
    objects: Mutex<HashMap<ObjectId, SystemObject>>,
}

impl SystemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> ObjectId {
        ObjectId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Name given to the object with [`ObjectTransport::set_name`].
    pub fn name(&self, id: ObjectId) -> Option<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(|object| object.name.clone())
    }

    fn with_object<R>(
        &self,
        id: ObjectId,
        f: impl FnOnce(&mut SystemObject) -> io::Result<R>,
    ) -> io::Result<R> {
        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let object = objects
            .get_mut(&id)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))?;
        f(object)
    }
}

impl ObjectTransport for SystemTransport {
    fn create(&self, size: usize, _flags: BoFlags) -> io::Result<ObjectId> {
        let memfd = memfd_create("rkgralloc", MemfdFlags::CLOEXEC)?;
        ftruncate(&memfd, size as u64)?;
        let inode = fstat(&memfd)?.st_ino as u64;

        let id = self.allocate_id();
        self.objects.lock().unwrap_or_else(PoisonError::into_inner).insert(
            id,
            SystemObject {
                memfd,
                inode,
                name: None,
            },
        );
        trace!("Created system object {id} of {size} bytes");

        Ok(id)
    }

    fn import(&self, fd: BorrowedFd<'_>, _flags: BoFlags, size: usize) -> io::Result<ObjectId> {
        let stat = fstat(fd)?;
        if (stat.st_size as u64) < size as u64 {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        let inode = stat.st_ino as u64;

        let mut objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((id, _)) = objects.iter().find(|(_, object)| object.inode == inode) {
            return Ok(*id);
        }

        let id = self.allocate_id();
        objects.insert(
            id,
            SystemObject {
                memfd: fd.try_clone_to_owned()?,
                inode,
                name: None,
            },
        );
        trace!("Imported system object {id}");

        Ok(id)
    }

    fn destroy(&self, id: ObjectId) -> io::Result<()> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .map(drop)
            .ok_or_else(|| io::Error::from_raw_os_error(libc::ENOENT))
    }

    fn map(&self, id: ObjectId, size: usize) -> io::Result<Mapping> {
        self.with_object(id, |object| Mapping::new(object.memfd.as_fd(), size, 0))
    }

    fn export(&self, id: ObjectId) -> io::Result<OwnedFd> {
        self.with_object(id, |object| object.memfd.try_clone())
    }

    fn set_name(&self, id: ObjectId, _fd: BorrowedFd<'_>, name: &str) -> io::Result<()> {
        self.with_object(id, |object| {
            object.name = Some(name.to_owned());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_follow_usage() {
        assert_eq!(
            BoFlags::for_usage(Usage::SW_READ_OFTEN, FormatId::RGBA_8888),
            BoFlags::CACHABLE
        );
        assert_eq!(
            BoFlags::for_usage(Usage::SW_READ_RARELY, FormatId::RK_NV12_10),
            BoFlags::CACHABLE
        );
        assert_eq!(
            BoFlags::for_usage(Usage::TO_USE_PHY_CONT | Usage::PROTECTED, FormatId::NV12),
            BoFlags::CONTIG | BoFlags::SECURE
        );
        assert!(BoFlags::for_usage(Usage::TO_USE_ARM_P010, FormatId::NV12).is_empty());
    }

    #[test]
    fn exported_descriptor_imports_as_the_same_object() {
        let transport = SystemTransport::new();
        let id = transport.create(4096, BoFlags::empty()).unwrap();
        let fd = transport.export(id).unwrap();

        assert_eq!(transport.import(fd.as_fd(), BoFlags::empty(), 4096).unwrap(), id);
        assert_eq!(transport.object_count(), 1);
    }

    #[test]
    fn import_rejects_short_descriptors() {
        let transport = SystemTransport::new();
        let id = transport.create(4096, BoFlags::empty()).unwrap();
        let fd = transport.export(id).unwrap();

        assert!(transport.import(fd.as_fd(), BoFlags::empty(), 8192).is_err());
    }

    #[test]
    fn foreign_descriptor_gets_a_new_id() {
        let owner = SystemTransport::new();
        let importer = SystemTransport::new();
        let id = owner.create(4096, BoFlags::empty()).unwrap();
        let fd = owner.export(id).unwrap();

        let imported = importer.import(fd.as_fd(), BoFlags::empty(), 4096).unwrap();
        owner.destroy(id).unwrap();

        // The importer keeps its own reference to the memory
        let mut mapping = importer.map(imported, 4096).unwrap();
        mapping.as_mut_slice()[0] = 7;
        assert_eq!(mapping.as_slice()[0], 7);
    }

    #[test]
    fn mappings_share_memory() {
        let transport = SystemTransport::new();
        let id = transport.create(8192, BoFlags::empty()).unwrap();

        let mut first = transport.map(id, 8192).unwrap();
        let second = transport.map(id, 8192).unwrap();
        first.as_mut_slice()[4096] = 0xab;

        assert_eq!(second.as_slice()[4096], 0xab);
        assert_eq!(second.len(), 8192);
    }

    #[test]
    fn destroyed_objects_are_gone() {
        let transport = SystemTransport::new();
        let id = transport.create(4096, BoFlags::empty()).unwrap();

        transport.destroy(id).unwrap();

        assert!(transport.destroy(id).is_err());
        assert!(transport.map(id, 4096).is_err());
        assert_eq!(transport.object_count(), 0);
    }
}
