//! GEM objects of the rockchip DRM driver.

use std::{
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
};

use drm::buffer;
use drm::control::{Device as ControlDevice, RawResourceHandle};
use log::trace;

use crate::{BoFlags, DrmDevice, Mapping, ObjectId, ObjectTransport};

/// `DRM_IOWR(0x00, struct drm_rockchip_gem_create)`
const DRM_IOCTL_ROCKCHIP_GEM_CREATE: u64 = 0xc010_6440;
/// `DRM_IOWR(0x01, struct drm_rockchip_gem_map_off)`
const DRM_IOCTL_ROCKCHIP_GEM_MAP_OFFSET: u64 = 0xc010_6441;
/// `DRM_IOWR(0x04, struct drm_rockchip_gem_phys)`
const DRM_IOCTL_ROCKCHIP_GEM_GET_PHYS: u64 = 0xc008_6444;

#[repr(C)]
#[derive(Default)]
struct GemCreate {
    size: u64,
    flags: u32,
    handle: u32,
}

#[repr(C)]
#[derive(Default)]
struct GemMapOffset {
    handle: u32,
    pad: u32,
    offset: u64,
}

#[repr(C)]
#[derive(Default)]
struct GemPhys {
    handle: u32,
    phy_addr: u32,
}

/// Issues a driver specific ioctl on the device.
///
/// # Safety
///
/// `T` must be the argument struct the kernel expects for `request`.
unsafe fn ioctl<T>(fd: BorrowedFd<'_>, request: u64, args: &mut T) -> io::Result<()> {
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), request as _, std::ptr::from_mut(args)) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn to_handle(id: ObjectId) -> io::Result<buffer::Handle> {
    drm::control::from_u32(id.0).ok_or_else(|| io::Error::from_raw_os_error(libc::EINVAL))
}

fn to_id(handle: buffer::Handle) -> ObjectId {
    ObjectId(RawResourceHandle::from(handle).get())
}

/// [`ObjectTransport`] over the rockchip DRM driver. Object ids are GEM handles on the device.
pub struct RockchipTransport {
    device: DrmDevice,
}

impl RockchipTransport {
    pub fn new(device: DrmDevice) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &DrmDevice {
        &self.device
    }
}

impl ObjectTransport for RockchipTransport {
    fn create(&self, size: usize, flags: BoFlags) -> io::Result<ObjectId> {
        let mut args = GemCreate {
            size: size as u64,
            flags: flags.bits(),
            ..Default::default()
        };
        unsafe { ioctl(self.device.as_fd(), DRM_IOCTL_ROCKCHIP_GEM_CREATE, &mut args)? };
        trace!(
            "Created GEM object {} of {size} bytes with {flags:?}",
            args.handle
        );

        Ok(ObjectId(args.handle))
    }

    fn import(&self, fd: BorrowedFd<'_>, _flags: BoFlags, _size: usize) -> io::Result<ObjectId> {
        let handle = self.device.prime_fd_to_buffer(fd)?;
        Ok(to_id(handle))
    }

    fn destroy(&self, id: ObjectId) -> io::Result<()> {
        self.device.close_buffer(to_handle(id)?)
    }

    fn map(&self, id: ObjectId, size: usize) -> io::Result<Mapping> {
        let mut args = GemMapOffset {
            handle: id.0,
            ..Default::default()
        };
        unsafe { ioctl(self.device.as_fd(), DRM_IOCTL_ROCKCHIP_GEM_MAP_OFFSET, &mut args)? };

        Mapping::new(self.device.as_fd(), size, args.offset)
    }

    fn export(&self, id: ObjectId) -> io::Result<OwnedFd> {
        let flags = (libc::O_CLOEXEC | libc::O_RDWR) as u32;
        self.device.buffer_to_prime_fd(to_handle(id)?, flags)
    }

    fn phys_addr(&self, id: ObjectId) -> io::Result<u32> {
        let mut args = GemPhys {
            handle: id.0,
            ..Default::default()
        };
        unsafe { ioctl(self.device.as_fd(), DRM_IOCTL_ROCKCHIP_GEM_GET_PHYS, &mut args)? };

        Ok(args.phy_addr)
    }
}
