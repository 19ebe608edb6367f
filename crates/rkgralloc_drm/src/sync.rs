//! CPU access synchronization and naming of dma-bufs.

use std::{
    ffi::CString,
    io,
    os::fd::{AsRawFd, BorrowedFd},
    time::{SystemTime, UNIX_EPOCH},
};

use bitflags::bitflags;

/// `_IOW('b', 0, struct dma_buf_sync)`
const DMA_BUF_IOCTL_SYNC: u64 = 0x4008_6200;
/// `_IOW('b', 1, const char *)`
const DMA_BUF_SET_NAME: u64 = 0x4008_6201;
/// Including the terminating NUL
const DMA_BUF_NAME_LEN: usize = 32;

const DMA_BUF_SYNC_START: u64 = 0;
const DMA_BUF_SYNC_END: u64 = 1 << 2;

bitflags! {
    /// Direction of a CPU access.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct SyncAccess: u64 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Brackets CPU access to cacheable buffers.
pub trait CpuSync: Send + Sync {
    fn begin_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) -> io::Result<()>;

    fn end_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) -> io::Result<()>;
}

/// [`CpuSync`] through the dma-buf sync ioctl.
#[derive(Debug, Default, Clone, Copy)]
pub struct DmaBufSync;

#[repr(C)]
struct DmaBufSyncArgs {
    flags: u64,
}

fn dma_buf_sync(fd: BorrowedFd<'_>, flags: u64) -> io::Result<()> {
    let mut args = DmaBufSyncArgs { flags };
    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), DMA_BUF_IOCTL_SYNC as _, &raw mut args) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl CpuSync for DmaBufSync {
    fn begin_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) -> io::Result<()> {
        dma_buf_sync(fd, DMA_BUF_SYNC_START | access.bits())
    }

    fn end_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) -> io::Result<()> {
        dma_buf_sync(fd, DMA_BUF_SYNC_END | access.bits())
    }
}

/// [`CpuSync`] for memory without CPU cache maintenance, like memfd backed objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSync;

impl CpuSync for NoSync {
    fn begin_access(&self, _fd: BorrowedFd<'_>, _access: SyncAccess) -> io::Result<()> {
        Ok(())
    }

    fn end_access(&self, _fd: BorrowedFd<'_>, _access: SyncAccess) -> io::Result<()> {
        Ok(())
    }
}

/// Sets the debug name of the dma-buf `fd`. Names longer than the kernel limit are cut.
pub fn set_dmabuf_name(fd: BorrowedFd<'_>, name: &str) -> io::Result<()> {
    let mut name = name.as_bytes().to_vec();
    name.truncate(DMA_BUF_NAME_LEN - 1);
    let name = CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "name contains a NUL byte"))?;

    let ret = unsafe { libc::ioctl(fd.as_raw_fd(), DMA_BUF_SET_NAME as _, name.as_ptr()) };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Name for a new dma-buf: `<tid>_<size>_<HH:MM:SS.mmm>`, time in UTC.
pub fn dmabuf_name(size: usize) -> String {
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_dmabuf_name(i64::from(tid), size, since_epoch.as_millis())
}

fn format_dmabuf_name(tid: i64, size: usize, millis_since_epoch: u128) -> String {
    let millis_of_day = millis_since_epoch % (24 * 60 * 60 * 1000);
    let seconds = millis_of_day / 1000;
    format!(
        "{tid}_{size}_{:02}:{:02}:{:02}.{:03}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60,
        millis_of_day % 1000
    )
}

#[cfg(test)]
mod tests {
    use std::os::fd::AsFd;

    use super::*;

    #[test]
    fn name_has_thread_size_and_time() {
        // 1970-01-02 13:04:05.678
        let millis = ((24 + 13) * 3600 + 4 * 60 + 5) * 1000 + 678;

        assert_eq!(format_dmabuf_name(42, 4096, millis), "42_4096_13:04:05.678");
    }

    #[test]
    fn current_name_fits_the_kernel_limit() {
        let name = dmabuf_name(3_110_400);

        assert!(name.len() < DMA_BUF_NAME_LEN);
        assert!(name.contains("_3110400_"));
    }

    #[test]
    fn sync_on_a_regular_file_fails() {
        let file = std::fs::File::open("/dev/null").unwrap();

        assert!(DmaBufSync.begin_access(file.as_fd(), SyncAccess::READ).is_err());
        assert!(set_dmabuf_name(file.as_fd(), "test").is_err());
    }
}
