//! Allocation, import and release of buffers.

use std::{
    os::fd::{AsFd, BorrowedFd},
    sync::{Arc, Mutex, PoisonError, Weak},
};

use log::{debug, error, info, warn};
use rkgralloc_config::{AllocatorConfig, SharedConfig};
use rkgralloc_layout::{
    AllocationRequest, AllocationResult, GrallocError, Result, SelectionPolicy, calculate_layout,
    init_afbc_planes, select_format,
};
use rkgralloc_shared::{FormatCatalog, FormatId, FormatModifiers, Usage, YuvInfo};

use crate::{
    BoFlags, BufferHandle, CpuSync, ExportedBuffer, ObjectId, ObjectRegistry, ObjectTransport,
    SyncAccess, sync::dmabuf_name,
};

/// Allocates buffers and owns the registry shared by all handles it hands out.
///
/// Handles keep the allocator alive, so it is always passed around as an `Arc`.
pub struct Allocator {
    registry: ObjectRegistry,
    sync: Box<dyn CpuSync>,
    catalog: Box<dyn FormatCatalog>,
    config: SharedConfig,
}

/// Releases a freshly created object unless disarmed.
struct ReleaseGuard<'a> {
    registry: &'a ObjectRegistry,
    object: Option<ObjectId>,
}

impl ReleaseGuard<'_> {
    fn disarm(mut self) {
        self.object = None;
    }
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            debug!("Allocation failed, releasing object {object}");
            self.registry.release(object);
        }
    }
}

impl Allocator {
    pub fn new(
        transport: Box<dyn ObjectTransport>,
        sync: Box<dyn CpuSync>,
        catalog: Box<dyn FormatCatalog>,
        config: SharedConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: ObjectRegistry::new(transport),
            sync,
            catalog,
            config,
        })
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &dyn FormatCatalog {
        self.catalog.as_ref()
    }

    /// The configuration as of now. Reloads only affect later allocations.
    pub fn config(&self) -> AllocatorConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn begin_cpu_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) {
        if let Err(err) = self.sync.begin_access(fd, access) {
            warn!("Failed to begin CPU access: {err}");
        }
    }

    pub(crate) fn end_cpu_access(&self, fd: BorrowedFd<'_>, access: SyncAccess) {
        if let Err(err) = self.sync.end_access(fd, access) {
            warn!("Failed to end CPU access: {err}");
        }
    }

    /// Computes the layout a buffer with these parameters would get.
    pub fn layout(
        &self,
        width: u32,
        height: u32,
        format: FormatId,
        modifiers: FormatModifiers,
        usage: Usage,
    ) -> Result<AllocationResult> {
        self.layout_with(&self.config(), width, height, format, modifiers, usage)
    }

    fn layout_with(
        &self,
        config: &AllocatorConfig,
        width: u32,
        height: u32,
        format: FormatId,
        modifiers: FormatModifiers,
        usage: Usage,
    ) -> Result<AllocationResult> {
        let policy = SelectionPolicy {
            afbc_layer: config.afbc_layer,
            disable_afbc_fb_target: config.disable_afbc_fb_target,
            framebuffer_height: config.framebuffer.height,
        };
        let selected = select_format(format, modifiers, usage, &policy);

        calculate_layout(
            self.catalog.as_ref(),
            &AllocationRequest {
                width,
                height,
                format: selected.base(),
                modifiers: selected.modifiers(),
                usage,
            },
        )
    }

    /// Allocates a new buffer.
    ///
    /// On failure every resource acquired so far is released again and no handle exists.
    /// The whole allocation uses one snapshot of the configuration.
    pub fn allocate(
        self: &Arc<Self>,
        width: u32,
        height: u32,
        format: FormatId,
        modifiers: FormatModifiers,
        usage: Usage,
    ) -> Result<BufferHandle> {
        let config = self.config();
        let layout = self.layout_with(&config, width, height, format, modifiers, usage)?;
        let flags = BoFlags::for_usage(usage, format);

        let object = self.registry.create(layout.size, flags)?;
        let guard = ReleaseGuard {
            registry: &self.registry,
            object: Some(object),
        };
        let transport = self.registry.transport();

        let prime_fd = transport
            .export(object)
            .map_err(|err| GrallocError::transport("export", err))?;

        if config.dmabuf_names {
            let name = dmabuf_name(layout.size);
            if let Err(err) = transport.set_name(object, prime_fd.as_fd(), &name) {
                warn!("Failed to name dma-buf of object {object}: {err}");
            }
        }

        let mut phys_addr = 0;
        if flags.contains(BoFlags::CONTIG) {
            match transport.phys_addr(object) {
                Ok(addr) => phys_addr = addr,
                Err(err) => warn!("Failed to get physical address of object {object}: {err}"),
            }
        }

        if layout.alloc_type.is_afbc() && config.init_afbc && !flags.contains(BoFlags::SECURE) {
            self.write_afbc_headers(object, prime_fd.as_fd(), flags, &layout)?;
        }

        guard.disarm();
        debug!(
            "Allocated {width}x{height} format {format} on object {object}: {} bytes, {flags:?}",
            layout.size
        );

        Ok(BufferHandle {
            allocator: self.clone(),
            object,
            prime_fd,
            width,
            height,
            format,
            usage,
            flags,
            yuv_info: YuvInfo::from_usage(usage, format),
            phys_addr,
            layout,
            mapping: None,
        })
    }

    fn write_afbc_headers(
        &self,
        object: ObjectId,
        fd: BorrowedFd<'_>,
        flags: BoFlags,
        layout: &AllocationResult,
    ) -> Result<()> {
        let mut mapping = self
            .registry
            .transport()
            .map(object, layout.size)
            .map_err(|err| GrallocError::transport("map", err))?;

        let cacheable = flags.contains(BoFlags::CACHABLE);
        if cacheable {
            self.begin_cpu_access(fd, SyncAccess::WRITE);
        }
        let result = init_afbc_planes(mapping.as_mut_slice(), layout, self.catalog.as_ref());
        if cacheable {
            self.end_cpu_access(fd, SyncAccess::WRITE);
        }

        result
    }

    /// Imports a buffer exported by [`BufferHandle::export`], here or in another process.
    pub fn import(self: &Arc<Self>, buffer: &ExportedBuffer) -> Result<BufferHandle> {
        let object = self
            .registry
            .import(buffer.fd.as_fd(), buffer.flags, buffer.layout.size)?;
        let guard = ReleaseGuard {
            registry: &self.registry,
            object: Some(object),
        };
        let prime_fd = buffer
            .fd
            .try_clone()
            .map_err(|err| GrallocError::transport("import", err))?;
        guard.disarm();
        debug!(
            "Imported {}x{} buffer as object {object}",
            buffer.width, buffer.height
        );

        Ok(BufferHandle {
            allocator: self.clone(),
            object,
            prime_fd,
            width: buffer.width,
            height: buffer.height,
            format: buffer.format,
            usage: buffer.usage,
            flags: buffer.flags,
            yuv_info: buffer.yuv_info,
            phys_addr: buffer.phys_addr,
            layout: buffer.layout,
            mapping: None,
        })
    }

    /// Unmaps the buffer if mapped and releases its object reference.
    pub fn free(&self, handle: BufferHandle) {
        if !std::ptr::eq(Arc::as_ptr(&handle.allocator), self) {
            error!("Freeing a buffer of another allocator");
        }
        drop(handle);
    }
}

static DEFAULT_DRIVER: Mutex<Weak<Allocator>> = Mutex::new(Weak::new());

/// Makes `allocator` reachable through [`default_driver`] for call sites that cannot pass
/// it explicitly. Only a weak reference is kept.
pub fn install_default_driver(allocator: &Arc<Allocator>) {
    *DEFAULT_DRIVER.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(allocator);
    info!("Installed default allocator");
}

/// The allocator installed with [`install_default_driver`], if still alive.
pub fn default_driver() -> Option<Arc<Allocator>> {
    DEFAULT_DRIVER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .upgrade()
}
