mod device;
mod driver;
mod handle;
mod registry;
mod rockchip;
mod sync;
mod transport;

pub use device::{DrmDevice, find_drm_devices, open_driver_device};
pub use driver::{Allocator, default_driver, install_default_driver};
pub use handle::{BufferHandle, ExportedBuffer, HandleQuery, QueryValue};
pub use registry::{ObjectRegistry, ReleaseOutcome};
pub use rockchip::RockchipTransport;
pub use sync::{CpuSync, DmaBufSync, NoSync, SyncAccess, dmabuf_name, set_dmabuf_name};
pub use transport::{BoFlags, Mapping, ObjectId, ObjectTransport, SystemTransport};
