//! DRM device access

use std::{
    fs::OpenOptions,
    os::fd::{AsFd, BorrowedFd, OwnedFd},
    path::{Path, PathBuf},
};

use anyhow::Context;
use drm::Device;
use drm::control::Device as ControlDevice;
use log::{debug, info};

/// A DRM device wrapper that implements the drm-rs traits.
///
/// Buffer allocation needs no modesetting rights, so the node is opened without DRM master.
pub struct DrmDevice {
    fd: OwnedFd,
}

impl Device for DrmDevice {}

impl AsFd for DrmDevice {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

// GEM and PRIME calls live on the control trait
impl ControlDevice for DrmDevice {}

impl DrmDevice {
    /// Opens the DRM node at `path` for reading and writing.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open DRM device {}", path.display()))?;
        let device = Self::from_fd(file.into())?;
        info!(
            "Opened DRM device {} ({})",
            path.display(),
            device.driver_name()?
        );

        Ok(device)
    }

    /// Wraps an already opened DRM file descriptor.
    pub fn from_fd(fd: OwnedFd) -> anyhow::Result<Self> {
        let device = Self { fd };

        let has_prime = device
            .get_driver_capability(drm::DriverCapability::Prime)
            .unwrap_or(0)
            != 0;
        if !has_prime {
            anyhow::bail!("DRM driver does not support PRIME buffer sharing");
        }

        Ok(device)
    }

    /// Name of the kernel driver behind the device, e.g. "rockchip".
    pub fn driver_name(&self) -> anyhow::Result<String> {
        let driver = self.get_driver().context("Failed to get DRM driver info")?;
        let name = driver.name().to_string_lossy().into_owned();
        debug!(
            "DRM driver: {} - {}",
            name,
            driver.description().to_string_lossy()
        );

        Ok(name)
    }
}

/// Where DRM nodes are created by the kernel.
const DRI_DIR: &str = "/dev/dri";

/// Sort key of a DRM node file name. Render nodes come before primary nodes, since allocation
/// needs neither modesetting nor master. Other entries such as `by-path` yield `None`.
fn node_order(name: &str) -> Option<(u8, u32)> {
    if let Some(minor) = name.strip_prefix("renderD") {
        return minor.parse().ok().map(|minor| (0, minor));
    }
    name.strip_prefix("card")?.parse().ok().map(|minor| (1, minor))
}

/// Lists the DRM nodes in `dir`, render nodes first, each kind by minor number.
fn list_nodes(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut nodes = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let order = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(node_order);
        if let Some(order) = order {
            nodes.push((order, path));
        }
    }
    nodes.sort();

    Ok(nodes.into_iter().map(|(_, path)| path).collect())
}

/// Render and primary DRM nodes of this machine, render nodes first.
pub fn find_drm_devices() -> anyhow::Result<Vec<PathBuf>> {
    let nodes = list_nodes(Path::new(DRI_DIR))?;
    debug!("DRM nodes: {nodes:?}");

    Ok(nodes)
}

/// Opens a node of the DRM device driven by `driver`, preferring its render node.
///
/// Nodes that fail to open are skipped.
pub fn open_driver_device(driver: &str) -> anyhow::Result<DrmDevice> {
    let nodes = find_drm_devices()?;
    let device = nodes.iter().find_map(|path| {
        DrmDevice::open(path)
            .inspect_err(|err| debug!("Skipping {}: {err:#}", path.display()))
            .ok()
            .filter(|device| device.driver_name().is_ok_and(|name| name == driver))
    });

    device.with_context(|| format!("None of {} DRM nodes is driven by {driver}", nodes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_files_are_not_drm_devices() {
        let file = std::fs::File::open("/dev/null").unwrap();

        assert!(DrmDevice::from_fd(file.into()).is_err());
    }

    #[test]
    fn render_nodes_sort_before_primary_nodes() {
        let mut names = vec!["card10", "by-path", "renderD129", "card1", "renderD128", "cardX"];
        names.retain(|name| node_order(name).is_some());
        names.sort_by_key(|name| node_order(name));

        assert_eq!(names, ["renderD128", "renderD129", "card1", "card10"]);
    }

    #[test]
    fn listed_nodes_are_render_or_primary() {
        let dir = std::env::temp_dir().join(format!("rkgralloc-dri-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("by-path")).unwrap();
        for name in ["card0", "renderD128", "controlD64"] {
            std::fs::File::create(dir.join(name)).unwrap();
        }

        let nodes = list_nodes(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(nodes, [dir.join("renderD128"), dir.join("card0")]);
    }
}
