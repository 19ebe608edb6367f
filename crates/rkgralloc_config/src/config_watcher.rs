use std::{
    path::Path,
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::Context;
use log::{error, info};
use notify::{
    EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind, recommended_watcher,
};

use crate::AllocatorConfig;

/// Shared, reloadable allocator configuration.
pub type SharedConfig = Arc<RwLock<AllocatorConfig>>;

/// Reloads the config file into a [`SharedConfig`] whenever it changes.
pub struct ConfigWatcher {
    watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    pub fn new(config: SharedConfig) -> anyhow::Result<Self> {
        let watcher =
            recommended_watcher(move |event_res: Result<notify::Event, notify::Error>| {
                match &event_res {
                    Ok(event) => {
                        match &event.kind {
                            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => {
                                // No change to file contents
                                return;
                            }
                            _ => {}
                        }

                        for path in &event.paths {
                            reload(&config, path);
                        }
                    }
                    Err(err) => {
                        error!("File watcher had an error: {err}")
                    }
                }
            })
            .context("Failed to create file watcher")?;

        Ok(Self { watcher })
    }

    pub fn watch(&mut self, path: &Path) -> anyhow::Result<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .context("Failed to watch config file")
    }
}

/// Replaces the shared config with the contents of `path`. Keeps the previous config if
/// the file can't be loaded.
pub fn reload(config: &SharedConfig, path: &Path) -> bool {
    match AllocatorConfig::load(path) {
        Ok(new_config) => {
            *config.write().unwrap_or_else(PoisonError::into_inner) = new_config;
            info!("Reloaded config from {}", path.display());
            true
        }
        Err(err) => {
            error!("Keeping previous config: {err:#}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, process};

    use super::*;

    #[test]
    fn reload_replaces_or_keeps_the_config() {
        let path = std::env::temp_dir().join(format!("rkgralloc-reload-{}.lua", process::id()));
        let config: SharedConfig = Arc::default();

        fs::write(&path, "return { afbc_layer = true }").unwrap();
        assert!(reload(&config, &path));
        assert!(config.read().unwrap().afbc_layer);

        fs::write(&path, "return nil +").unwrap();
        assert!(!reload(&config, &path));
        assert!(config.read().unwrap().afbc_layer);

        fs::remove_file(&path).unwrap();
    }
}
