mod config;
mod config_watcher;

pub use config::{AllocatorConfig, CONFIG_FILE_NAME, FramebufferMode, find_config};
pub use config_watcher::{ConfigWatcher, SharedConfig, reload};
