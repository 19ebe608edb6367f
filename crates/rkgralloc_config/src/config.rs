//! The allocator configuration script.

use std::{fmt, path::Path, str::FromStr};

use anyhow::Context;
use log::{debug, info};
use mlua::{Error as LuaError, FromLua, Lua, Result as LuaResult, Table as LuaTable, Value as LuaValue};

/// Name of the config file looked up in the xdg config directories.
pub const CONFIG_FILE_NAME: &str = "gralloc.lua";
const XDG_PREFIX: &str = "rkgralloc";

/// Display mode of the main framebuffer, written as `WxH@R`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FramebufferMode {
    pub width: u32,
    pub height: u32,
    pub refresh: u32,
}

impl Default for FramebufferMode {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            refresh: 60,
        }
    }
}

impl FromStr for FramebufferMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parse = || {
            let (size, refresh) = value.split_once('@')?;
            let (width, height) = size.split_once('x')?;
            Some(Self {
                width: width.trim().parse().ok()?,
                height: height.trim().parse().ok()?,
                refresh: refresh.trim().parse().ok()?,
            })
        };
        parse().ok_or_else(|| format!("Expected WxH@R, got {value:?}"))
    }
}

impl fmt::Display for FramebufferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}", self.width, self.height, self.refresh)
    }
}

/// Allocator settings, read from the table returned by `gralloc.lua`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Write the initial AFBC headers into new allocations
    pub init_afbc: bool,
    /// Name new dma-bufs after the allocating thread, size and time
    pub dmabuf_names: bool,
    /// Force AFBC for composer layers
    pub afbc_layer: bool,
    pub disable_afbc_fb_target: bool,
    pub framebuffer: FramebufferMode,
    /// DRM node to allocate from
    pub device: Option<String>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            init_afbc: true,
            dmabuf_names: true,
            afbc_layer: false,
            disable_afbc_fb_target: false,
            framebuffer: FramebufferMode::default(),
            device: None,
        }
    }
}

impl AllocatorConfig {
    /// Evaluates a config script. The script must return a table.
    pub fn from_source(source: &str, name: &str) -> anyhow::Result<Self> {
        let lua = Lua::new();
        lua.load(source)
            .set_name(name)
            .eval::<AllocatorConfig>()
            // Lua errors are not Sync, so they are flattened into the message
            .map_err(|err| anyhow::anyhow!("Failed to evaluate config {name}: {err}"))
    }

    /// Loads the config script at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_source(&source, &path.display().to_string())?;
        info!("Loaded config from {}", path.display());
        debug!("{config:?}");

        Ok(config)
    }

    /// Loads `path` if given, otherwise the config found in the xdg directories, otherwise
    /// the defaults.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path.map(Path::to_path_buf).or_else(find_config) {
            Some(path) => Self::load(&path),
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Looks up `gralloc.lua` in the xdg config directories.
pub fn find_config() -> Option<std::path::PathBuf> {
    xdg::BaseDirectories::with_prefix(XDG_PREFIX).find_config_file(CONFIG_FILE_NAME)
}

fn conversion_error(message: String) -> LuaError {
    LuaError::FromLuaConversionError {
        from: "LuaTable",
        to: String::from("AllocatorConfig"),
        message: Some(message),
    }
}

impl FromLua for AllocatorConfig {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        let table = value
            .as_table()
            .ok_or_else(|| conversion_error(String::from("Expected the config to return a table")))?;

        let defaults = Self::default();
        let framebuffer = match get::<String>(table, "framebuffer")? {
            Some(mode) => mode.parse::<FramebufferMode>().map_err(conversion_error)?,
            None => defaults.framebuffer,
        };

        Ok(Self {
            init_afbc: get(table, "init_afbc")?.unwrap_or(defaults.init_afbc),
            dmabuf_names: get(table, "dmabuf_names")?.unwrap_or(defaults.dmabuf_names),
            afbc_layer: get(table, "afbc_layer")?.unwrap_or(defaults.afbc_layer),
            disable_afbc_fb_target: get(table, "disable_afbc_fb_target")?
                .unwrap_or(defaults.disable_afbc_fb_target),
            framebuffer,
            device: get(table, "device")?,
        })
    }
}

fn get<T: FromLua>(table: &LuaTable, key: &str) -> LuaResult<Option<T>> {
    table.get::<Option<T>>(key)
}
