mod args;
mod catalog;
mod format;
mod usage;
mod yuv;

pub use args::GlobalArgs;
pub use catalog::{BuiltinCatalog, FormatCatalog, FormatInfo, MAX_PLANES};
pub use format::{FormatId, FormatModifiers, InternalFormat};
pub use usage::Usage;
pub use yuv::YuvInfo;
