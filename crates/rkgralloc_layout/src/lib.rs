mod afbc;
mod alloc_type;
mod error;
mod geometry;
mod select;
mod ycbcr;

pub use afbc::{header_entry, init_afbc, init_afbc_planes};
pub use alloc_type::{AllocBaseType, AllocationType, Rect, validate_format};
pub use error::{ErrorKind, GrallocError, Result};
pub use geometry::{
    AllocationRequest, AllocationResult, MAX_DIMENSION, PlaneGeometry, PlaneLayout,
    adjust_dimensions, afbc_buffer_align, align, calc_allocation_size, calculate_layout, lcm,
};
pub use select::{SelectionPolicy, select_format};
pub use ycbcr::{YcbcrLayout, ycbcr_layout};
