//! Device resident copies of the acceleration structures.
//!
//! Everything is packed into plain old data buffers allocated from a budgeted
//! device memory pool, grouped into immutable generations that get swapped at
//! frame boundaries.

mod frame_sync;
mod generation;
mod memory;
mod packed;

pub use frame_sync::FrameSync;
pub use generation::Generation;
pub use memory::{DeviceBuffer, DeviceMemory, ResourceError};
pub use packed::{GpuInstance, GpuNode, GpuTriangle, GpuVertex, PackedTree, pack_tree};
