//! Resource lifetime module
//!
//! Creation, update, resize and deferred destruction of GPU buffers and
//! textures under multiple frames in flight.

mod frame_ring;
mod memory_tracker;
mod retired;
mod upload;
mod managed_buffer;
mod managed_texture;
mod acceleration_structure;
mod buffer_manager;
mod texture_manager;

pub use frame_ring::FrameRing;
pub use memory_tracker::{GpuMemoryTracker, MemoryStats, AllocationKind};
pub use retired::RetiredResource;
pub use managed_buffer::{ManagedBuffer, BufferConfig};
pub use managed_texture::{ManagedTexture, TextureConfig};
pub use acceleration_structure::ManagedAccelerationStructure;
pub use buffer_manager::BufferManager;
pub use texture_manager::TextureManager;
