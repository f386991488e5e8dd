/// Resources parked in a frame ring until the GPU is done with them

use crate::graphics_device::{GraphicsDevice, BufferHandle, TextureHandle};
use crate::resource::memory_tracker::{GpuMemoryTracker, AllocationKind};

/// A device allocation waiting for its deferred free
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetiredResource {
    Buffer { handle: BufferHandle, size: u64 },
    Texture { handle: TextureHandle, size: u64 },
}

impl RetiredResource {
    /// Free the allocation on the device and account for it
    pub(crate) fn free(self, device: &mut dyn GraphicsDevice, tracker: &GpuMemoryTracker) {
        match self {
            RetiredResource::Buffer { handle, size } => {
                device.destroy_buffer(handle);
                tracker.record_free(AllocationKind::Buffer, size, true);
            }
            RetiredResource::Texture { handle, size } => {
                device.destroy_texture(handle);
                tracker.record_free(AllocationKind::Texture, size, true);
            }
        }
    }
}
