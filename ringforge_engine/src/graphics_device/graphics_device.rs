/// GraphicsDevice trait - the GPU capability consumed by the engine

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use glam::UVec3;
use crate::error::Result;
use crate::graphics_device::{BufferDesc, TextureDesc, DescriptorResource};

// ============================================================================
// Opaque handles
// ============================================================================

/// Opaque GPU buffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u64);

/// Opaque GPU texture (image + view) handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Opaque acceleration structure handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccelerationStructureHandle(pub u64);

/// Opaque pipeline handle (descriptor sets are allocated per pipeline and per frame slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineHandle(pub u64);

impl fmt::Display for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline#{}", self.0)
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// GPU device capability
///
/// Implemented by backend-specific devices (Vulkan, etc.) and by the test mock.
/// Shared between the managers and the binder as `Arc<Mutex<dyn GraphicsDevice>>`.
///
/// The device never defers anything on its own: `destroy_*` frees immediately.
/// Deferring destruction until the GPU is done with a resource is the job of
/// the frame rings.
pub trait GraphicsDevice: Send + Sync {
    /// Allocate a buffer with the memory type implied by `desc.strategy`
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle>;

    /// Allocate a texture with the memory type implied by `desc.strategy`
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    /// Free a buffer immediately
    fn destroy_buffer(&mut self, handle: BufferHandle);

    /// Free a texture immediately
    fn destroy_texture(&mut self, handle: TextureHandle);

    /// Map, write and unmap a CPU-visible buffer
    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Flush a range of non-coherent (host-cached) memory
    fn flush_buffer(&mut self, handle: BufferHandle, offset: u64, size: u64) -> Result<()>;

    /// Write texel data into a CPU-visible (linear) texture
    fn write_texture(&mut self, handle: TextureHandle, data: &[u8]) -> Result<()>;

    /// Record a copy of `size` bytes from the start of `src` to `dst_offset` in `dst` (staging upload)
    fn copy_buffer_to_buffer(&mut self, src: BufferHandle, dst: BufferHandle, dst_offset: u64, size: u64) -> Result<()>;

    /// Record a buffer-to-image copy (staging upload)
    fn copy_buffer_to_texture(&mut self, src: BufferHandle, dst: TextureHandle, extent: UVec3) -> Result<()>;

    /// Write one descriptor of `pipeline`'s descriptor set copy for `frame_index`
    fn update_descriptor_set(
        &mut self,
        pipeline: PipelineHandle,
        frame_index: usize,
        set: u32,
        binding: u32,
        resource: &DescriptorResource,
    ) -> Result<()>;

    /// Frame tag: `frame_index` in `0..frames_in_flight`
    fn begin_frame(&mut self, frame_index: usize);
}

/// Lock a shared device, turning a poisoned lock into a backend error
pub(crate) fn lock_device<'a>(
    device: &'a Mutex<dyn GraphicsDevice + 'static>,
) -> Result<MutexGuard<'a, dyn GraphicsDevice + 'static>> {
    device
        .lock()
        .map_err(|_| crate::engine_err!("ringforge::GraphicsDevice", "Graphics device lock poisoned"))
}
