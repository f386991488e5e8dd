/// Staging uploads into device-local memory

use glam::UVec3;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, BufferHandle, TextureHandle, BufferDesc, BufferUsage, AllocationStrategy,
};
use crate::resource::memory_tracker::{GpuMemoryTracker, AllocationKind};
use crate::resource::{FrameRing, RetiredResource};

/// Destination of a staged upload (buffer + byte offset, or texture + extent)
#[derive(Debug, Clone, Copy)]
pub(crate) enum UploadTarget {
    Buffer(BufferHandle, u64),
    Texture(TextureHandle, UVec3),
}

/// Allocate a host-visible staging buffer holding `data`, record the copy
/// into `target`, then park the staging buffer in `ring`.
///
/// The caller must have reserved one ring entry beforehand, so the staging
/// buffer can always be parked once the copy is recorded. If anything fails
/// before the copy is recorded, the staging buffer was never referenced by
/// GPU work and is freed on the spot.
pub(crate) fn staged_upload(
    device: &mut dyn GraphicsDevice,
    tracker: &GpuMemoryTracker,
    ring: &mut FrameRing<RetiredResource>,
    name: &str,
    data: &[u8],
    target: UploadTarget,
) -> Result<()> {
    let size = data.len() as u64;
    let staging = device.create_buffer(&BufferDesc {
        name: format!("{}_staging", name),
        size,
        usage: BufferUsage::TRANSFER_SRC,
        strategy: AllocationStrategy::HostVisible,
    })?;
    tracker.record_allocation(AllocationKind::Buffer, size);

    let recorded = device.write_buffer(staging, 0, data).and_then(|()| match target {
        UploadTarget::Buffer(dst, offset) => device.copy_buffer_to_buffer(staging, dst, offset, size),
        UploadTarget::Texture(dst, extent) => device.copy_buffer_to_texture(staging, dst, extent),
    });

    if let Err(e) = recorded {
        device.destroy_buffer(staging);
        tracker.record_free(AllocationKind::Buffer, size, false);
        return Err(e);
    }

    ring.push(RetiredResource::Buffer { handle: staging, size })?;
    tracker.record_retire();
    Ok(())
}
