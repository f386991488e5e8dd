/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Records every device call so tests can assert on allocation, exactly-once
/// destruction and the descriptor state of every frame slot.

use glam::UVec3;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, BufferHandle, TextureHandle, PipelineHandle,
    BufferDesc, TextureDesc, DescriptorResource,
};

/// Key of one descriptor: (pipeline, frame slot, set, binding)
pub type DescriptorKey = (PipelineHandle, usize, u32, u32);

#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    next_id: u64,
    /// Buffers currently allocated
    pub live_buffers: FxHashMap<BufferHandle, BufferDesc>,
    /// Textures currently allocated
    pub live_textures: FxHashMap<TextureHandle, TextureDesc>,
    /// Every buffer destroy call, in order (duplicates reveal double frees)
    pub destroyed_buffers: Vec<BufferHandle>,
    /// Every texture destroy call, in order
    pub destroyed_textures: Vec<TextureHandle>,
    /// Current content of every written descriptor
    pub descriptors: FxHashMap<DescriptorKey, DescriptorResource>,
    /// Number of descriptor writes issued
    pub descriptor_writes: usize,
    /// Textual log of data-path commands (writes, flushes, copies)
    pub commands: Vec<String>,
    /// Last frame tag received
    pub current_frame: Option<usize>,
    /// When set, every allocation fails with OutOfMemory
    pub fail_allocations: bool,
    /// When set, every descriptor write fails
    pub fail_descriptor_writes: bool,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Number of times `handle` was destroyed
    pub fn buffer_destroy_count(&self, handle: BufferHandle) -> usize {
        self.destroyed_buffers.iter().filter(|h| **h == handle).count()
    }

    /// Number of times `handle` was destroyed
    pub fn texture_destroy_count(&self, handle: TextureHandle) -> usize {
        self.destroyed_textures.iter().filter(|h| **h == handle).count()
    }

    /// Descriptor currently written at (pipeline, frame, set, binding)
    pub fn descriptor(&self, pipeline: PipelineHandle, frame_index: usize, set: u32, binding: u32) -> Option<&DescriptorResource> {
        self.descriptors.get(&(pipeline, frame_index, set, binding))
    }

    /// Number of commands whose text starts with `prefix`
    pub fn command_count(&self, prefix: &str) -> usize {
        self.commands.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        if self.fail_allocations {
            return Err(Error::OutOfMemory);
        }
        let handle = BufferHandle(self.next_id());
        self.live_buffers.insert(handle, desc.clone());
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        if self.fail_allocations {
            return Err(Error::OutOfMemory);
        }
        let handle = TextureHandle(self.next_id());
        self.live_textures.insert(handle, desc.clone());
        Ok(handle)
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        self.live_buffers.remove(&handle);
        self.destroyed_buffers.push(handle);
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.live_textures.remove(&handle);
        self.destroyed_textures.push(handle);
    }

    fn write_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let desc = self.live_buffers.get(&handle)
            .ok_or_else(|| Error::InvalidResource(format!("write to dead buffer {:?}", handle)))?;
        if offset + data.len() as u64 > desc.size {
            return Err(Error::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(), offset, desc.size
            )));
        }
        self.commands.push(format!("write_buffer {} {}", handle.0, data.len()));
        Ok(())
    }

    fn flush_buffer(&mut self, handle: BufferHandle, _offset: u64, size: u64) -> Result<()> {
        self.commands.push(format!("flush_buffer {} {}", handle.0, size));
        Ok(())
    }

    fn write_texture(&mut self, handle: TextureHandle, data: &[u8]) -> Result<()> {
        if !self.live_textures.contains_key(&handle) {
            return Err(Error::InvalidResource(format!("write to dead texture {:?}", handle)));
        }
        self.commands.push(format!("write_texture {} {}", handle.0, data.len()));
        Ok(())
    }

    fn copy_buffer_to_buffer(&mut self, src: BufferHandle, dst: BufferHandle, dst_offset: u64, size: u64) -> Result<()> {
        self.commands.push(format!("copy_buffer_to_buffer {} {} {} {}", src.0, dst.0, dst_offset, size));
        Ok(())
    }

    fn copy_buffer_to_texture(&mut self, src: BufferHandle, dst: TextureHandle, extent: UVec3) -> Result<()> {
        self.commands.push(format!("copy_buffer_to_texture {} {} {}x{}x{}", src.0, dst.0, extent.x, extent.y, extent.z));
        Ok(())
    }

    fn update_descriptor_set(
        &mut self,
        pipeline: PipelineHandle,
        frame_index: usize,
        set: u32,
        binding: u32,
        resource: &DescriptorResource,
    ) -> Result<()> {
        if self.fail_descriptor_writes {
            return Err(Error::BackendError("descriptor write rejected".to_string()));
        }
        self.descriptors.insert((pipeline, frame_index, set, binding), resource.clone());
        self.descriptor_writes += 1;
        Ok(())
    }

    fn begin_frame(&mut self, frame_index: usize) {
        self.current_frame = Some(frame_index);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
