#![allow(dead_code)]
//! Device test utilities - Recording graphics device for integration tests
//!
//! Integration tests only see the public API, so they cannot reach the
//! crate's internal mock. `RecordingDevice` implements `GraphicsDevice` with
//! plain bookkeeping: allocated handles, every destroy call and the current
//! content of every descriptor of every frame slot.
//!
//! # Example
//!
//! ```ignore
//! let (device, shared) = create_test_device();
//! let mut ctx = GpuContext::new(Config::default(), shared)?;
//! // ... drive frames ...
//! assert_eq!(device.lock().unwrap().buffer_destroy_count(old), 1);
//! ```

use ringforge_engine::glam::UVec3;
use ringforge_engine::ringforge::{Error, Result, GraphicsDevice};
use ringforge_engine::ringforge::device::{
    BufferHandle, TextureHandle, PipelineHandle, BufferDesc, TextureDesc, DescriptorResource,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Key of one descriptor: (pipeline, frame slot, set, binding)
pub type DescriptorKey = (PipelineHandle, usize, u32, u32);

#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u64,
    pub live_buffers: HashMap<BufferHandle, BufferDesc>,
    pub live_textures: HashMap<TextureHandle, TextureDesc>,
    pub destroyed_buffers: Vec<BufferHandle>,
    pub destroyed_textures: Vec<TextureHandle>,
    pub descriptors: HashMap<DescriptorKey, DescriptorResource>,
    pub frame_tags: Vec<usize>,
    pub uploads: usize,
}

impl RecordingDevice {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn buffer_destroy_count(&self, handle: BufferHandle) -> usize {
        self.destroyed_buffers.iter().filter(|h| **h == handle).count()
    }

    pub fn texture_destroy_count(&self, handle: TextureHandle) -> usize {
        self.destroyed_textures.iter().filter(|h| **h == handle).count()
    }

    pub fn descriptor(&self, pipeline: PipelineHandle, frame_index: usize, set: u32, binding: u32) -> Option<&DescriptorResource> {
        self.descriptors.get(&(pipeline, frame_index, set, binding))
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<BufferHandle> {
        let handle = BufferHandle(self.next_id());
        self.live_buffers.insert(handle, desc.clone());
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
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
        match self.live_buffers.get(&handle) {
            Some(desc) if offset + data.len() as u64 <= desc.size => Ok(()),
            Some(_) => Err(Error::InvalidResource("write overflows buffer".to_string())),
            None => Err(Error::InvalidResource(format!("write to dead buffer {:?}", handle))),
        }
    }

    fn flush_buffer(&mut self, _handle: BufferHandle, _offset: u64, _size: u64) -> Result<()> {
        Ok(())
    }

    fn write_texture(&mut self, handle: TextureHandle, _data: &[u8]) -> Result<()> {
        if self.live_textures.contains_key(&handle) {
            Ok(())
        } else {
            Err(Error::InvalidResource(format!("write to dead texture {:?}", handle)))
        }
    }

    fn copy_buffer_to_buffer(&mut self, _src: BufferHandle, _dst: BufferHandle, _dst_offset: u64, _size: u64) -> Result<()> {
        self.uploads += 1;
        Ok(())
    }

    fn copy_buffer_to_texture(&mut self, _src: BufferHandle, _dst: TextureHandle, _extent: UVec3) -> Result<()> {
        self.uploads += 1;
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
        self.descriptors.insert((pipeline, frame_index, set, binding), resource.clone());
        Ok(())
    }

    fn begin_frame(&mut self, frame_index: usize) {
        self.frame_tags.push(frame_index);
    }
}

/// Create a recording device and the same device as the shared trait object
///
/// The first value keeps the concrete type for assertions.
pub fn create_test_device() -> (Arc<Mutex<RecordingDevice>>, Arc<Mutex<dyn GraphicsDevice>>) {
    let device = Arc::new(Mutex::new(RecordingDevice::default()));
    let shared: Arc<Mutex<dyn GraphicsDevice>> = device.clone();
    (device, shared)
}
