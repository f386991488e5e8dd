/// Managed GPU texture with a generation counter

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use glam::UVec3;
use crate::graphics_device::{
    TextureHandle, TextureFormat, TextureUsage, AllocationStrategy, DescriptorResource,
    extent_byte_size,
};

/// Creation parameters for a managed texture
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Unique name among live textures of a manager
    pub name: String,
    /// Width, height, and depth or array layers (all non-zero)
    pub extent: UVec3,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub strategy: AllocationStrategy,
    /// Optional initial texel data (exactly the texture byte size)
    pub initial_data: Option<Vec<u8>>,
}

impl TextureConfig {
    /// Sampled 2D texture in device-local memory
    pub fn sampled_2d(name: &str, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            name: name.to_string(),
            extent: UVec3::new(width, height, 1),
            format,
            usage: TextureUsage::SAMPLED | TextureUsage::TRANSFER_DST,
            strategy: AllocationStrategy::DeviceLocal,
            initial_data: None,
        }
    }

    /// Builder-style setter for the allocation strategy
    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder-style setter for the initial texel data
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.initial_data = Some(data);
        self
    }
}

#[derive(Debug)]
struct TextureState {
    handle: Option<TextureHandle>,
    extent: UVec3,
    generation: u64,
}

#[derive(Debug)]
pub struct ManagedTexture {
    name: String,
    format: TextureFormat,
    usage: TextureUsage,
    strategy: AllocationStrategy,
    state: RwLock<TextureState>,
}

impl ManagedTexture {
    pub(crate) fn new(
        name: String,
        format: TextureFormat,
        usage: TextureUsage,
        strategy: AllocationStrategy,
        handle: TextureHandle,
        extent: UVec3,
    ) -> Self {
        Self {
            name,
            format,
            usage,
            strategy,
            state: RwLock::new(TextureState {
                handle: Some(handle),
                extent,
                generation: 1,
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TextureState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TextureState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    pub fn extent(&self) -> UVec3 {
        self.read_state().extent
    }

    /// Size in bytes of the full texel data at the current extent
    pub fn byte_size(&self) -> u64 {
        extent_byte_size(self.extent(), self.format)
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.read_state().handle
    }

    /// Generation counter: 1 after creation, +1 per resize, never changed by updates
    pub fn generation(&self) -> u64 {
        self.read_state().generation
    }

    /// Generation of the live handle, 0 once destroyed
    pub fn live_generation(&self) -> u64 {
        let state = self.read_state();
        if state.handle.is_some() { state.generation } else { 0 }
    }

    pub fn is_alive(&self) -> bool {
        self.read_state().handle.is_some()
    }

    pub fn descriptor(&self) -> Option<DescriptorResource> {
        self.handle().map(DescriptorResource::Texture)
    }

    pub(crate) fn replace(&self, handle: TextureHandle, extent: UVec3) -> Option<TextureHandle> {
        let mut state = self.write_state();
        let old = state.handle.replace(handle);
        state.extent = extent;
        state.generation += 1;
        old
    }

    pub(crate) fn take_handle(&self) -> Option<TextureHandle> {
        self.write_state().handle.take()
    }
}
