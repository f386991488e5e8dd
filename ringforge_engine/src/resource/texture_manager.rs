/// TextureManager - creation, upload, resize and deferred destruction of textures

use std::sync::{Arc, Mutex, PoisonError};
use glam::UVec3;
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, TextureHandle, TextureDesc, TextureFormat, AllocationStrategy,
    extent_byte_size, checked_extent_byte_size, lock_device,
};
use crate::resource::memory_tracker::AllocationKind;
use crate::resource::upload::{staged_upload, UploadTarget};
use crate::resource::{FrameRing, RetiredResource, ManagedTexture, TextureConfig, GpuMemoryTracker};
use crate::{engine_debug, engine_trace, engine_warn, engine_fail};

/// Texture counterpart of `BufferManager`
///
/// Texture updates are full uploads of mip 0: the data must be exactly
/// `extent.x * extent.y * extent.z * bytes_per_texel` bytes.
pub struct TextureManager {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    tracker: Arc<GpuMemoryTracker>,
    textures: FxHashMap<String, Arc<ManagedTexture>>,
    retired: FrameRing<RetiredResource>,
}

impl TextureManager {
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        frames_in_flight: usize,
        tracker: Arc<GpuMemoryTracker>,
    ) -> Self {
        Self {
            device,
            tracker,
            textures: FxHashMap::default(),
            retired: FrameRing::new(frames_in_flight),
        }
    }

    /// Allocate a texture, upload the optional initial data and register it
    ///
    /// # Errors
    ///
    /// - `InvalidResource` for an empty or already used name, a zero extent
    ///   component, an extent whose byte size overflows or initial data of
    ///   the wrong size
    /// - `OutOfMemory` / `AllocationFailed` from the device
    pub fn create(&mut self, config: TextureConfig) -> Result<Arc<ManagedTexture>> {
        if config.name.is_empty() {
            return Err(engine_fail!("ringforge::TextureManager",
                Error::InvalidResource("texture name must not be empty".to_string())));
        }
        let byte_size = validate_extent(&config.name, config.extent, config.format)?;
        if self.textures.contains_key(&config.name) {
            return Err(engine_fail!("ringforge::TextureManager",
                Error::InvalidResource(format!("texture '{}' already exists", config.name))));
        }
        if let Some(data) = &config.initial_data {
            check_upload_size(&config.name, data.len(), byte_size)?;
        }
        self.textures.try_reserve(1).map_err(|_| engine_fail!("ringforge::TextureManager", Error::OutOfMemory))?;
        if config.initial_data.is_some() && config.strategy == AllocationStrategy::DeviceLocal {
            self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::TextureManager", e))?;
        }

        let mut device = lock_device(&self.device)?;
        let handle = device
            .create_texture(&TextureDesc {
                name: config.name.clone(),
                extent: config.extent,
                format: config.format,
                usage: config.usage,
                strategy: config.strategy,
            })
            .map_err(|e| engine_fail!("ringforge::TextureManager", e))?;
        self.tracker.record_allocation(AllocationKind::Texture, byte_size);

        if let Some(data) = &config.initial_data {
            let written = write_texture_data(
                &mut *device, &self.tracker, &mut self.retired,
                &config.name, handle, config.extent, config.strategy, data,
            );
            if let Err(e) = written {
                device.destroy_texture(handle);
                self.tracker.record_free(AllocationKind::Texture, byte_size, false);
                return Err(e);
            }
        }
        drop(device);

        let texture = Arc::new(ManagedTexture::new(
            config.name.clone(),
            config.format,
            config.usage,
            config.strategy,
            handle,
            config.extent,
        ));
        self.textures.insert(config.name.clone(), Arc::clone(&texture));

        engine_debug!("ringforge::TextureManager", "Created texture '{}' ({}x{}x{} {:?})",
            config.name, config.extent.x, config.extent.y, config.extent.z, config.format);

        Ok(texture)
    }

    /// Upload the full texel data (generation unchanged)
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the texture was destroyed
    /// - `InvalidResource` if `data` is not exactly the texture byte size
    pub fn update(&mut self, texture: &ManagedTexture, data: &[u8]) -> Result<()> {
        let handle = texture.handle().ok_or_else(|| destroyed(texture.name()))?;
        let extent = texture.extent();
        check_upload_size(texture.name(), data.len(), extent_byte_size(extent, texture.format()))?;
        if texture.strategy() == AllocationStrategy::DeviceLocal {
            self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::TextureManager", e))?;
        }

        let mut device = lock_device(&self.device)?;
        write_texture_data(
            &mut *device, &self.tracker, &mut self.retired,
            texture.name(), handle, extent, texture.strategy(), data,
        )?;

        engine_trace!("ringforge::TextureManager", "Uploaded texture '{}' ({} bytes)",
            texture.name(), data.len());
        Ok(())
    }

    /// Reallocate the texture at `new_extent` and bump its generation
    ///
    /// Same contract as `BufferManager::resize`: the old image is freed F
    /// frames later, content is not carried over, and an unchanged extent
    /// is a no-op returning `false`.
    pub fn resize(&mut self, texture: &ManagedTexture, new_extent: UVec3) -> Result<bool> {
        let old_extent = texture.extent();
        if !texture.is_alive() {
            return Err(destroyed(texture.name()));
        }
        let new_size = validate_extent(texture.name(), new_extent, texture.format())?;
        if new_extent == old_extent {
            return Ok(false);
        }

        self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::TextureManager", e))?;

        let mut device = lock_device(&self.device)?;
        let new_handle = device
            .create_texture(&TextureDesc {
                name: texture.name().to_string(),
                extent: new_extent,
                format: texture.format(),
                usage: texture.usage(),
                strategy: texture.strategy(),
            })
            .map_err(|e| engine_fail!("ringforge::TextureManager", e))?;
        drop(device);
        self.tracker.record_allocation(AllocationKind::Texture, new_size);

        if let Some(old_handle) = texture.replace(new_handle, new_extent) {
            self.retired.push(RetiredResource::Texture {
                handle: old_handle,
                size: extent_byte_size(old_extent, texture.format()),
            })?;
            self.tracker.record_retire();
        }

        engine_debug!("ringforge::TextureManager", "Resized texture '{}' to {}x{}x{} (generation {})",
            texture.name(), new_extent.x, new_extent.y, new_extent.z, texture.generation());
        Ok(true)
    }

    /// Unregister the texture and park its image for a deferred free
    ///
    /// Destroying an already destroyed texture is a no-op.
    pub fn destroy(&mut self, texture: &ManagedTexture) -> Result<()> {
        let Some(handle) = texture.handle() else {
            return Ok(());
        };
        let owned = self.textures.get(texture.name())
            .map_or(false, |registered| std::ptr::eq(Arc::as_ptr(registered), texture));
        if !owned {
            return Err(engine_fail!("ringforge::TextureManager", Error::ResourceNotFound(format!(
                "texture '{}' is not managed here", texture.name()
            ))));
        }

        self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::TextureManager", e))?;
        self.textures.remove(texture.name());
        let _ = texture.take_handle();
        self.retired.push(RetiredResource::Texture { handle, size: texture.byte_size() })?;
        self.tracker.record_retire();

        engine_debug!("ringforge::TextureManager", "Destroyed texture '{}' (free deferred)", texture.name());
        Ok(())
    }

    /// Destroy the live texture registered under `name`
    pub fn destroy_by_name(&mut self, name: &str) -> Result<()> {
        let texture = self.texture(name).ok_or_else(|| {
            engine_fail!("ringforge::TextureManager", Error::ResourceNotFound(format!("texture '{}'", name)))
        })?;
        self.destroy(&texture)
    }

    /// Enter `frame_index` and free every allocation retired F frames ago
    pub fn begin_frame(&mut self, frame_index: usize) -> usize {
        let expired = self.retired.advance(frame_index);
        if expired.is_empty() {
            return 0;
        }

        let count = expired.len();
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);
        for resource in expired {
            resource.free(&mut *device, &self.tracker);
        }

        engine_trace!("ringforge::TextureManager", "Frame {}: freed {} retired allocation(s)",
            frame_index, count);
        count
    }

    /// Free everything immediately (call after the device is idle)
    pub fn shutdown(&mut self) {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);

        for resource in self.retired.drain_all() {
            resource.free(&mut *device, &self.tracker);
        }

        let live = self.textures.len();
        for (_, texture) in self.textures.drain() {
            let size = texture.byte_size();
            if let Some(handle) = texture.take_handle() {
                device.destroy_texture(handle);
                self.tracker.record_free(AllocationKind::Texture, size, false);
            }
        }

        if live > 0 {
            engine_warn!("ringforge::TextureManager", "Shutdown freed {} live texture(s)", live);
        }
    }

    pub fn texture(&self, name: &str) -> Option<Arc<ManagedTexture>> {
        self.textures.get(name).cloned()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn pending_destroy_count(&self) -> usize {
        self.retired.pending_count()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.retired.frames_in_flight()
    }

    pub fn memory_tracker(&self) -> &Arc<GpuMemoryTracker> {
        &self.tracker
    }
}

/// Byte size of a valid extent
fn validate_extent(name: &str, extent: UVec3, format: TextureFormat) -> Result<u64> {
    if extent.x == 0 || extent.y == 0 || extent.z == 0 {
        return Err(engine_fail!("ringforge::TextureManager", Error::InvalidResource(format!(
            "texture '{}' has a zero extent ({}x{}x{})", name, extent.x, extent.y, extent.z
        ))));
    }
    checked_extent_byte_size(extent, format).ok_or_else(|| {
        engine_fail!("ringforge::TextureManager", Error::InvalidResource(format!(
            "texture '{}' extent {}x{}x{} of {:?} overflows a 64-bit byte size",
            name, extent.x, extent.y, extent.z, format
        )))
    })
}

fn check_upload_size(name: &str, len: usize, expected: u64) -> Result<()> {
    if len as u64 != expected {
        return Err(engine_fail!("ringforge::TextureManager", Error::InvalidResource(format!(
            "texture '{}' expects {} bytes of texel data, got {}", name, expected, len
        ))));
    }
    Ok(())
}

fn destroyed(name: &str) -> Error {
    engine_fail!("ringforge::TextureManager", Error::ResourceNotFound(format!("texture '{}' was destroyed", name)))
}

#[allow(clippy::too_many_arguments)]
fn write_texture_data(
    device: &mut dyn GraphicsDevice,
    tracker: &GpuMemoryTracker,
    ring: &mut FrameRing<RetiredResource>,
    name: &str,
    handle: TextureHandle,
    extent: UVec3,
    strategy: AllocationStrategy,
    data: &[u8],
) -> Result<()> {
    let written = if strategy.is_host_writable() {
        device.write_texture(handle, data)
    } else {
        staged_upload(device, tracker, ring, name, data, UploadTarget::Texture(handle, extent))
    };
    written.map_err(|e| engine_fail!("ringforge::TextureManager", e))
}

#[cfg(test)]
#[path = "texture_manager_tests.rs"]
mod tests;
