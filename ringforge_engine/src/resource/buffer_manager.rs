/// BufferManager - creation, update, resize and deferred destruction of buffers
///
/// Every device allocation that may still be referenced by in-flight GPU work
/// (resized-away buffers, destroyed buffers, staging buffers) is parked in a
/// `FrameRing` and freed F frames later by `begin_frame`.
///
/// # Example
///
/// ```ignore
/// let mut buffers = BufferManager::new(device.clone(), 2, tracker.clone());
/// let camera = buffers.create(BufferConfig::uniform("Camera", 64))?;
/// buffers.update(&camera, bytemuck::bytes_of(&camera_data))?;
/// buffers.resize(&camera, 128)?;      // generation 1 -> 2
///
/// // every frame
/// buffers.begin_frame(frame_index);   // frees what was retired F frames ago
/// ```

use std::sync::{Arc, Mutex, PoisonError};
use rustc_hash::FxHashMap;
use bytemuck::Pod;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, BufferHandle, BufferDesc, AllocationStrategy, lock_device};
use crate::resource::memory_tracker::AllocationKind;
use crate::resource::upload::{staged_upload, UploadTarget};
use crate::resource::{FrameRing, RetiredResource, ManagedBuffer, BufferConfig, GpuMemoryTracker};
use crate::{engine_debug, engine_trace, engine_warn, engine_fail};

pub struct BufferManager {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    tracker: Arc<GpuMemoryTracker>,
    /// Live buffers by name
    buffers: FxHashMap<String, Arc<ManagedBuffer>>,
    /// Allocations waiting for the GPU
    retired: FrameRing<RetiredResource>,
}

impl BufferManager {
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        frames_in_flight: usize,
        tracker: Arc<GpuMemoryTracker>,
    ) -> Self {
        Self {
            device,
            tracker,
            buffers: FxHashMap::default(),
            retired: FrameRing::new(frames_in_flight),
        }
    }

    // ===== CREATION =====

    /// Allocate a buffer, upload the optional initial data and register it
    ///
    /// The returned buffer starts at generation 1. On any failure nothing is
    /// registered and no device allocation is left behind.
    ///
    /// # Errors
    ///
    /// - `InvalidResource` for an empty or already used name, a zero size or
    ///   initial data larger than the buffer
    /// - `OutOfMemory` / `AllocationFailed` from the device
    pub fn create(&mut self, config: BufferConfig) -> Result<Arc<ManagedBuffer>> {
        if config.name.is_empty() {
            return Err(engine_fail!("ringforge::BufferManager",
                Error::InvalidResource("buffer name must not be empty".to_string())));
        }
        if config.size == 0 {
            return Err(engine_fail!("ringforge::BufferManager",
                Error::InvalidResource(format!("buffer '{}' has zero size", config.name))));
        }
        if self.buffers.contains_key(&config.name) {
            return Err(engine_fail!("ringforge::BufferManager",
                Error::InvalidResource(format!("buffer '{}' already exists", config.name))));
        }
        if let Some(data) = &config.initial_data {
            if data.len() as u64 > config.size {
                return Err(engine_fail!("ringforge::BufferManager", Error::InvalidResource(format!(
                    "initial data of {} bytes exceeds buffer '{}' of {} bytes",
                    data.len(), config.name, config.size
                ))));
            }
        }
        self.buffers.try_reserve(1).map_err(|_| engine_fail!("ringforge::BufferManager", Error::OutOfMemory))?;
        if config.initial_data.is_some() && config.strategy == AllocationStrategy::DeviceLocal {
            self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::BufferManager", e))?;
        }

        let mut device = lock_device(&self.device)?;
        let handle = device
            .create_buffer(&BufferDesc {
                name: config.name.clone(),
                size: config.size,
                usage: config.usage,
                strategy: config.strategy,
            })
            .map_err(|e| engine_fail!("ringforge::BufferManager", e))?;
        self.tracker.record_allocation(AllocationKind::Buffer, config.size);

        if let Some(data) = config.initial_data.as_ref().filter(|d| !d.is_empty()) {
            let written = write_buffer_data(
                &mut *device, &self.tracker, &mut self.retired,
                &config.name, handle, config.strategy, 0, data,
            );
            if let Err(e) = written {
                // Never submitted: safe to free on the spot
                device.destroy_buffer(handle);
                self.tracker.record_free(AllocationKind::Buffer, config.size, false);
                return Err(e);
            }
        }
        drop(device);

        let buffer = Arc::new(ManagedBuffer::new(
            config.name.clone(),
            config.usage,
            config.strategy,
            handle,
            config.size,
        ));
        self.buffers.insert(config.name.clone(), Arc::clone(&buffer));

        engine_debug!("ringforge::BufferManager", "Created buffer '{}' ({} bytes, {:?})",
            config.name, config.size, config.strategy);

        Ok(buffer)
    }

    // ===== UPDATE =====

    /// Overwrite the buffer content from offset 0 (generation unchanged)
    pub fn update(&mut self, buffer: &ManagedBuffer, data: &[u8]) -> Result<()> {
        self.update_at(buffer, 0, data)
    }

    /// Overwrite the buffer content from a slice of plain-old-data values
    pub fn update_typed<T: Pod>(&mut self, buffer: &ManagedBuffer, data: &[T]) -> Result<()> {
        self.update_at(buffer, 0, bytemuck::cast_slice(data))
    }

    /// Overwrite `data.len()` bytes at `offset` (generation unchanged)
    ///
    /// Host-visible buffers are written directly, host-cached buffers are
    /// written then flushed, device-local buffers go through a staging buffer
    /// that is retired like any other allocation.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the buffer was destroyed
    /// - `InvalidResource` if the write does not fit
    pub fn update_at(&mut self, buffer: &ManagedBuffer, offset: u64, data: &[u8]) -> Result<()> {
        let (handle, size, _) = buffer.snapshot().ok_or_else(|| destroyed(buffer.name()))?;
        let end = offset.checked_add(data.len() as u64);
        if end.map_or(true, |end| end > size) {
            return Err(engine_fail!("ringforge::BufferManager", Error::InvalidResource(format!(
                "write of {} bytes at offset {} overflows buffer '{}' of {} bytes",
                data.len(), offset, buffer.name(), size
            ))));
        }
        if data.is_empty() {
            return Ok(());
        }
        if buffer.strategy() == AllocationStrategy::DeviceLocal {
            self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::BufferManager", e))?;
        }

        let mut device = lock_device(&self.device)?;
        write_buffer_data(
            &mut *device, &self.tracker, &mut self.retired,
            buffer.name(), handle, buffer.strategy(), offset, data,
        )?;

        engine_trace!("ringforge::BufferManager", "Updated buffer '{}' ({} bytes at {})",
            buffer.name(), data.len(), offset);
        Ok(())
    }

    // ===== RESIZE =====

    /// Reallocate the buffer at `new_size` and bump its generation
    ///
    /// The old allocation is parked in the current frame slot and freed F
    /// frames later. Content is not carried over. Resizing to the current
    /// size is a no-op and returns `false`.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the buffer was destroyed
    /// - `InvalidResource` for a zero size
    /// - `OutOfMemory` / `AllocationFailed`: the buffer keeps its old allocation
    ///   and generation
    pub fn resize(&mut self, buffer: &ManagedBuffer, new_size: u64) -> Result<bool> {
        let (_, size, _) = buffer.snapshot().ok_or_else(|| destroyed(buffer.name()))?;
        if new_size == 0 {
            return Err(engine_fail!("ringforge::BufferManager",
                Error::InvalidResource(format!("buffer '{}' resized to zero", buffer.name()))));
        }
        if new_size == size {
            return Ok(false);
        }

        // Reserve the ring entry first so parking the old handle cannot fail
        self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::BufferManager", e))?;

        let mut device = lock_device(&self.device)?;
        let new_handle = device
            .create_buffer(&BufferDesc {
                name: buffer.name().to_string(),
                size: new_size,
                usage: buffer.usage(),
                strategy: buffer.strategy(),
            })
            .map_err(|e| engine_fail!("ringforge::BufferManager", e))?;
        drop(device);
        self.tracker.record_allocation(AllocationKind::Buffer, new_size);

        if let Some(old_handle) = buffer.replace(new_handle, new_size) {
            self.retired.push(RetiredResource::Buffer { handle: old_handle, size })?;
            self.tracker.record_retire();
        }

        engine_debug!("ringforge::BufferManager", "Resized buffer '{}' {} -> {} bytes (generation {})",
            buffer.name(), size, new_size, buffer.generation());
        Ok(true)
    }

    // ===== DESTRUCTION =====

    /// Unregister the buffer and park its allocation for a deferred free
    ///
    /// Destroying an already destroyed buffer is a no-op.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if the buffer does not belong to this manager
    /// - `OutOfMemory` if the ring cannot grow: the buffer stays registered and alive
    pub fn destroy(&mut self, buffer: &ManagedBuffer) -> Result<()> {
        let Some((handle, size, _)) = buffer.snapshot() else {
            return Ok(());
        };
        let owned = self.buffers.get(buffer.name())
            .map_or(false, |registered| std::ptr::eq(Arc::as_ptr(registered), buffer));
        if !owned {
            return Err(engine_fail!("ringforge::BufferManager", Error::ResourceNotFound(format!(
                "buffer '{}' is not managed here", buffer.name()
            ))));
        }

        self.retired.reserve(1).map_err(|e| engine_fail!("ringforge::BufferManager", e))?;
        self.buffers.remove(buffer.name());
        let _ = buffer.take_handle();
        self.retired.push(RetiredResource::Buffer { handle, size })?;
        self.tracker.record_retire();

        engine_debug!("ringforge::BufferManager", "Destroyed buffer '{}' (free deferred)", buffer.name());
        Ok(())
    }

    /// Destroy the live buffer registered under `name`
    pub fn destroy_by_name(&mut self, name: &str) -> Result<()> {
        let buffer = self.buffer(name).ok_or_else(|| {
            engine_fail!("ringforge::BufferManager", Error::ResourceNotFound(format!("buffer '{}'", name)))
        })?;
        self.destroy(&buffer)
    }

    // ===== FRAME PACING =====

    /// Enter `frame_index` and free every allocation retired F frames ago
    ///
    /// Returns the number of allocations freed.
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

        engine_trace!("ringforge::BufferManager", "Frame {}: freed {} retired allocation(s)",
            frame_index, count);
        count
    }

    /// Free everything immediately (call after the device is idle)
    ///
    /// Parked allocations and live buffers are freed. Live `ManagedBuffer`s
    /// held elsewhere read as destroyed afterwards.
    pub fn shutdown(&mut self) {
        let mut device = self.device.lock().unwrap_or_else(PoisonError::into_inner);

        for resource in self.retired.drain_all() {
            resource.free(&mut *device, &self.tracker);
        }

        let live = self.buffers.len();
        for (_, buffer) in self.buffers.drain() {
            let size = buffer.size();
            if let Some(handle) = buffer.take_handle() {
                device.destroy_buffer(handle);
                self.tracker.record_free(AllocationKind::Buffer, size, false);
            }
        }

        if live > 0 {
            engine_warn!("ringforge::BufferManager", "Shutdown freed {} live buffer(s)", live);
        }
    }

    // ===== ACCESSORS =====

    /// Live buffer registered under `name`
    pub fn buffer(&self, name: &str) -> Option<Arc<ManagedBuffer>> {
        self.buffers.get(name).cloned()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Allocations parked in the ring (retired buffers and staging buffers)
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

/// Write `data` at `offset` into `handle` according to `strategy`
#[allow(clippy::too_many_arguments)]
fn write_buffer_data(
    device: &mut dyn GraphicsDevice,
    tracker: &GpuMemoryTracker,
    ring: &mut FrameRing<RetiredResource>,
    name: &str,
    handle: BufferHandle,
    strategy: AllocationStrategy,
    offset: u64,
    data: &[u8],
) -> Result<()> {
    let written = match strategy {
        AllocationStrategy::HostVisible => device.write_buffer(handle, offset, data),
        AllocationStrategy::HostCached => device
            .write_buffer(handle, offset, data)
            .and_then(|()| device.flush_buffer(handle, offset, data.len() as u64)),
        AllocationStrategy::DeviceLocal => {
            staged_upload(device, tracker, ring, name, data, UploadTarget::Buffer(handle, offset))
        }
    };
    written.map_err(|e| engine_fail!("ringforge::BufferManager", e))
}

fn destroyed(name: &str) -> Error {
    engine_fail!("ringforge::BufferManager", Error::ResourceNotFound(format!("buffer '{}' was destroyed", name)))
}

#[cfg(test)]
#[path = "buffer_manager_tests.rs"]
mod tests;
