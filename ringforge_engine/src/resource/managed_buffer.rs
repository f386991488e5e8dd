/// Managed GPU buffer with a generation counter
///
/// A `ManagedBuffer` is the stable identity of a buffer across resizes. The
/// manager swaps the underlying device handle on resize and bumps the
/// generation so the binder can detect that descriptor sets are stale.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};
use crate::graphics_device::{BufferHandle, BufferUsage, AllocationStrategy, DescriptorResource};

/// Creation parameters for a managed buffer
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Unique name among live buffers of a manager
    pub name: String,
    /// Size in bytes (non-zero)
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory allocation strategy
    pub strategy: AllocationStrategy,
    /// Optional initial content (at most `size` bytes)
    pub initial_data: Option<Vec<u8>>,
}

impl BufferConfig {
    /// Uniform buffer written directly from the CPU
    pub fn uniform(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            usage: BufferUsage::UNIFORM,
            strategy: AllocationStrategy::HostVisible,
            initial_data: None,
        }
    }

    /// Storage buffer in device-local memory
    pub fn storage(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
            usage: BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
            strategy: AllocationStrategy::DeviceLocal,
            initial_data: None,
        }
    }

    /// Builder-style setter for the allocation strategy
    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder-style setter for the initial content
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.initial_data = Some(data);
        self
    }
}

#[derive(Debug)]
struct BufferState {
    handle: Option<BufferHandle>,
    size: u64,
    generation: u64,
}

#[derive(Debug)]
pub struct ManagedBuffer {
    name: String,
    usage: BufferUsage,
    strategy: AllocationStrategy,
    state: RwLock<BufferState>,
}

impl ManagedBuffer {
    /// Wrap a freshly created device buffer (generation 1)
    pub(crate) fn new(
        name: String,
        usage: BufferUsage,
        strategy: AllocationStrategy,
        handle: BufferHandle,
        size: u64,
    ) -> Self {
        Self {
            name,
            usage,
            strategy,
            state: RwLock::new(BufferState {
                handle: Some(handle),
                size,
                generation: 1,
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, BufferState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, BufferState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    /// Current size in bytes
    pub fn size(&self) -> u64 {
        self.read_state().size
    }

    /// Current device handle, `None` once destroyed
    pub fn handle(&self) -> Option<BufferHandle> {
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

    /// Handle, size and generation read under one lock
    pub fn snapshot(&self) -> Option<(BufferHandle, u64, u64)> {
        let state = self.read_state();
        state.handle.map(|handle| (handle, state.size, state.generation))
    }

    /// Descriptor covering the whole buffer, `None` once destroyed
    pub fn descriptor(&self) -> Option<DescriptorResource> {
        self.snapshot().map(|(handle, size, _)| DescriptorResource::Buffer { handle, size })
    }

    // ===== MANAGER SIDE =====

    /// Swap in a new allocation and bump the generation, returning the old handle
    pub(crate) fn replace(&self, handle: BufferHandle, size: u64) -> Option<BufferHandle> {
        let mut state = self.write_state();
        let old = state.handle.replace(handle);
        state.size = size;
        state.generation += 1;
        old
    }

    /// Detach the device handle (destroy); the generation is left untouched
    pub(crate) fn take_handle(&self) -> Option<BufferHandle> {
        self.write_state().handle.take()
    }
}
