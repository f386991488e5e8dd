/// Acceleration structure slot tracked by the binder
///
/// Acceleration structures are built by the application (usually rebuilt when
/// geometry changes), so there is no manager: the owner publishes each new
/// build with `replace`, which bumps the generation the same way a buffer
/// resize does.

use std::sync::{RwLock, PoisonError};
use crate::graphics_device::{AccelerationStructureHandle, DescriptorResource};

#[derive(Debug)]
struct AccelerationStructureState {
    handle: Option<AccelerationStructureHandle>,
    generation: u64,
}

#[derive(Debug)]
pub struct ManagedAccelerationStructure {
    name: String,
    state: RwLock<AccelerationStructureState>,
}

impl ManagedAccelerationStructure {
    /// Create an empty slot (generation 0 until the first build is published)
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(AccelerationStructureState {
                handle: None,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle(&self) -> Option<AccelerationStructureHandle> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).handle
    }

    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Generation of the published handle, 0 while empty
    pub fn live_generation(&self) -> u64 {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.handle.is_some() { state.generation } else { 0 }
    }

    pub fn descriptor(&self) -> Option<DescriptorResource> {
        self.handle().map(DescriptorResource::AccelerationStructure)
    }

    /// Publish a new build, returning the previous one
    ///
    /// The caller owns the previous handle and must keep it alive until the
    /// frames still referencing it have completed.
    pub fn replace(&self, handle: AccelerationStructureHandle) -> Option<AccelerationStructureHandle> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        state.handle.replace(handle)
    }

    /// Remove the published build, returning it
    pub fn clear(&self) -> Option<AccelerationStructureHandle> {
        self.state.write().unwrap_or_else(PoisonError::into_inner).handle.take()
    }
}
