/// Resources watched by the binder for generation changes
///
/// The binder never owns what it tracks: every arm holds weak references, so
/// a tracked resource whose owner dropped it simply reads as generation 0.

use std::sync::{Arc, Weak};
use crate::graphics_device::{DescriptorCategory, DescriptorResource};
use crate::resource::{ManagedBuffer, ManagedTexture, ManagedAccelerationStructure};

#[derive(Debug, Clone)]
pub enum TrackedResource {
    Buffer(Weak<ManagedBuffer>),
    Texture(Weak<ManagedTexture>),
    TextureArray(Vec<Weak<ManagedTexture>>),
    AccelerationStructure(Weak<ManagedAccelerationStructure>),
    BufferArray(Vec<Weak<ManagedBuffer>>),
}

impl TrackedResource {
    pub fn buffer(buffer: &Arc<ManagedBuffer>) -> Self {
        TrackedResource::Buffer(Arc::downgrade(buffer))
    }

    pub fn texture(texture: &Arc<ManagedTexture>) -> Self {
        TrackedResource::Texture(Arc::downgrade(texture))
    }

    pub fn texture_array(textures: &[Arc<ManagedTexture>]) -> Self {
        TrackedResource::TextureArray(textures.iter().map(Arc::downgrade).collect())
    }

    pub fn acceleration_structure(tlas: &Arc<ManagedAccelerationStructure>) -> Self {
        TrackedResource::AccelerationStructure(Arc::downgrade(tlas))
    }

    pub fn buffer_array(buffers: &[Arc<ManagedBuffer>]) -> Self {
        TrackedResource::BufferArray(buffers.iter().map(Arc::downgrade).collect())
    }

    /// Descriptor category the resource binds as
    pub fn category(&self) -> DescriptorCategory {
        match self {
            TrackedResource::Buffer(_) | TrackedResource::BufferArray(_) => DescriptorCategory::Buffer,
            TrackedResource::Texture(_) | TrackedResource::TextureArray(_) => DescriptorCategory::Image,
            TrackedResource::AccelerationStructure(_) => DescriptorCategory::AccelerationStructure,
        }
    }

    /// Current generation, 0 when there is nothing to bind
    ///
    /// Arrays report the sum of their element generations, so a resize of any
    /// element changes the total. An empty array, or one with a dropped or
    /// destroyed element, is 0.
    pub fn current_generation(&self) -> u64 {
        match self {
            TrackedResource::Buffer(weak) => weak.upgrade().map_or(0, |b| b.live_generation()),
            TrackedResource::Texture(weak) => weak.upgrade().map_or(0, |t| t.live_generation()),
            TrackedResource::AccelerationStructure(weak) => {
                weak.upgrade().map_or(0, |a| a.live_generation())
            }
            TrackedResource::TextureArray(weaks) => array_generation(
                weaks.iter().map(|weak| weak.upgrade().map_or(0, |t| t.live_generation())),
            ),
            TrackedResource::BufferArray(weaks) => array_generation(
                weaks.iter().map(|weak| weak.upgrade().map_or(0, |b| b.live_generation())),
            ),
        }
    }

    /// Whether the resource (or any array element) was dropped or destroyed
    ///
    /// An acceleration structure that has not been built yet is not dangling.
    pub fn is_dangling(&self) -> bool {
        match self {
            TrackedResource::Buffer(weak) => weak.upgrade().map_or(true, |b| !b.is_alive()),
            TrackedResource::Texture(weak) => weak.upgrade().map_or(true, |t| !t.is_alive()),
            TrackedResource::AccelerationStructure(weak) => weak.upgrade().is_none(),
            TrackedResource::TextureArray(weaks) => weaks
                .iter()
                .any(|weak| weak.upgrade().map_or(true, |t| !t.is_alive())),
            TrackedResource::BufferArray(weaks) => weaks
                .iter()
                .any(|weak| weak.upgrade().map_or(true, |b| !b.is_alive())),
        }
    }

    /// Whether this is an array with no element
    pub fn is_empty_array(&self) -> bool {
        match self {
            TrackedResource::TextureArray(weaks) => weaks.is_empty(),
            TrackedResource::BufferArray(weaks) => weaks.is_empty(),
            _ => false,
        }
    }

    /// Descriptor for the current handles, `None` if anything is missing
    pub fn descriptor(&self) -> Option<DescriptorResource> {
        match self {
            TrackedResource::Buffer(weak) => weak.upgrade()?.descriptor(),
            TrackedResource::Texture(weak) => weak.upgrade()?.descriptor(),
            TrackedResource::AccelerationStructure(weak) => weak.upgrade()?.descriptor(),
            TrackedResource::TextureArray(weaks) => {
                if weaks.is_empty() {
                    return None;
                }
                let handles = weaks
                    .iter()
                    .map(|weak| weak.upgrade().and_then(|t| t.handle()))
                    .collect::<Option<Vec<_>>>()?;
                Some(DescriptorResource::TextureArray(handles))
            }
            TrackedResource::BufferArray(weaks) => {
                if weaks.is_empty() {
                    return None;
                }
                let handles = weaks
                    .iter()
                    .map(|weak| weak.upgrade().and_then(|b| b.handle()))
                    .collect::<Option<Vec<_>>>()?;
                Some(DescriptorResource::BufferArray(handles))
            }
        }
    }
}

/// Sum of element generations, 0 as soon as one element reads 0
fn array_generation(mut generations: impl Iterator<Item = u64>) -> u64 {
    generations
        .try_fold(0u64, |total, generation| (generation != 0).then(|| total.saturating_add(generation)))
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "tracked_resource_tests.rs"]
mod tests;
