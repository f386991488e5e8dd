/// Descriptor binding types and the resources written into descriptor sets

use bitflags::bitflags;
use crate::graphics_device::{BufferHandle, TextureHandle, AccelerationStructureHandle};

// ============================================================================
// Binding types
// ============================================================================

/// Type of resource expected at a descriptor binding (from shader reflection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Storage buffer (read/write structured data)
    StorageBuffer,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
    /// Storage image (read/write image)
    StorageImage,
    /// Ray tracing acceleration structure
    AccelerationStructure,
}

/// Broad category of a descriptor, used to type-check named binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorCategory {
    Buffer,
    Image,
    AccelerationStructure,
}

impl BindingType {
    /// Category of resource this binding accepts
    pub fn category(&self) -> DescriptorCategory {
        match self {
            BindingType::UniformBuffer | BindingType::StorageBuffer => DescriptorCategory::Buffer,
            BindingType::CombinedImageSampler | BindingType::StorageImage => DescriptorCategory::Image,
            BindingType::AccelerationStructure => DescriptorCategory::AccelerationStructure,
        }
    }
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const COMPUTE = 0x04;
        const RAY_TRACING = 0x08;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

// ============================================================================
// Descriptor resources
// ============================================================================

/// A concrete resource written into one descriptor binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorResource {
    /// Whole-buffer range (uniform or storage)
    Buffer {
        handle: BufferHandle,
        size: u64,
    },
    /// Single texture (combined image sampler or storage image)
    Texture(TextureHandle),
    /// Descriptor array of textures
    TextureArray(Vec<TextureHandle>),
    /// Descriptor array of buffers
    BufferArray(Vec<BufferHandle>),
    /// Top-level acceleration structure
    AccelerationStructure(AccelerationStructureHandle),
}
