/// Texture descriptor, formats and usage flags

use bitflags::bitflags;
use glam::UVec3;
use crate::graphics_device::AllocationStrategy;

/// Texture format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32B32A32_SFLOAT,
    D32_SFLOAT,
}

impl TextureFormat {
    /// Size of one texel in bytes
    pub fn bytes_per_texel(&self) -> u64 {
        match self {
            TextureFormat::R8_UNORM => 1,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::R32_SFLOAT
            | TextureFormat::D32_SFLOAT => 4,
            TextureFormat::R16G16B16A16_SFLOAT => 8,
            TextureFormat::R32G32B32A32_SFLOAT => 16,
        }
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled in shaders
        const SAMPLED = 0x01;
        /// Read/written as a storage image
        const STORAGE = 0x02;
        /// Color render target
        const COLOR_ATTACHMENT = 0x04;
        /// Depth/stencil render target
        const DEPTH_STENCIL = 0x08;
        /// Destination of a transfer (uploads)
        const TRANSFER_DST = 0x10;
    }
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    /// Width, height, and depth or array layers
    pub extent: UVec3,
    /// Texel format
    pub format: TextureFormat,
    /// Texture usage
    pub usage: TextureUsage,
    /// Memory allocation strategy
    pub strategy: AllocationStrategy,
}

impl TextureDesc {
    /// Size in bytes of the full texel data (mip 0)
    pub fn byte_size(&self) -> u64 {
        extent_byte_size(self.extent, self.format)
    }
}

/// Size in bytes of `extent` texels of `format`, saturating at `u64::MAX`
pub fn extent_byte_size(extent: UVec3, format: TextureFormat) -> u64 {
    checked_extent_byte_size(extent, format).unwrap_or(u64::MAX)
}

/// Size in bytes of `extent` texels of `format`, `None` if it overflows a `u64`
pub fn checked_extent_byte_size(extent: UVec3, format: TextureFormat) -> Option<u64> {
    (extent.x as u64)
        .checked_mul(extent.y as u64)?
        .checked_mul(extent.z.max(1) as u64)?
        .checked_mul(format.bytes_per_texel())
}
