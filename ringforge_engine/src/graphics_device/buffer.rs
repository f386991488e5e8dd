/// Buffer descriptor, usage flags and allocation strategies

use bitflags::bitflags;

bitflags! {
    /// Buffer usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex buffer
        const VERTEX = 0x01;
        /// Index buffer
        const INDEX = 0x02;
        /// Uniform/constant buffer
        const UNIFORM = 0x04;
        /// Storage buffer
        const STORAGE = 0x08;
        /// Source of a transfer (staging)
        const TRANSFER_SRC = 0x10;
        /// Destination of a transfer
        const TRANSFER_DST = 0x20;
    }
}

/// How the memory behind a resource is allocated and written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationStrategy {
    /// Device-local memory, written through a staging buffer and a copy command
    DeviceLocal,
    /// Host-visible coherent memory, written directly (map + write + unmap)
    HostVisible,
    /// Host-cached non-coherent memory, written directly then flushed
    HostCached,
}

impl AllocationStrategy {
    /// Whether the CPU can write the memory directly
    pub fn is_host_writable(&self) -> bool {
        !matches!(self, AllocationStrategy::DeviceLocal)
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
    /// Memory allocation strategy
    pub strategy: AllocationStrategy,
}
