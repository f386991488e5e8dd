/// GPU memory accounting shared by the resource managers

use std::sync::atomic::{AtomicU64, Ordering};

/// Kind of tracked GPU allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    Buffer,
    Texture,
}

/// Lock-free counters of live GPU allocations and deferred frees
///
/// Updated by the managers on every create, retire and free; read as a
/// consistent-enough `MemoryStats` snapshot for diagnostics.
#[derive(Debug, Default)]
pub struct GpuMemoryTracker {
    live_buffers: AtomicU64,
    live_textures: AtomicU64,
    buffer_bytes: AtomicU64,
    texture_bytes: AtomicU64,
    pending_frees: AtomicU64,
    total_allocations: AtomicU64,
    total_frees: AtomicU64,
}

/// Point-in-time copy of the tracker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Buffers allocated and not yet freed (includes parked ones)
    pub live_buffers: u64,
    /// Textures allocated and not yet freed (includes parked ones)
    pub live_textures: u64,
    /// Bytes held by live buffers
    pub buffer_bytes: u64,
    /// Bytes held by live textures
    pub texture_bytes: u64,
    /// Allocations parked in a frame ring, waiting for the GPU
    pub pending_frees: u64,
    /// Allocations made since creation
    pub total_allocations: u64,
    /// Device frees issued since creation
    pub total_frees: u64,
}

impl MemoryStats {
    /// Total bytes held by live allocations
    pub fn total_bytes(&self) -> u64 {
        self.buffer_bytes + self.texture_bytes
    }
}

impl GpuMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful device allocation
    pub fn record_allocation(&self, kind: AllocationKind, bytes: u64) {
        match kind {
            AllocationKind::Buffer => {
                self.live_buffers.fetch_add(1, Ordering::Relaxed);
                self.buffer_bytes.fetch_add(bytes, Ordering::Relaxed);
            }
            AllocationKind::Texture => {
                self.live_textures.fetch_add(1, Ordering::Relaxed);
                self.texture_bytes.fetch_add(bytes, Ordering::Relaxed);
            }
        }
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an allocation parked in a frame ring
    pub fn record_retire(&self) {
        self.pending_frees.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a device free
    ///
    /// `was_pending` tells whether the allocation went through a frame ring
    /// (deferred) or was freed immediately (unsubmitted staging, shutdown of
    /// live resources).
    pub fn record_free(&self, kind: AllocationKind, bytes: u64, was_pending: bool) {
        match kind {
            AllocationKind::Buffer => {
                saturating_sub(&self.live_buffers, 1);
                saturating_sub(&self.buffer_bytes, bytes);
            }
            AllocationKind::Texture => {
                saturating_sub(&self.live_textures, 1);
                saturating_sub(&self.texture_bytes, bytes);
            }
        }
        if was_pending {
            saturating_sub(&self.pending_frees, 1);
        }
        self.total_frees.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot every counter
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            live_buffers: self.live_buffers.load(Ordering::Relaxed),
            live_textures: self.live_textures.load(Ordering::Relaxed),
            buffer_bytes: self.buffer_bytes.load(Ordering::Relaxed),
            texture_bytes: self.texture_bytes.load(Ordering::Relaxed),
            pending_frees: self.pending_frees.load(Ordering::Relaxed),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_frees: self.total_frees.load(Ordering::Relaxed),
        }
    }
}

fn saturating_sub(counter: &AtomicU64, value: u64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(value))
    });
}
