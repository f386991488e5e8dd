/*!
# Ringforge Engine

GPU resource lifetime and frame scheduling core for real-time renderers.

The CPU may have up to F frames submitted to the GPU before it waits on
the oldest one. This crate keeps resources alive for as long as any of those
frames can still reference them, keeps descriptor sets of every frame slot
pointing at current handles, and schedules render passes by dependency.

## Architecture

- **FrameRing**: F slots of retired resources, reclaimed F frames later
- **BufferManager / TextureManager**: create, update, resize and destroy
  GPU resources; every replaced handle goes through a frame ring
- **ResourceBinder**: named binds from shader reflection; generation
  tracking rebinds resized resources into all frame slots
- **RenderGraph**: Kahn-sorted render passes with per-pass failure isolation
- **GpuContext**: owns the managers and the binder, drives frame pacing

The GPU itself is reached through the `GraphicsDevice` trait, implemented
by backends outside this crate.
*/

// Internal modules
mod error;
mod config;
mod gpu_context;
pub mod log;
pub mod graphics_device;
pub mod resource;
pub mod binding;
pub mod render_graph;

// Main ringforge namespace module
pub mod ringforge {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{Config, MAX_FRAMES_IN_FLIGHT};

    // Context owning the managers and the binder
    pub use crate::gpu_context::GpuContext;

    // Device capability trait
    pub use crate::graphics_device::GraphicsDevice;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger, log, log_detailed};
    }

    // Device sub-module with handles, descriptors and reflection types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Binding sub-module
    pub mod binding {
        pub use crate::binding::*;
    }

    // Render graph sub-module
    pub mod render_graph {
        pub use crate::render_graph::*;
    }
}

// Re-export math library at crate root
pub use glam;
