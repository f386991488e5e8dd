/// GpuContext - the explicitly owned registry of GPU resource state
///
/// Owns the buffer and texture managers, the resource binder and the memory
/// tracker, all built with the same frames-in-flight. There is no global
/// registry: render passes receive the context as `&mut GpuContext`.
///
/// # Example
///
/// ```ignore
/// let mut ctx = GpuContext::new(Config::default(), device)?;
/// let mut graph: RenderGraph<GpuContext> = RenderGraph::new();
/// graph.add_pass(GeometryPass::new())?;
///
/// for frame_number in 0.. {
///     let frame_index = (frame_number % ctx.frames_in_flight() as u64) as usize;
///     let frame = ctx.begin_frame(frame_index, 0.016)?;
///     graph.run_frame(&mut ctx, &frame)?;
/// }
///
/// graph.teardown(&mut ctx);
/// ctx.shutdown();
/// ```

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::config::Config;
use crate::graphics_device::{GraphicsDevice, lock_device};
use crate::resource::{BufferManager, TextureManager, GpuMemoryTracker, MemoryStats};
use crate::binding::ResourceBinder;
use crate::render_graph::FrameInfo;
use crate::{engine_info, engine_trace, engine_fail};

pub struct GpuContext {
    config: Config,
    device: Arc<Mutex<dyn GraphicsDevice>>,
    tracker: Arc<GpuMemoryTracker>,
    buffers: BufferManager,
    textures: TextureManager,
    binder: ResourceBinder,
    /// Frames begun so far
    frame_number: u64,
    current_frame_index: usize,
}

impl GpuContext {
    /// Build every component from `config`
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the configuration is invalid.
    pub fn new(config: Config, device: Arc<Mutex<dyn GraphicsDevice>>) -> Result<Self> {
        config.validate().map_err(|e| engine_fail!("ringforge::GpuContext", e))?;

        let frames = config.frames_in_flight;
        let tracker = Arc::new(GpuMemoryTracker::new());

        engine_info!("ringforge::GpuContext", "GpuContext created for '{}' ({} frames in flight)",
            config.app_name, frames);

        Ok(Self {
            buffers: BufferManager::new(device.clone(), frames, tracker.clone()),
            textures: TextureManager::new(device.clone(), frames, tracker.clone()),
            binder: ResourceBinder::new(device.clone(), frames),
            config,
            device,
            tracker,
            frame_number: 0,
            current_frame_index: 0,
        })
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frames_in_flight(&self) -> usize {
        self.config.frames_in_flight
    }

    pub fn device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.device
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut BufferManager {
        &mut self.buffers
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut TextureManager {
        &mut self.textures
    }

    pub fn binder(&self) -> &ResourceBinder {
        &self.binder
    }

    pub fn binder_mut(&mut self) -> &mut ResourceBinder {
        &mut self.binder
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.tracker.stats()
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    // ===== FRAME PACING =====

    /// Start frame slot `frame_index`
    ///
    /// Tags the device, then frees every buffer and texture retired when this
    /// slot was last used, F frames ago. Returns the `FrameInfo` to hand to
    /// the render graph.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` if `frame_index` is not below frames in flight.
    pub fn begin_frame(&mut self, frame_index: usize, delta_time: f32) -> Result<FrameInfo> {
        if frame_index >= self.config.frames_in_flight {
            return Err(engine_fail!("ringforge::GpuContext", Error::InvalidResource(format!(
                "frame index {} out of range (frames in flight: {})",
                frame_index, self.config.frames_in_flight
            ))));
        }

        lock_device(&self.device)?.begin_frame(frame_index);

        let freed = self.buffers.begin_frame(frame_index) + self.textures.begin_frame(frame_index);
        if freed > 0 {
            engine_trace!("ringforge::GpuContext", "Frame {} (slot {}): {} allocation(s) freed",
                self.frame_number, frame_index, freed);
        }

        let frame = FrameInfo::new(frame_index, self.frame_number, delta_time);
        self.current_frame_index = frame_index;
        self.frame_number += 1;
        Ok(frame)
    }

    /// Free every resource immediately (call once the device is idle)
    pub fn shutdown(&mut self) {
        self.buffers.shutdown();
        self.textures.shutdown();
        engine_info!("ringforge::GpuContext", "GpuContext for '{}' shut down", self.config.app_name);
    }
}

#[cfg(test)]
#[path = "gpu_context_tests.rs"]
mod tests;
