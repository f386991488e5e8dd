/// Render pass node in a render graph.
///
/// A pass is a rendering step (shadow pass, geometry pass, post-process
/// pass) driven by the graph once per frame. `C` is the context handed to
/// the GPU-facing hooks, typically `GpuContext`.

use crate::error::Result;

/// Per-frame information passed to every pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frame slot in `0..frames_in_flight`
    pub frame_index: usize,
    /// Monotonic frame counter
    pub frame_number: u64,
    /// Seconds since the previous frame
    pub delta_time: f32,
}

impl FrameInfo {
    pub fn new(frame_index: usize, frame_number: u64, delta_time: f32) -> Self {
        Self { frame_index, frame_number, delta_time }
    }
}

/// Lifecycle state of a pass inside a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Added, `setup` not run yet
    Uninitialized,
    /// `setup` succeeded; schedulable when enabled
    Active,
    /// `setup` failed; polled with `check_validity` until it recovers
    Invalid,
}

/// A render pass
///
/// Required hooks are `setup`, `update`, `execute`, `teardown` and
/// `check_validity`. `prepare` and `reset` default to no-ops.
///
/// Per frame, the graph calls `prepare` on every scheduled pass, then
/// `update` on every scheduled pass, then `execute` on every scheduled pass.
pub trait RenderPass<C>: Send {
    /// Unique name within the graph
    fn name(&self) -> &str;

    /// Names of the passes that must run before this one
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Create GPU objects (pipelines, targets, buffers)
    ///
    /// An error leaves the pass `Invalid` without affecting the rest of the graph.
    fn setup(&mut self, ctx: &mut C) -> Result<()>;

    /// CPU-only work (culling, sort keys); must not touch the GPU device
    fn prepare(&mut self, _frame: &FrameInfo) -> Result<()> {
        Ok(())
    }

    /// GPU state changes: uploads, descriptor rebinds
    fn update(&mut self, ctx: &mut C, frame: &FrameInfo) -> Result<()>;

    /// Record GPU commands only
    fn execute(&mut self, ctx: &mut C, frame: &FrameInfo) -> Result<()>;

    /// Release what `setup` created
    fn teardown(&mut self, ctx: &mut C);

    /// Whether a failed pass can now be set up again (e.g. shaders compiled)
    fn check_validity(&mut self, ctx: &C) -> bool;

    /// Drop per-frame history (temporal accumulation, etc.)
    fn reset(&mut self, _ctx: &mut C) {}
}
