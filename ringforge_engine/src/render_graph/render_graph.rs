/// Render graph - a DAG of render passes scheduled by name-based dependencies.
///
/// The execution order is a topological sort (Kahn's algorithm) of the
/// passes that are both enabled and set up. Ties are broken by insertion
/// order, so the same graph always yields the same order. Dependencies on
/// passes that are disabled, invalid or missing are treated as satisfied.
///
/// The order is cached and recompiled lazily at the start of the next frame
/// whenever a pass is added, removed, toggled or recovers.
///
/// # Example
///
/// ```ignore
/// let mut graph: RenderGraph<GpuContext> = RenderGraph::new();
/// graph.add_pass(ShadowPass::new())?;
/// graph.add_pass(GeometryPass::new())?;   // depends on "shadow"
/// graph.setup(&mut ctx);
///
/// // every frame
/// graph.run_frame(&mut ctx, &FrameInfo::new(frame_index, frame_number, dt))?;
/// ```

use std::collections::BTreeSet;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use crate::error::{Error, Result};
use crate::render_graph::{RenderPass, FrameInfo, PassState};
use crate::{engine_debug, engine_error, engine_info, engine_warn, engine_fail};

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a pass within a RenderGraph.
    ///
    /// A key becomes invalid only when its own pass is removed.
    pub struct PassKey;
}

struct PassNode<C> {
    pass: Box<dyn RenderPass<C>>,
    name: String,
    dependencies: Vec<String>,
    /// Operator switch, independent of validity
    enabled: bool,
    state: PassState,
    /// Last setup failure, kept for diagnostics
    setup_error: Option<Error>,
}

impl<C> PassNode<C> {
    fn is_schedulable(&self) -> bool {
        self.enabled && self.state == PassState::Active
    }
}

pub struct RenderGraph<C> {
    passes: SlotMap<PassKey, PassNode<C>>,
    /// Keys in insertion order
    insertion_order: Vec<PassKey>,
    names: FxHashMap<String, PassKey>,
    execution_order: Vec<PassKey>,
    needs_compile: bool,
    validity_check_interval: u32,
    frames_since_validity_check: u32,
}

impl<C> Default for RenderGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RenderGraph<C> {
    /// Create an empty graph polling invalid passes every frame
    pub fn new() -> Self {
        Self {
            passes: SlotMap::with_key(),
            insertion_order: Vec::new(),
            names: FxHashMap::default(),
            execution_order: Vec::new(),
            needs_compile: true,
            validity_check_interval: 1,
            frames_since_validity_check: 0,
        }
    }

    /// Builder-style setter: poll invalid passes every `interval` frames
    pub fn with_validity_check_interval(mut self, interval: u32) -> Self {
        self.validity_check_interval = interval.max(1);
        self
    }

    // ===== PASS MANAGEMENT =====

    /// Add a pass (enabled, not set up yet)
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` if the name is empty or already used.
    pub fn add_pass<P>(&mut self, pass: P) -> Result<PassKey>
    where
        P: RenderPass<C> + 'static,
    {
        self.add_boxed_pass(Box::new(pass))
    }

    /// Add an already boxed pass
    pub fn add_boxed_pass(&mut self, pass: Box<dyn RenderPass<C>>) -> Result<PassKey> {
        let name = pass.name().to_string();
        if name.is_empty() {
            return Err(engine_fail!("ringforge::RenderGraph",
                Error::InvalidResource("render pass name must not be empty".to_string())));
        }
        if self.names.contains_key(&name) {
            return Err(engine_fail!("ringforge::RenderGraph",
                Error::InvalidResource(format!("render pass '{}' already exists", name))));
        }

        let mut dependencies: Vec<String> = Vec::new();
        for dependency in pass.dependencies() {
            if !dependencies.contains(dependency) {
                dependencies.push(dependency.clone());
            }
        }

        let key = self.passes.insert(PassNode {
            pass,
            name: name.clone(),
            dependencies,
            enabled: true,
            state: PassState::Uninitialized,
            setup_error: None,
        });
        self.insertion_order.push(key);
        self.names.insert(name, key);
        self.needs_compile = true;
        Ok(key)
    }

    /// Remove a pass, tearing it down if it was set up
    pub fn remove_pass(&mut self, name: &str, ctx: &mut C) -> Result<()> {
        let key = self.names.remove(name).ok_or_else(|| {
            engine_fail!("ringforge::RenderGraph", Error::ResourceNotFound(format!("render pass '{}'", name)))
        })?;
        self.insertion_order.retain(|k| *k != key);
        self.execution_order.retain(|k| *k != key);

        if let Some(mut node) = self.passes.remove(key) {
            if node.state == PassState::Active {
                node.pass.teardown(ctx);
            }
        }
        self.needs_compile = true;
        engine_debug!("ringforge::RenderGraph", "Removed pass '{}'", name);
        Ok(())
    }

    /// Enable or disable a pass (operator control, independent of validity)
    pub fn set_pass_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        let node = self.node_mut(name)?;
        if node.enabled != enabled {
            node.enabled = enabled;
            self.needs_compile = true;
        }
        Ok(())
    }

    pub fn is_pass_enabled(&self, name: &str) -> Option<bool> {
        self.node(name).map(|node| node.enabled)
    }

    pub fn pass_state(&self, name: &str) -> Option<PassState> {
        self.node(name).map(|node| node.state)
    }

    /// Error of the last failed setup of `name`
    pub fn setup_error(&self, name: &str) -> Option<&Error> {
        self.node(name)?.setup_error.as_ref()
    }

    pub fn pass_key(&self, name: &str) -> Option<PassKey> {
        self.names.get(name).copied()
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Names of the scheduled passes, in execution order, as of the last compile
    pub fn execution_order(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .filter_map(|key| self.passes.get(*key))
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Whether the execution order is stale
    pub fn needs_recompile(&self) -> bool {
        self.needs_compile
    }

    fn node(&self, name: &str) -> Option<&PassNode<C>> {
        self.names.get(name).and_then(|key| self.passes.get(*key))
    }

    fn node_mut(&mut self, name: &str) -> Result<&mut PassNode<C>> {
        self.names
            .get(name)
            .and_then(|key| self.passes.get_mut(*key))
            .ok_or_else(|| {
                engine_fail!("ringforge::RenderGraph", Error::ResourceNotFound(format!("render pass '{}'", name)))
            })
    }

    // ===== SETUP / COMPILE =====

    /// Run `setup` on every pass that has not been set up yet
    ///
    /// A failing pass is logged and marked `Invalid`; the others are not
    /// affected. Returns the number of passes that failed.
    pub fn setup(&mut self, ctx: &mut C) -> usize {
        let mut failed = 0;
        for key in &self.insertion_order {
            let Some(node) = self.passes.get_mut(*key) else {
                continue;
            };
            if node.state != PassState::Uninitialized {
                continue;
            }

            match node.pass.setup(ctx) {
                Ok(()) => {
                    node.state = PassState::Active;
                    node.setup_error = None;
                    engine_debug!("ringforge::RenderGraph", "Pass '{}' set up", node.name);
                }
                Err(e) => {
                    engine_error!("ringforge::RenderGraph", "Pass '{}' failed setup: {}", node.name, e);
                    node.state = PassState::Invalid;
                    node.setup_error = Some(Error::PassSetupFailed {
                        pass: node.name.clone(),
                        reason: e.to_string(),
                    });
                    failed += 1;
                }
            }
        }
        self.needs_compile = true;
        failed
    }

    /// Recompute the execution order
    ///
    /// # Errors
    ///
    /// Returns `CyclicDependency` with the names of the passes caught in a
    /// cycle. The previous execution order is kept and the graph stays
    /// flagged for recompilation.
    pub fn compile(&mut self) -> Result<()> {
        let scheduled: Vec<PassKey> = self.insertion_order
            .iter()
            .copied()
            .filter(|key| self.passes.get(*key).map_or(false, PassNode::is_schedulable))
            .collect();
        let index_of: FxHashMap<PassKey, usize> = scheduled
            .iter()
            .enumerate()
            .map(|(index, key)| (*key, index))
            .collect();

        let mut in_degree = vec![0usize; scheduled.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); scheduled.len()];
        let mut missing: FxHashSet<&str> = FxHashSet::default();

        for (index, key) in scheduled.iter().enumerate() {
            let node = &self.passes[*key];
            for dependency in &node.dependencies {
                match self.names.get(dependency) {
                    Some(dep_key) => {
                        // Disabled or invalid dependencies count as satisfied
                        if let Some(&dep_index) = index_of.get(dep_key) {
                            in_degree[index] += 1;
                            dependents[dep_index].push(index);
                        }
                    }
                    None => {
                        if missing.insert(dependency.as_str()) {
                            engine_warn!("ringforge::RenderGraph",
                                "Pass '{}' depends on unknown pass '{}', ignoring", node.name, dependency);
                        }
                    }
                }
            }
        }

        // Kahn's algorithm; the lowest insertion index goes first
        let mut ready: BTreeSet<usize> = (0..scheduled.len())
            .filter(|index| in_degree[*index] == 0)
            .collect();
        let mut order = Vec::with_capacity(scheduled.len());

        while let Some(index) = ready.pop_first() {
            order.push(scheduled[index]);
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < scheduled.len() {
            let cycle: Vec<String> = (0..scheduled.len())
                .filter(|index| in_degree[*index] > 0)
                .map(|index| self.passes[scheduled[index]].name.clone())
                .collect();
            return Err(engine_fail!("ringforge::RenderGraph", Error::CyclicDependency(cycle)));
        }

        self.execution_order = order;
        self.needs_compile = false;
        engine_debug!("ringforge::RenderGraph", "Compiled execution order: [{}]",
            self.execution_order().join(", "));
        Ok(())
    }

    fn compile_if_needed(&mut self) -> Result<()> {
        if self.needs_compile {
            self.compile()?;
        }
        Ok(())
    }

    // ===== PER-FRAME PROTOCOL =====

    /// CPU-only stage for every scheduled pass
    ///
    /// Recompiles first if the graph changed since the last frame.
    pub fn prepare(&mut self, frame: &FrameInfo) -> Result<()> {
        self.compile_if_needed()?;
        for key in &self.execution_order {
            if let Some(node) = self.passes.get_mut(*key) {
                node.pass.prepare(frame)?;
            }
        }
        Ok(())
    }

    /// GPU-state stage for every scheduled pass
    ///
    /// Runs the order `prepare` used this frame; graph changes made since
    /// then wait for the next `prepare`. An error is logged and returned;
    /// the failing pass stays scheduled.
    pub fn update(&mut self, ctx: &mut C, frame: &FrameInfo) -> Result<()> {
        for key in &self.execution_order {
            if let Some(node) = self.passes.get_mut(*key) {
                if let Err(e) = node.pass.update(ctx, frame) {
                    engine_error!("ringforge::RenderGraph", "Pass '{}' update failed: {}", node.name, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Command recording stage for every scheduled pass, then validity polling
    ///
    /// Invalid passes are polled every `validity_check_interval` frames. A
    /// pass whose `check_validity` succeeds is set up again; on success it
    /// becomes `Active` and joins the schedule at the next frame.
    pub fn execute(&mut self, ctx: &mut C, frame: &FrameInfo) -> Result<()> {
        for key in &self.execution_order {
            if let Some(node) = self.passes.get_mut(*key) {
                if let Err(e) = node.pass.execute(ctx, frame) {
                    engine_error!("ringforge::RenderGraph", "Pass '{}' execute failed: {}", node.name, e);
                    return Err(e);
                }
            }
        }

        self.frames_since_validity_check += 1;
        if self.frames_since_validity_check >= self.validity_check_interval {
            self.frames_since_validity_check = 0;
            self.poll_invalid_passes(ctx);
        }
        Ok(())
    }

    /// Set up pending passes, then prepare, update and execute
    pub fn run_frame(&mut self, ctx: &mut C, frame: &FrameInfo) -> Result<()> {
        let pending = self.passes.values().any(|node| node.state == PassState::Uninitialized);
        if pending {
            self.setup(ctx);
        }
        self.prepare(frame)?;
        self.update(ctx, frame)?;
        self.execute(ctx, frame)
    }

    fn poll_invalid_passes(&mut self, ctx: &mut C) {
        for key in &self.insertion_order {
            let Some(node) = self.passes.get_mut(*key) else {
                continue;
            };
            if node.state != PassState::Invalid || !node.pass.check_validity(ctx) {
                continue;
            }

            match node.pass.setup(ctx) {
                Ok(()) => {
                    node.state = PassState::Active;
                    node.setup_error = None;
                    self.needs_compile = true;
                    engine_info!("ringforge::RenderGraph", "Pass '{}' recovered", node.name);
                }
                Err(e) => {
                    engine_warn!("ringforge::RenderGraph",
                        "Pass '{}' reported valid but setup failed again: {}", node.name, e);
                    node.setup_error = Some(Error::PassSetupFailed {
                        pass: node.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    // ===== LIFECYCLE =====

    /// Call `reset` on every pass that is set up
    pub fn reset_passes(&mut self, ctx: &mut C) {
        for key in &self.insertion_order {
            if let Some(node) = self.passes.get_mut(*key) {
                if node.state == PassState::Active {
                    node.pass.reset(ctx);
                }
            }
        }
    }

    /// Tear down every pass that is set up, in reverse insertion order
    ///
    /// Passes stay in the graph as `Uninitialized` and can be set up again.
    pub fn teardown(&mut self, ctx: &mut C) {
        for key in self.insertion_order.iter().rev() {
            if let Some(node) = self.passes.get_mut(*key) {
                if node.state == PassState::Active {
                    node.pass.teardown(ctx);
                }
                node.state = PassState::Uninitialized;
                node.setup_error = None;
            }
        }
        self.execution_order.clear();
        self.needs_compile = true;
    }
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
