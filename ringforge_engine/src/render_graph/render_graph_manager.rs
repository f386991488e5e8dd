/// Central render graph registry.
///
/// Manages named render graphs sharing one context type. Multiple graphs
/// can exist side by side (e.g. the main frame and an offscreen bake).

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::engine_bail;
use super::render_graph::RenderGraph;

pub struct RenderGraphManager<C> {
    render_graphs: FxHashMap<String, RenderGraph<C>>,
    /// Applied to every graph created from now on
    validity_check_interval: u32,
}

impl<C> Default for RenderGraphManager<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> RenderGraphManager<C> {
    /// Create a new empty render graph manager
    pub fn new() -> Self {
        Self {
            render_graphs: FxHashMap::default(),
            validity_check_interval: 1,
        }
    }

    /// Builder-style setter for the validity poll interval of new graphs
    pub fn with_validity_check_interval(mut self, interval: u32) -> Self {
        self.validity_check_interval = interval.max(1);
        self
    }

    /// Create a new named render graph
    ///
    /// # Errors
    ///
    /// Returns an error if a render graph with the same name already exists.
    pub fn create_render_graph(&mut self, name: &str) -> Result<&mut RenderGraph<C>> {
        if self.render_graphs.contains_key(name) {
            engine_bail!("ringforge::RenderGraphManager",
                "RenderGraph '{}' already exists", name);
        }

        let graph = RenderGraph::new().with_validity_check_interval(self.validity_check_interval);
        Ok(self.render_graphs.entry(name.to_string()).or_insert(graph))
    }

    /// Get a render graph by name
    pub fn render_graph(&self, name: &str) -> Option<&RenderGraph<C>> {
        self.render_graphs.get(name)
    }

    /// Get a mutable render graph by name
    pub fn render_graph_mut(&mut self, name: &str) -> Option<&mut RenderGraph<C>> {
        self.render_graphs.get_mut(name)
    }

    /// Remove a render graph by name
    ///
    /// The graph is returned as is; tear it down first if its passes were set up.
    pub fn remove_render_graph(&mut self, name: &str) -> Option<RenderGraph<C>> {
        self.render_graphs.remove(name)
    }

    /// Get the number of render graphs
    pub fn render_graph_count(&self) -> usize {
        self.render_graphs.len()
    }

    /// Get all render graph names
    pub fn render_graph_names(&self) -> Vec<&str> {
        self.render_graphs.keys().map(|k| k.as_str()).collect()
    }

    /// Tear down the passes of every graph
    pub fn teardown_all(&mut self, ctx: &mut C) {
        for graph in self.render_graphs.values_mut() {
            graph.teardown(ctx);
        }
    }

    /// Remove all render graphs
    pub fn clear(&mut self) {
        self.render_graphs.clear();
    }
}

#[cfg(test)]
#[path = "render_graph_manager_tests.rs"]
mod tests;
