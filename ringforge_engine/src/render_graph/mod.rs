//! Render graph module
//!
//! Orders render passes by their declared dependencies, drives them through
//! the per-frame prepare / update / execute protocol and isolates passes
//! whose setup failed until they become valid again.

mod render_pass;
mod render_graph;
mod render_graph_manager;

pub use render_pass::{RenderPass, FrameInfo, PassState};
pub use render_graph::{RenderGraph, PassKey};
pub use render_graph_manager::RenderGraphManager;
