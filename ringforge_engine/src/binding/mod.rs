//! Named, generation-tracked resource binding
//!
//! Render-pass code binds resources by shader name instead of raw
//! (set, binding) numbers. Tracked resources are rebound into every frame
//! slot's descriptor sets whenever their generation changes.

mod binding_location;
mod tracked_resource;
mod resource_binder;

pub use binding_location::BindingLocation;
pub use tracked_resource::TrackedResource;
pub use resource_binder::ResourceBinder;
