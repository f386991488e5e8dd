/// Graphics device module - the GPU collaborator consumed by the engine
///
/// The engine never talks to a graphics API directly. Backends implement
/// `GraphicsDevice` and hand out opaque handles; the frame rings, the
/// resource binder and the render passes only ever see those handles.

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod binding;
pub mod reflection;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use binding::*;
pub use reflection::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
