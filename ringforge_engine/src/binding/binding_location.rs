/// Descriptor location of a named binding

use std::fmt;
use crate::graphics_device::BindingType;

/// Where a named shader resource lives: descriptor set, binding index and type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingLocation {
    pub set: u32,
    pub binding: u32,
    pub binding_type: BindingType,
}

impl BindingLocation {
    pub fn new(set: u32, binding: u32, binding_type: BindingType) -> Self {
        Self { set, binding, binding_type }
    }
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set={}, binding={} ({:?})", self.set, self.binding, self.binding_type)
    }
}
