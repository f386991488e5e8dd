/// Shader reflection data consumed by the resource binder

use crate::graphics_device::{BindingType, ShaderStageFlags};

/// One named binding extracted from a shader stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedBinding {
    /// Resource name as declared in the shader
    pub name: String,
    /// Descriptor set index
    pub set: u32,
    /// Binding index within the set
    pub binding: u32,
    /// Descriptor type
    pub binding_type: BindingType,
    /// Stage the binding was reflected from
    pub stages: ShaderStageFlags,
}

/// Ordered list of reflected bindings for one pipeline
///
/// The same name typically appears once per stage (vertex and fragment
/// reflection of one uniform block), in stage order.
#[derive(Debug, Clone, Default)]
pub struct PipelineReflection {
    bindings: Vec<ReflectedBinding>,
}

impl PipelineReflection {
    /// Create an empty reflection
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create from an ordered list of bindings
    pub fn from_bindings(bindings: Vec<ReflectedBinding>) -> Self {
        Self { bindings }
    }

    /// Append a binding (builder style)
    pub fn with_binding(
        mut self,
        name: &str,
        set: u32,
        binding: u32,
        binding_type: BindingType,
        stages: ShaderStageFlags,
    ) -> Self {
        self.bindings.push(ReflectedBinding {
            name: name.to_string(),
            set,
            binding,
            binding_type,
            stages,
        });
        self
    }

    /// All bindings, in reflection order
    pub fn bindings(&self) -> &[ReflectedBinding] {
        &self.bindings
    }

    /// Number of reflected entries
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}
