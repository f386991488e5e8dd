/// ResourceBinder - named binds and generation-driven rebinding
///
/// Each pipeline owns a table of named bindings (filled from shader
/// reflection) and a table of tracked resources. `update_frame` compares the
/// generation of every tracked resource with the last one it bound, and on
/// any change rewrites the descriptor in all F frame slots: after a resize,
/// every frame slot may still reference the old handle.
///
/// # Example
///
/// ```ignore
/// let mut binder = ResourceBinder::new(device.clone(), 2);
/// binder.populate_from_reflection(pipeline, &reflection)?;
/// binder.register_buffer_by_name(pipeline, "CameraUBO", &camera)?;
///
/// // every frame, during update
/// binder.update_frame(pipeline, frame_index)?;
/// ```

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, PipelineHandle, PipelineReflection, ShaderStageFlags, DescriptorCategory,
    DescriptorResource, lock_device,
};
use crate::binding::{BindingLocation, TrackedResource};
use crate::resource::{ManagedBuffer, ManagedTexture, ManagedAccelerationStructure};
use crate::{engine_debug, engine_trace, engine_warn, engine_fail};

/// A registered name and the stages it was reflected from
#[derive(Debug, Clone, Copy)]
struct NamedBinding {
    location: BindingLocation,
    stages: ShaderStageFlags,
}

#[derive(Debug)]
struct TrackedEntry {
    name: String,
    resource: TrackedResource,
    last_observed_generation: u64,
    dangling_reported: bool,
}

#[derive(Debug, Default)]
struct PipelineBindings {
    bindings: FxHashMap<String, NamedBinding>,
    /// In registration order
    tracked: Vec<TrackedEntry>,
}

pub struct ResourceBinder {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    frames_in_flight: usize,
    pipelines: FxHashMap<PipelineHandle, PipelineBindings>,
}

impl ResourceBinder {
    pub fn new(device: Arc<Mutex<dyn GraphicsDevice>>, frames_in_flight: usize) -> Self {
        Self {
            device,
            frames_in_flight: frames_in_flight.max(1),
            pipelines: FxHashMap::default(),
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    // ===== NAMED BINDINGS =====

    /// Register `name` at `location` for `pipeline`
    ///
    /// The same uniform block shows up once per shader stage, so registering
    /// an identical location again succeeds and merges `stages`. Repeating a
    /// stage that was already recorded also succeeds but is logged, since it
    /// usually means the name was registered twice by mistake.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateBindingName` if `name` is already registered at a
    /// different location.
    pub fn register_binding(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        location: BindingLocation,
        stages: ShaderStageFlags,
    ) -> Result<()> {
        let table = self.pipelines.entry(pipeline).or_default();

        match table.bindings.get_mut(name) {
            Some(existing) if existing.location == location => {
                if existing.stages.intersects(stages) {
                    engine_warn!("ringforge::ResourceBinder",
                        "Binding '{}' re-registered for {} from already recorded stage(s) {:?}",
                        name, pipeline, existing.stages & stages);
                }
                existing.stages |= stages;
                Ok(())
            }
            Some(existing) => Err(engine_fail!("ringforge::ResourceBinder", Error::DuplicateBindingName {
                name: name.to_string(),
                existing: existing.location,
                requested: location,
            })),
            None => {
                table.bindings.insert(name.to_string(), NamedBinding { location, stages });
                engine_trace!("ringforge::ResourceBinder", "Registered '{}' at {} for {}",
                    name, location, pipeline);
                Ok(())
            }
        }
    }

    /// Register every binding of a pipeline's shader reflection
    ///
    /// Returns the number of distinct names known for the pipeline afterwards.
    /// Stops at the first conflicting entry.
    pub fn populate_from_reflection(
        &mut self,
        pipeline: PipelineHandle,
        reflection: &PipelineReflection,
    ) -> Result<usize> {
        for reflected in reflection.bindings() {
            self.register_binding(
                pipeline,
                &reflected.name,
                BindingLocation::new(reflected.set, reflected.binding, reflected.binding_type),
                reflected.stages,
            )?;
        }

        let count = self.binding_count(pipeline);
        engine_debug!("ringforge::ResourceBinder", "{}: {} named binding(s) from {} reflected entries",
            pipeline, count, reflection.binding_count());
        Ok(count)
    }

    /// Location registered for `name`
    pub fn location(&self, pipeline: PipelineHandle, name: &str) -> Option<BindingLocation> {
        self.pipelines.get(&pipeline)?.bindings.get(name).map(|b| b.location)
    }

    /// Stages `name` was registered from
    pub fn stages(&self, pipeline: PipelineHandle, name: &str) -> Option<ShaderStageFlags> {
        self.pipelines.get(&pipeline)?.bindings.get(name).map(|b| b.stages)
    }

    pub fn binding_count(&self, pipeline: PipelineHandle) -> usize {
        self.pipelines.get(&pipeline).map_or(0, |p| p.bindings.len())
    }

    /// Look up `name` and check it accepts `category`
    fn resolve(
        &self,
        pipeline: PipelineHandle,
        name: &str,
        category: DescriptorCategory,
    ) -> Result<BindingLocation> {
        let location = self.location(pipeline, name).ok_or_else(|| {
            engine_fail!("ringforge::ResourceBinder", Error::UnknownBinding {
                pipeline: pipeline.to_string(),
                name: name.to_string(),
            })
        })?;

        if location.binding_type.category() != category {
            return Err(engine_fail!("ringforge::ResourceBinder", Error::BindingTypeMismatch {
                name: name.to_string(),
                expected: location.binding_type,
                actual: category,
            }));
        }
        Ok(location)
    }

    // ===== IMMEDIATE BINDS =====

    /// Bind `buffer` to `name` in every frame slot
    pub fn bind_buffer_named(&mut self, pipeline: PipelineHandle, name: &str, buffer: &ManagedBuffer) -> Result<()> {
        let location = self.resolve(pipeline, name, DescriptorCategory::Buffer)?;
        let resource = buffer.descriptor().ok_or_else(|| destroyed(buffer.name()))?;
        self.write_all_slots(pipeline, location, &resource)
    }

    /// Bind `buffer` to `name` in one frame slot only (per-frame resources)
    ///
    /// # Errors
    ///
    /// `InvalidResource` if `frame_index` is not below frames in flight, plus
    /// the errors of `bind_buffer_named`.
    pub fn bind_buffer_named_for_frame(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        buffer: &ManagedBuffer,
        frame_index: usize,
    ) -> Result<()> {
        self.check_frame_index(frame_index)?;
        let location = self.resolve(pipeline, name, DescriptorCategory::Buffer)?;
        let resource = buffer.descriptor().ok_or_else(|| destroyed(buffer.name()))?;

        let mut device = lock_device(&self.device)?;
        device
            .update_descriptor_set(pipeline, frame_index, location.set, location.binding, &resource)
            .map_err(|e| engine_fail!("ringforge::ResourceBinder", e))
    }

    /// Bind `texture` to `name` in every frame slot
    pub fn bind_texture_named(&mut self, pipeline: PipelineHandle, name: &str, texture: &ManagedTexture) -> Result<()> {
        let location = self.resolve(pipeline, name, DescriptorCategory::Image)?;
        let resource = texture.descriptor().ok_or_else(|| destroyed(texture.name()))?;
        self.write_all_slots(pipeline, location, &resource)
    }

    /// Bind a descriptor array of textures; an empty slice is skipped
    pub fn bind_texture_array_named(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        textures: &[Arc<ManagedTexture>],
    ) -> Result<()> {
        let location = self.resolve(pipeline, name, DescriptorCategory::Image)?;
        if textures.is_empty() {
            engine_trace!("ringforge::ResourceBinder", "Skipping empty texture array '{}'", name);
            return Ok(());
        }
        let handles = textures
            .iter()
            .map(|t| t.handle().ok_or_else(|| destroyed(t.name())))
            .collect::<Result<Vec<_>>>()?;
        self.write_all_slots(pipeline, location, &DescriptorResource::TextureArray(handles))
    }

    /// Bind a descriptor array of buffers; an empty slice is skipped
    pub fn bind_buffer_array_named(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        buffers: &[Arc<ManagedBuffer>],
    ) -> Result<()> {
        let location = self.resolve(pipeline, name, DescriptorCategory::Buffer)?;
        if buffers.is_empty() {
            engine_trace!("ringforge::ResourceBinder", "Skipping empty buffer array '{}'", name);
            return Ok(());
        }
        let handles = buffers
            .iter()
            .map(|b| b.handle().ok_or_else(|| destroyed(b.name())))
            .collect::<Result<Vec<_>>>()?;
        self.write_all_slots(pipeline, location, &DescriptorResource::BufferArray(handles))
    }

    /// Bind the current build of an acceleration structure in every frame slot
    pub fn bind_acceleration_structure_named(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        tlas: &ManagedAccelerationStructure,
    ) -> Result<()> {
        let location = self.resolve(pipeline, name, DescriptorCategory::AccelerationStructure)?;
        let resource = tlas.descriptor().ok_or_else(|| {
            engine_fail!("ringforge::ResourceBinder",
                Error::ResourceNotFound(format!("acceleration structure '{}' has not been built", tlas.name())))
        })?;
        self.write_all_slots(pipeline, location, &resource)
    }

    fn write_all_slots(
        &self,
        pipeline: PipelineHandle,
        location: BindingLocation,
        resource: &DescriptorResource,
    ) -> Result<()> {
        let mut device = lock_device(&self.device)?;
        for frame_index in 0..self.frames_in_flight {
            device
                .update_descriptor_set(pipeline, frame_index, location.set, location.binding, resource)
                .map_err(|e| engine_fail!("ringforge::ResourceBinder", e))?;
        }
        Ok(())
    }

    fn check_frame_index(&self, frame_index: usize) -> Result<()> {
        if frame_index >= self.frames_in_flight {
            return Err(engine_fail!("ringforge::ResourceBinder", Error::InvalidResource(format!(
                "frame index {} out of range (frames in flight: {})",
                frame_index, self.frames_in_flight
            ))));
        }
        Ok(())
    }

    // ===== TRACKED RESOURCES =====

    /// Track `resource` under `name` for `pipeline` without binding it yet
    ///
    /// The first bind happens in the next `update_frame`. Registering a name
    /// that is already tracked replaces the resource and forces a rebind.
    ///
    /// # Errors
    ///
    /// `UnknownBinding` or `BindingTypeMismatch` if `name` is not a binding of
    /// a matching category for `pipeline`.
    pub fn register_tracked(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        resource: TrackedResource,
    ) -> Result<()> {
        self.resolve(pipeline, name, resource.category())?;

        let table = self.pipelines.entry(pipeline).or_default();
        match table.tracked.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.resource = resource;
                entry.last_observed_generation = 0;
                entry.dangling_reported = false;
            }
            None => table.tracked.push(TrackedEntry {
                name: name.to_string(),
                resource,
                last_observed_generation: 0,
                dangling_reported: false,
            }),
        }
        Ok(())
    }

    pub fn register_buffer_by_name(&mut self, pipeline: PipelineHandle, name: &str, buffer: &Arc<ManagedBuffer>) -> Result<()> {
        self.register_tracked(pipeline, name, TrackedResource::buffer(buffer))
    }

    pub fn register_texture_by_name(&mut self, pipeline: PipelineHandle, name: &str, texture: &Arc<ManagedTexture>) -> Result<()> {
        self.register_tracked(pipeline, name, TrackedResource::texture(texture))
    }

    pub fn register_texture_array_by_name(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        textures: &[Arc<ManagedTexture>],
    ) -> Result<()> {
        self.register_tracked(pipeline, name, TrackedResource::texture_array(textures))
    }

    pub fn register_buffer_array_by_name(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        buffers: &[Arc<ManagedBuffer>],
    ) -> Result<()> {
        self.register_tracked(pipeline, name, TrackedResource::buffer_array(buffers))
    }

    pub fn register_acceleration_structure_by_name(
        &mut self,
        pipeline: PipelineHandle,
        name: &str,
        tlas: &Arc<ManagedAccelerationStructure>,
    ) -> Result<()> {
        self.register_tracked(pipeline, name, TrackedResource::acceleration_structure(tlas))
    }

    /// Rebind every tracked resource of `pipeline` whose generation changed
    ///
    /// Resources at generation 0 (not created yet, destroyed, dropped, empty
    /// arrays) are skipped. A changed resource is rewritten in all F frame
    /// slots, then its generation is recorded. Returns the number of
    /// resources rebound.
    ///
    /// # Errors
    ///
    /// - `ResourceNotFound` if nothing was ever registered for `pipeline`
    /// - `InvalidResource` if `frame_index` is not below frames in flight
    /// - device errors from the descriptor writes (the failing resource keeps
    ///   its previous observed generation and is retried next frame)
    pub fn update_frame(&mut self, pipeline: PipelineHandle, frame_index: usize) -> Result<usize> {
        self.check_frame_index(frame_index)?;
        let Some(table) = self.pipelines.get_mut(&pipeline) else {
            return Err(engine_fail!("ringforge::ResourceBinder",
                Error::ResourceNotFound(format!("no bindings registered for {}", pipeline))));
        };
        let PipelineBindings { bindings, tracked } = table;

        let mut device = lock_device(&self.device)?;
        let mut rebound = 0;

        for entry in tracked.iter_mut() {
            let generation = entry.resource.current_generation();
            if generation == 0 {
                if entry.resource.is_dangling() && !entry.dangling_reported {
                    engine_warn!("ringforge::ResourceBinder",
                        "Tracked resource '{}' of {} was destroyed, skipping", entry.name, pipeline);
                    entry.dangling_reported = true;
                }
                continue;
            }
            if generation == entry.last_observed_generation {
                continue;
            }

            let Some(resource) = entry.resource.descriptor() else {
                if !entry.dangling_reported {
                    engine_warn!("ringforge::ResourceBinder",
                        "Tracked resource '{}' of {} has a destroyed element, skipping", entry.name, pipeline);
                    entry.dangling_reported = true;
                }
                continue;
            };
            let Some(binding) = bindings.get(&entry.name) else {
                continue;
            };
            let location = binding.location;

            for frame in 0..self.frames_in_flight {
                device
                    .update_descriptor_set(pipeline, frame, location.set, location.binding, &resource)
                    .map_err(|e| engine_fail!("ringforge::ResourceBinder", e))?;
            }

            engine_trace!("ringforge::ResourceBinder", "Rebound '{}' for {} (generation {} -> {})",
                entry.name, pipeline, entry.last_observed_generation, generation);
            entry.last_observed_generation = generation;
            entry.dangling_reported = false;
            rebound += 1;
        }

        Ok(rebound)
    }

    /// Stop tracking `name` for `pipeline`
    pub fn unregister_tracked(&mut self, pipeline: PipelineHandle, name: &str) -> bool {
        let Some(table) = self.pipelines.get_mut(&pipeline) else {
            return false;
        };
        let before = table.tracked.len();
        table.tracked.retain(|entry| entry.name != name);
        table.tracked.len() != before
    }

    /// Forget every binding and tracked resource of `pipeline`
    pub fn remove_pipeline(&mut self, pipeline: PipelineHandle) -> bool {
        self.pipelines.remove(&pipeline).is_some()
    }

    /// Number of resources tracked for `pipeline`
    pub fn tracked_count(&self, pipeline: PipelineHandle) -> usize {
        self.pipelines.get(&pipeline).map_or(0, |p| p.tracked.len())
    }

    /// Generation last bound for a tracked `name` (0 = never bound)
    pub fn last_observed_generation(&self, pipeline: PipelineHandle, name: &str) -> Option<u64> {
        self.pipelines
            .get(&pipeline)?
            .tracked
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.last_observed_generation)
    }
}

fn destroyed(name: &str) -> Error {
    engine_fail!("ringforge::ResourceBinder", Error::ResourceNotFound(format!("'{}' was destroyed", name)))
}

#[cfg(test)]
#[path = "resource_binder_tests.rs"]
mod tests;
