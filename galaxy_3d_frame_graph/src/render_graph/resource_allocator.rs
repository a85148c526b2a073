/// Render graph resource allocator.
///
/// Transient resources are placed in device heaps. Two resources may share
/// a heap when their pass ranges [first_pass, last_pass] do not overlap; the
/// later one then aliases the memory of the earlier one. Retired resources
/// stay pooled in their heap and are reused by later frames requesting an
/// identical description. Output resources never alias: they are committed
/// resources recycled through a separate free list.
///
/// Descriptor views are memoized per (allocation, view description).

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use crate::config::{RenderGraphConfig, RenderGraphContext};
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Descriptor, GpuResource, GraphicsDevice, Heap, HeapDesc,
    ResourceAccessFlags, ShaderResourceViewDesc, Texture, TextureDesc, TextureUsage,
    UnorderedAccessViewDesc,
};
use crate::log::Logger;
use crate::{engine_debug, engine_err, engine_info, engine_trace};

const SOURCE: &str = "galaxy3d::ResourceAllocator";

new_key_type! {
    /// Key of a GPU resource owned by the allocator
    pub struct AllocationKey;
}

/// Pass range over which a resource is referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeRange {
    pub first_pass: u32,
    pub last_pass: u32,
}

impl LifetimeRange {
    pub const UNUSED: LifetimeRange = LifetimeRange {
        first_pass: u32::MAX,
        last_pass: 0,
    };

    pub fn new(first_pass: u32, last_pass: u32) -> Self {
        Self { first_pass, last_pass }
    }

    pub fn is_used(&self) -> bool {
        self.first_pass != u32::MAX
    }

    pub fn reset(&mut self) {
        *self = Self::UNUSED;
    }

    /// An unused range overlaps nothing
    pub fn is_overlapping(&self, other: &LifetimeRange) -> bool {
        self.is_used()
            && self.first_pass <= other.last_pass
            && self.last_pass >= other.first_pass
    }
}

impl Default for LifetimeRange {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// Creation description of an allocated resource (heap placement excluded)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceDesc {
    Texture(TextureDesc),
    Buffer(BufferDesc),
}

/// Result of an allocation
pub struct Allocated<R> {
    pub key: AllocationKey,
    pub resource: R,
    /// State the resource is in before its first use this frame
    pub initial_state: ResourceAccessFlags,
}

struct Allocation {
    resource: GpuResource,
    desc: ResourceDesc,
}

struct AliasedResource {
    key: AllocationKey,
    lifetime: LifetimeRange,
    last_used_frame: u64,
    last_used_state: ResourceAccessFlags,
}

struct AllocatorHeap {
    heap: Arc<dyn Heap>,
    resources: Vec<AliasedResource>,
}

impl AllocatorHeap {
    fn is_overlapping(&self, lifetime: &LifetimeRange) -> bool {
        self.resources.iter().any(|r| r.lifetime.is_overlapping(lifetime))
    }

    fn contains(&self, key: AllocationKey) -> bool {
        self.resources.iter().any(|r| r.key == key)
    }
}

struct NonOverlappingResource {
    key: AllocationKey,
    last_used_state: ResourceAccessFlags,
    last_used_frame: u64,
}

/// Heap-aliasing allocator for graph-managed resources
pub struct ResourceAllocator {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    logger: Arc<dyn Logger>,
    config: RenderGraphConfig,
    allocations: SlotMap<AllocationKey, Allocation>,
    heaps: Vec<AllocatorHeap>,
    free_non_overlapping: Vec<NonOverlappingResource>,
    shader_resource_views: FxHashMap<(AllocationKey, ShaderResourceViewDesc), Arc<dyn Descriptor>>,
    unordered_access_views: FxHashMap<(AllocationKey, UnorderedAccessViewDesc), Arc<dyn Descriptor>>,
}

impl ResourceAllocator {
    pub fn new(context: &RenderGraphContext) -> Self {
        Self {
            device: context.device.clone(),
            logger: context.logger.clone(),
            config: context.config.clone(),
            allocations: SlotMap::with_key(),
            heaps: Vec::new(),
            free_non_overlapping: Vec::new(),
            shader_resource_views: FxHashMap::default(),
            unordered_access_views: FxHashMap::default(),
        }
    }

    // ===== ALLOCATION =====

    /// Place a transient texture used over [first_pass, last_pass]
    ///
    /// `last_state` is the state the texture will be left in at the end of
    /// the frame; it becomes the initial state of whoever reuses the slot.
    pub fn allocate_texture(
        &mut self,
        first_pass: u32,
        last_pass: u32,
        last_state: ResourceAccessFlags,
        desc: &TextureDesc,
        name: &str,
    ) -> Result<Allocated<Arc<dyn Texture>>> {
        let size = self.lock_device()?.texture_allocation_size(desc);
        let desc = ResourceDesc::Texture(desc.clone());
        let allocated = self.allocate(LifetimeRange::new(first_pass, last_pass), last_state, size, desc, name)?;
        match allocated.resource {
            GpuResource::Texture(texture) => Ok(Allocated {
                key: allocated.key,
                resource: texture,
                initial_state: allocated.initial_state,
            }),
            GpuResource::Buffer(_) => Err(engine_err!(self.logger, SOURCE,
                "Allocation for texture '{}' is not a texture", name)),
        }
    }

    /// Place a transient buffer used over [first_pass, last_pass]
    pub fn allocate_buffer(
        &mut self,
        first_pass: u32,
        last_pass: u32,
        last_state: ResourceAccessFlags,
        desc: &BufferDesc,
        name: &str,
    ) -> Result<Allocated<Arc<dyn Buffer>>> {
        let size = desc.size;
        let desc = ResourceDesc::Buffer(desc.clone());
        let allocated = self.allocate(LifetimeRange::new(first_pass, last_pass), last_state, size, desc, name)?;
        match allocated.resource {
            GpuResource::Buffer(buffer) => Ok(Allocated {
                key: allocated.key,
                resource: buffer,
                initial_state: allocated.initial_state,
            }),
            GpuResource::Texture(_) => Err(engine_err!(self.logger, SOURCE,
                "Allocation for buffer '{}' is not a buffer", name)),
        }
    }

    fn allocate(
        &mut self,
        lifetime: LifetimeRange,
        last_state: ResourceAccessFlags,
        size: u64,
        desc: ResourceDesc,
        name: &str,
    ) -> Result<Allocated<GpuResource>> {
        loop {
            for heap_index in 0..self.heaps.len() {
                let heap = &self.heaps[heap_index];
                if heap.heap.desc().size < size || heap.is_overlapping(&lifetime) {
                    continue;
                }

                // Reuse a retired resource of the same description
                let allocations = &self.allocations;
                let heap = &mut self.heaps[heap_index];
                let retired = heap.resources.iter_mut().find(|r| {
                    !r.lifetime.is_used()
                        && allocations.get(r.key).is_some_and(|a| a.desc == desc)
                });
                if let Some(retired) = retired {
                    retired.lifetime = lifetime;
                    let initial_state = retired.last_used_state;
                    retired.last_used_state = last_state;
                    let key = retired.key;
                    engine_trace!(self.logger, SOURCE,
                        "Reusing '{}' for '{}' in heap '{}'",
                        allocations[key].resource.name(), name, heap.heap.name());
                    return Ok(Allocated {
                        key,
                        resource: allocations[key].resource.clone(),
                        initial_state,
                    });
                }

                // Otherwise create a new resource placed in this heap
                let heap_handle = heap.heap.clone();
                let resource = self.create_resource(&desc, Some(&heap_handle), name)?;
                let key = self.allocations.insert(Allocation {
                    resource: resource.clone(),
                    desc: desc.clone(),
                });
                self.heaps[heap_index].resources.push(AliasedResource {
                    key,
                    lifetime,
                    last_used_frame: 0,
                    last_used_state: last_state,
                });
                engine_debug!(self.logger, SOURCE,
                    "Created '{}' in heap '{}' for passes [{}, {}]",
                    resource.name(), heap_handle.name(), lifetime.first_pass, lifetime.last_pass);
                return Ok(Allocated {
                    key,
                    resource,
                    initial_state: Self::initial_state(&desc),
                });
            }

            // No heap can hold it
            self.allocate_heap(size)?;
        }
    }

    fn allocate_heap(&mut self, size: u64) -> Result<()> {
        let alignment = self.config.heap_alignment.max(1);
        let heap_desc = HeapDesc {
            size: size.max(1).div_ceil(alignment) * alignment,
            memory_type: Default::default(),
        };
        let name = format!("RG Heap {:.1} MB", heap_desc.size as f64 / (1024.0 * 1024.0));

        let heap = self.lock_device()?.create_heap(&heap_desc, &name)?;
        engine_info!(self.logger, SOURCE, "Allocated heap '{}' ({} bytes)", name, heap_desc.size);

        self.heaps.push(AllocatorHeap {
            heap,
            resources: Vec::new(),
        });
        Ok(())
    }

    /// Committed texture that never aliases (graph outputs)
    pub fn allocate_non_overlapping_texture(
        &mut self,
        desc: &TextureDesc,
        name: &str,
    ) -> Result<Allocated<Arc<dyn Texture>>> {
        let allocated = self.allocate_non_overlapping(ResourceDesc::Texture(desc.clone()), name)?;
        match allocated.resource {
            GpuResource::Texture(texture) => Ok(Allocated {
                key: allocated.key,
                resource: texture,
                initial_state: allocated.initial_state,
            }),
            GpuResource::Buffer(_) => Err(engine_err!(self.logger, SOURCE,
                "Allocation for texture '{}' is not a texture", name)),
        }
    }

    /// Committed buffer that never aliases (graph outputs)
    pub fn allocate_non_overlapping_buffer(
        &mut self,
        desc: &BufferDesc,
        name: &str,
    ) -> Result<Allocated<Arc<dyn Buffer>>> {
        let allocated = self.allocate_non_overlapping(ResourceDesc::Buffer(desc.clone()), name)?;
        match allocated.resource {
            GpuResource::Buffer(buffer) => Ok(Allocated {
                key: allocated.key,
                resource: buffer,
                initial_state: allocated.initial_state,
            }),
            GpuResource::Texture(_) => Err(engine_err!(self.logger, SOURCE,
                "Allocation for buffer '{}' is not a buffer", name)),
        }
    }

    fn allocate_non_overlapping(&mut self, desc: ResourceDesc, name: &str) -> Result<Allocated<GpuResource>> {
        let allocations = &self.allocations;
        let position = self.free_non_overlapping
            .iter()
            .position(|r| allocations.get(r.key).is_some_and(|a| a.desc == desc));

        if let Some(position) = position {
            let free = self.free_non_overlapping.remove(position);
            engine_trace!(self.logger, SOURCE,
                "Recycling '{}' for output '{}'", allocations[free.key].resource.name(), name);
            return Ok(Allocated {
                key: free.key,
                resource: allocations[free.key].resource.clone(),
                initial_state: free.last_used_state,
            });
        }

        let resource = self.create_resource(&desc, None, name)?;
        let initial_state = Self::initial_state(&desc);
        let key = self.allocations.insert(Allocation { resource: resource.clone(), desc });
        engine_debug!(self.logger, SOURCE, "Created output '{}'", resource.name());
        Ok(Allocated { key, resource, initial_state })
    }

    fn create_resource(
        &self,
        desc: &ResourceDesc,
        heap: Option<&Arc<dyn Heap>>,
        name: &str,
    ) -> Result<GpuResource> {
        let mut device = self.lock_device()?;
        match desc {
            ResourceDesc::Texture(texture) => {
                let name = format!("RGTexture {}", name);
                Ok(GpuResource::Texture(device.create_texture(texture, heap, &name)?))
            }
            ResourceDesc::Buffer(buffer) => {
                let name = format!("RGBuffer {}", name);
                Ok(GpuResource::Buffer(device.create_buffer(buffer, heap, &name)?))
            }
        }
    }

    /// State a freshly created resource is in
    fn initial_state(desc: &ResourceDesc) -> ResourceAccessFlags {
        match desc {
            ResourceDesc::Texture(texture) => {
                if texture.format.is_depth() {
                    ResourceAccessFlags::MASK_DEPTH_STENCIL_ACCESS
                } else if texture.usage.intersects(TextureUsage::RENDER_TARGET) {
                    ResourceAccessFlags::RENDER_TARGET
                } else if texture.usage.intersects(TextureUsage::SHADER_STORAGE) {
                    ResourceAccessFlags::MASK_SHADER_STORAGE
                } else {
                    ResourceAccessFlags::DISCARD
                }
            }
            ResourceDesc::Buffer(_) => ResourceAccessFlags::DISCARD,
        }
    }

    // ===== RETIREMENT =====

    /// Retire a heap-placed resource at the end of the frame
    ///
    /// The slot stays in its heap for reuse; `state` overrides its recorded
    /// last state when `set_state` is true.
    pub fn free(&mut self, key: AllocationKey, state: ResourceAccessFlags, set_state: bool) -> Result<()> {
        let frame_id = self.frame_id()?;
        let slot = self.heaps
            .iter_mut()
            .flat_map(|heap| heap.resources.iter_mut())
            .find(|r| r.key == key);

        match slot {
            Some(slot) => {
                slot.lifetime.reset();
                slot.last_used_frame = frame_id;
                if set_state {
                    slot.last_used_state = state;
                }
                Ok(())
            }
            None => Err(engine_err!(self.logger, SOURCE, "Resource not found in any heap")),
        }
    }

    /// Return an output resource to the non-overlapping free list
    pub fn free_non_overlapping(&mut self, key: AllocationKey, state: ResourceAccessFlags) -> Result<()> {
        let frame_id = self.frame_id()?;
        self.free_non_overlapping.push(NonOverlappingResource {
            key,
            last_used_state: state,
            last_used_frame: frame_id,
        });
        Ok(())
    }

    /// Previous occupant of the memory `key` aliases
    ///
    /// Among the other live resources of the same heap, the one whose last
    /// pass is the latest still before `first_pass`. Returns it with its last
    /// state and flags it DISCARD, since the new resource overwrites it.
    pub fn aliased_prev_resource(
        &mut self,
        key: AllocationKey,
        first_pass: u32,
    ) -> Option<(GpuResource, ResourceAccessFlags)> {
        let heap = self.heaps.iter_mut().find(|heap| heap.contains(key))?;

        let previous = heap.resources
            .iter_mut()
            .filter(|r| r.key != key && r.lifetime.is_used() && r.lifetime.last_pass < first_pass)
            .max_by_key(|r| r.lifetime.last_pass)?;

        let state = previous.last_used_state;
        previous.last_used_state |= ResourceAccessFlags::DISCARD;
        let resource = self.allocations.get(previous.key)?.resource.clone();
        Some((resource, state))
    }

    /// End-of-frame garbage collection
    ///
    /// Destroys pooled resources (and their views) unused for more than
    /// `resource_retention_frames`, then drops heaps left empty.
    pub fn reset(&mut self) -> Result<()> {
        let frame_id = self.frame_id()?;
        let retention = self.config.resource_retention_frames;
        let is_stale = |last_used_frame: u64| frame_id.saturating_sub(last_used_frame) > retention;

        let mut stale = Vec::new();
        for heap in &mut self.heaps {
            heap.resources.retain(|r| {
                let expired = !r.lifetime.is_used() && is_stale(r.last_used_frame);
                if expired {
                    stale.push(r.key);
                }
                !expired
            });
        }

        let heap_count = self.heaps.len();
        self.heaps.retain(|heap| !heap.resources.is_empty());
        let released_heaps = heap_count - self.heaps.len();

        self.free_non_overlapping.retain(|r| {
            let expired = is_stale(r.last_used_frame);
            if expired {
                stale.push(r.key);
            }
            !expired
        });

        for key in &stale {
            self.release(*key);
        }

        if !stale.is_empty() || released_heaps > 0 {
            engine_debug!(self.logger, SOURCE,
                "Frame {}: destroyed {} stale resource(s) and {} empty heap(s)",
                frame_id, stale.len(), released_heaps);
        }
        Ok(())
    }

    fn release(&mut self, key: AllocationKey) {
        self.shader_resource_views.retain(|(k, _), _| *k != key);
        self.unordered_access_views.retain(|(k, _), _| *k != key);
        self.allocations.remove(key);
    }

    // ===== DESCRIPTORS =====

    /// Memoized read-only view
    pub fn shader_resource_view(
        &mut self,
        key: AllocationKey,
        desc: &ShaderResourceViewDesc,
    ) -> Result<Arc<dyn Descriptor>> {
        if let Some(descriptor) = self.shader_resource_views.get(&(key, *desc)) {
            return Ok(descriptor.clone());
        }

        let resource = self.resource(key)?;
        let descriptor = self.lock_device()?
            .create_shader_resource_view(&resource, desc, resource.name())?;
        self.shader_resource_views.insert((key, *desc), descriptor.clone());
        Ok(descriptor)
    }

    /// Memoized read-write view
    pub fn unordered_access_view(
        &mut self,
        key: AllocationKey,
        desc: &UnorderedAccessViewDesc,
    ) -> Result<Arc<dyn Descriptor>> {
        if let Some(descriptor) = self.unordered_access_views.get(&(key, *desc)) {
            return Ok(descriptor.clone());
        }

        let resource = self.resource(key)?;
        let descriptor = self.lock_device()?
            .create_unordered_access_view(&resource, desc, resource.name())?;
        self.unordered_access_views.insert((key, *desc), descriptor.clone());
        Ok(descriptor)
    }

    // ===== STATISTICS =====

    pub fn heap_count(&self) -> usize {
        self.heaps.len()
    }

    /// Live GPU resources owned by the allocator (pooled ones included)
    pub fn resource_count(&self) -> usize {
        self.allocations.len()
    }

    /// Bytes of device memory held in heaps
    pub fn total_heap_size(&self) -> u64 {
        self.heaps.iter().map(|heap| heap.heap.desc().size).sum()
    }

    /// Number of descriptor views currently memoized
    pub fn descriptor_count(&self) -> usize {
        self.shader_resource_views.len() + self.unordered_access_views.len()
    }

    /// Output resources waiting in the non-overlapping free list
    pub fn free_output_count(&self) -> usize {
        self.free_non_overlapping.len()
    }

    /// The GPU object behind `key`
    pub fn resource(&self, key: AllocationKey) -> Result<GpuResource> {
        match self.allocations.get(key) {
            Some(allocation) => Ok(allocation.resource.clone()),
            None => Err(engine_err!(self.logger, SOURCE, "Unknown allocation {:?}", key)),
        }
    }

    // ===== HELPERS =====

    fn lock_device(&self) -> Result<std::sync::MutexGuard<'_, dyn GraphicsDevice + 'static>> {
        self.device.lock()
            .map_err(|_| engine_err!(self.logger, SOURCE, "GraphicsDevice lock poisoned"))
    }

    fn frame_id(&self) -> Result<u64> {
        Ok(self.lock_device()?.frame_id())
    }
}

#[cfg(test)]
#[path = "resource_allocator_tests.rs"]
mod tests;
