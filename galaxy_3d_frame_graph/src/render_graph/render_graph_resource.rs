/// Render graph resources (textures and buffers).
///
/// A resource is either imported (externally owned, already backed), an
/// output (graph-managed but never aliased), or transient (placed in an
/// aliased heap slot by the allocator). Graph-managed resources are realized
/// lazily during `compile()`, once their pass range is known.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, BufferViewRange, CommandList, Descriptor, GpuResource,
    ResourceAccessFlags, ShaderResourceViewDesc, ShaderResourceViewType, Texture, TextureDesc,
    TextureViewRange, UnorderedAccessViewDesc, UnorderedAccessViewType, ViewRange,
};
use super::render_graph_pass::PassType;
use super::resource_allocator::{AllocationKey, ResourceAllocator};

/// State shared by both resource kinds
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    name: String,
    first_pass: u32,
    last_pass: u32,
    first_access: u32,
    last_access: u32,
    last_state: ResourceAccessFlags,
    initial_state: ResourceAccessFlags,
    imported: bool,
    output: bool,
    allocation: Option<AllocationKey>,
}

impl ResourceInfo {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            first_pass: u32::MAX,
            last_pass: 0,
            first_access: u32::MAX,
            last_access: 0,
            last_state: ResourceAccessFlags::DISCARD,
            initial_state: ResourceAccessFlags::DISCARD,
            imported: false,
            output: false,
            allocation: None,
        }
    }

    fn imported(name: &str, state: ResourceAccessFlags) -> Self {
        Self {
            initial_state: state,
            imported: true,
            ..Self::new(name)
        }
    }
}

// ============================================================================
// RgTexture
// ============================================================================

/// Texture declared in a render graph
pub struct RgTexture {
    info: ResourceInfo,
    desc: TextureDesc,
    texture: Option<Arc<dyn Texture>>,
}

impl RgTexture {
    pub(crate) fn new(name: &str, desc: &TextureDesc) -> Self {
        Self {
            info: ResourceInfo::new(name),
            desc: desc.clone(),
            texture: None,
        }
    }

    pub(crate) fn import(texture: Arc<dyn Texture>, state: ResourceAccessFlags) -> Self {
        Self {
            info: ResourceInfo::imported(texture.name(), state),
            desc: texture.desc().clone(),
            texture: Some(texture),
        }
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// GPU texture (None until realized)
    pub fn texture(&self) -> Option<&Arc<dyn Texture>> {
        self.texture.as_ref()
    }

    /// Read-only view of the whole texture
    pub fn srv(&self, allocator: &mut ResourceAllocator) -> Result<Arc<dyn Descriptor>> {
        let key = self.allocation_key();
        let desc = ShaderResourceViewDesc {
            format: self.desc.format,
            ..Default::default()
        };
        allocator.shader_resource_view(key, &desc)
    }

    /// Read-write view of mip 0, slice 0
    pub fn uav(&self, allocator: &mut ResourceAllocator) -> Result<Arc<dyn Descriptor>> {
        self.uav_at(allocator, 0, 0)
    }

    /// Read-write view of one mip of one slice
    pub fn uav_at(&self, allocator: &mut ResourceAllocator, mip: u32, slice: u32) -> Result<Arc<dyn Descriptor>> {
        let key = self.allocation_key();
        let desc = UnorderedAccessViewDesc {
            format: self.desc.format,
            range: ViewRange::Texture(TextureViewRange {
                mip_slice: mip,
                array_slice: slice,
                mip_levels: 1,
                ..Default::default()
            }),
            ..Default::default()
        };
        allocator.unordered_access_view(key, &desc)
    }

    fn allocation_key(&self) -> AllocationKey {
        assert!(!self.info.imported, "No views of imported texture '{}'", self.info.name);
        match self.info.allocation {
            Some(key) => key,
            None => panic!("Texture '{}' is not realized", self.info.name),
        }
    }

    fn realize(&mut self, allocator: &mut ResourceAllocator) -> Result<()> {
        if self.info.imported {
            return Ok(());
        }
        let allocated = if self.info.output {
            allocator.allocate_non_overlapping_texture(&self.desc, &self.info.name)?
        } else {
            allocator.allocate_texture(
                self.info.first_pass,
                self.info.last_pass,
                self.info.last_state,
                &self.desc,
                &self.info.name,
            )?
        };
        self.info.allocation = Some(allocated.key);
        self.info.initial_state = allocated.initial_state;
        self.texture = Some(allocated.resource);
        Ok(())
    }
}

// ============================================================================
// RgBuffer
// ============================================================================

/// Buffer declared in a render graph
pub struct RgBuffer {
    info: ResourceInfo,
    desc: BufferDesc,
    buffer: Option<Arc<dyn Buffer>>,
}

impl RgBuffer {
    pub(crate) fn new(name: &str, desc: &BufferDesc) -> Self {
        Self {
            info: ResourceInfo::new(name),
            desc: desc.clone(),
            buffer: None,
        }
    }

    pub(crate) fn import(buffer: Arc<dyn Buffer>, state: ResourceAccessFlags) -> Self {
        Self {
            info: ResourceInfo::imported(buffer.name(), state),
            desc: buffer.desc().clone(),
            buffer: Some(buffer),
        }
    }

    pub fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    /// GPU buffer (None until realized)
    pub fn buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.buffer.as_ref()
    }

    /// Read-only view; the view type follows the buffer usage
    pub fn srv(&self, allocator: &mut ResourceAllocator) -> Result<Arc<dyn Descriptor>> {
        let key = self.allocation_key();
        let usage = self.desc.usage;
        let view_type = if usage.intersects(BufferUsage::STRUCTURED) {
            ShaderResourceViewType::StructuredBuffer
        } else if usage.intersects(BufferUsage::FORMATTED) {
            ShaderResourceViewType::FormattedBuffer
        } else {
            ShaderResourceViewType::RawBuffer
        };
        let desc = ShaderResourceViewDesc {
            view_type,
            format: self.desc.format,
            range: self.whole_range(),
        };
        allocator.shader_resource_view(key, &desc)
    }

    /// Read-write view; requires STORAGE usage
    pub fn uav(&self, allocator: &mut ResourceAllocator) -> Result<Arc<dyn Descriptor>> {
        let key = self.allocation_key();
        let usage = self.desc.usage;
        assert!(
            usage.intersects(BufferUsage::STORAGE),
            "Buffer '{}' has no STORAGE usage", self.info.name
        );
        let view_type = if usage.intersects(BufferUsage::STRUCTURED) {
            UnorderedAccessViewType::StructuredBuffer
        } else if usage.intersects(BufferUsage::FORMATTED) {
            UnorderedAccessViewType::FormattedBuffer
        } else {
            UnorderedAccessViewType::RawBuffer
        };
        let desc = UnorderedAccessViewDesc {
            view_type,
            format: self.desc.format,
            range: self.whole_range(),
        };
        allocator.unordered_access_view(key, &desc)
    }

    fn whole_range(&self) -> ViewRange {
        ViewRange::Buffer(BufferViewRange {
            offset: 0,
            size: self.desc.size,
        })
    }

    fn allocation_key(&self) -> AllocationKey {
        assert!(!self.info.imported, "No views of imported buffer '{}'", self.info.name);
        match self.info.allocation {
            Some(key) => key,
            None => panic!("Buffer '{}' is not realized", self.info.name),
        }
    }

    fn realize(&mut self, allocator: &mut ResourceAllocator) -> Result<()> {
        if self.info.imported {
            return Ok(());
        }
        let allocated = if self.info.output {
            allocator.allocate_non_overlapping_buffer(&self.desc, &self.info.name)?
        } else {
            allocator.allocate_buffer(
                self.info.first_pass,
                self.info.last_pass,
                self.info.last_state,
                &self.desc,
                &self.info.name,
            )?
        };
        self.info.allocation = Some(allocated.key);
        self.info.initial_state = allocated.initial_state;
        self.buffer = Some(allocated.resource);
        Ok(())
    }
}

// ============================================================================
// RenderGraphResource
// ============================================================================

/// A texture or buffer declared in a render graph
pub enum RenderGraphResource {
    Texture(RgTexture),
    Buffer(RgBuffer),
}

impl RenderGraphResource {
    fn info(&self) -> &ResourceInfo {
        match self {
            RenderGraphResource::Texture(texture) => &texture.info,
            RenderGraphResource::Buffer(buffer) => &buffer.info,
        }
    }

    fn info_mut(&mut self) -> &mut ResourceInfo {
        match self {
            RenderGraphResource::Texture(texture) => &mut texture.info,
            RenderGraphResource::Buffer(buffer) => &mut buffer.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn as_texture(&self) -> Option<&RgTexture> {
        match self {
            RenderGraphResource::Texture(texture) => Some(texture),
            RenderGraphResource::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&RgBuffer> {
        match self {
            RenderGraphResource::Buffer(buffer) => Some(buffer),
            RenderGraphResource::Texture(_) => None,
        }
    }

    pub fn first_pass(&self) -> u32 {
        self.info().first_pass
    }

    pub fn last_pass(&self) -> u32 {
        self.info().last_pass
    }

    /// First surviving pass with an edge to this resource
    ///
    /// Unlike `first_pass()`, not widened over async compute runs.
    pub fn first_access_pass(&self) -> u32 {
        self.info().first_access
    }

    /// Last surviving pass with an edge to this resource
    pub fn last_access_pass(&self) -> u32 {
        self.info().last_access
    }

    /// Referenced by at least one surviving pass
    pub fn is_used(&self) -> bool {
        self.info().first_pass != u32::MAX
    }

    pub fn is_imported(&self) -> bool {
        self.info().imported
    }

    pub fn is_output(&self) -> bool {
        self.info().output
    }

    pub(crate) fn set_output(&mut self, output: bool) {
        self.info_mut().output = output;
    }

    /// Eligible for heap aliasing
    pub fn is_overlapping(&self) -> bool {
        !self.is_imported() && !self.is_output()
    }

    /// State before the first use this frame
    pub fn initial_state(&self) -> ResourceAccessFlags {
        self.info().initial_state
    }

    /// State after the last use this frame
    pub fn final_state(&self) -> ResourceAccessFlags {
        self.info().last_state
    }

    pub(crate) fn set_final_state(&mut self, state: ResourceAccessFlags) {
        self.info_mut().last_state = state;
    }

    /// Allocator slot (None for imported or unrealized resources)
    pub fn allocation(&self) -> Option<AllocationKey> {
        self.info().allocation
    }

    /// The GPU object (None until realized)
    pub fn gpu_resource(&self) -> Option<GpuResource> {
        match self {
            RenderGraphResource::Texture(texture) => texture.texture.clone().map(GpuResource::Texture),
            RenderGraphResource::Buffer(buffer) => buffer.buffer.clone().map(GpuResource::Buffer),
        }
    }

    /// Account for one edge between this resource and a surviving pass
    ///
    /// Extends the pass range and records the state left by the latest pass.
    /// An async compute pass also keeps the resource alive over the graphics
    /// passes it synchronizes with, since it runs concurrently with them.
    /// Only the lifetime range is widened; the access range and final state
    /// follow the passes that really touch the resource.
    pub(crate) fn resolve(
        &mut self,
        usage: ResourceAccessFlags,
        pass_id: u32,
        pass_type: PassType,
        wait_graphics_pass: Option<u32>,
        signal_graphics_pass: Option<u32>,
    ) {
        let info = self.info_mut();
        if pass_id >= info.last_access {
            info.last_state = usage;
        }
        info.first_access = info.first_access.min(pass_id);
        info.last_access = info.last_access.max(pass_id);
        info.first_pass = info.first_pass.min(pass_id);
        info.last_pass = info.last_pass.max(pass_id);

        if pass_type == PassType::AsyncCompute {
            if let Some(wait) = wait_graphics_pass {
                info.first_pass = info.first_pass.min(wait);
            }
            if let Some(signal) = signal_graphics_pass {
                info.last_pass = info.last_pass.max(signal);
            }
        }
    }

    /// Back the resource with GPU memory
    pub(crate) fn realize(&mut self, allocator: &mut ResourceAllocator) -> Result<()> {
        match self {
            RenderGraphResource::Texture(texture) => texture.realize(allocator),
            RenderGraphResource::Buffer(buffer) => buffer.realize(allocator),
        }
    }

    /// Record a state transition; buffers ignore the subresource
    pub fn barrier(
        &self,
        command_list: &mut dyn CommandList,
        subresource: u32,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()> {
        match self {
            RenderGraphResource::Texture(texture) => match &texture.texture {
                Some(gpu) => command_list.texture_barrier(gpu.as_ref(), subresource, access_before, access_after),
                None => Err(unrealized(&texture.info)),
            },
            RenderGraphResource::Buffer(buffer) => match &buffer.buffer {
                Some(gpu) => command_list.buffer_barrier(gpu.as_ref(), access_before, access_after),
                None => Err(unrealized(&buffer.info)),
            },
        }
    }

    /// Previous occupant of this resource's heap memory, with its last state
    pub(crate) fn aliased_prev_resource(
        &self,
        allocator: &mut ResourceAllocator,
    ) -> Option<(GpuResource, ResourceAccessFlags)> {
        let info = self.info();
        allocator.aliased_prev_resource(info.allocation?, info.first_pass)
    }

    /// Hand the GPU object back to the allocator at the end of the frame
    pub(crate) fn finalize(&self, allocator: &mut ResourceAllocator) -> Result<()> {
        let info = self.info();
        if info.imported {
            return Ok(());
        }
        match info.allocation {
            Some(key) if info.output => allocator.free_non_overlapping(key, info.last_state),
            Some(key) => allocator.free(key, info.last_state, false),
            None => Ok(()),
        }
    }
}

fn unrealized(info: &ResourceInfo) -> Error {
    Error::InvalidResource(format!("'{}' is not realized", info.name))
}

#[cfg(test)]
#[path = "render_graph_resource_tests.rs"]
mod tests;
