/// Mock graphics device for tests (no GPU required)
///
/// Every object is plain CPU data. `MockCommandList` records each command as
/// a string so tests can assert on the exact barrier/submit/fence sequence a
/// compiled graph produces.

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use super::{
    Buffer, BufferDesc, CommandList, Descriptor, Fence, GpuResource, GraphicsDevice, Heap,
    HeapDesc, RenderPassDesc, ResourceAccessFlags, ShaderResourceViewDesc, Texture, TextureDesc,
    UnorderedAccessViewDesc,
};

/// Placement alignment reported by `MockGraphicsDevice::texture_allocation_size`
pub const MOCK_PLACEMENT_ALIGNMENT: u64 = 64 * 1024;

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub desc: TextureDesc,
    pub name: String,
    /// Name of the heap the texture was placed in
    pub heap: Option<String>,
}

impl Texture for MockTexture {
    fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Buffer
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub desc: BufferDesc,
    pub name: String,
    pub heap: Option<String>,
}

impl Buffer for MockBuffer {
    fn desc(&self) -> &BufferDesc {
        &self.desc
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Heap
// ============================================================================

#[derive(Debug)]
pub struct MockHeap {
    pub desc: HeapDesc,
    pub name: String,
}

impl Heap for MockHeap {
    fn desc(&self) -> &HeapDesc {
        &self.desc
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Fence
// ============================================================================

#[derive(Debug)]
pub struct MockFence {
    pub name: String,
    value: Mutex<u64>,
}

impl MockFence {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), value: Mutex::new(0) }
    }
}

impl Fence for MockFence {
    fn wait(&self, _value: u64) -> Result<()> {
        Ok(())
    }

    fn signal(&self, value: u64) -> Result<()> {
        let mut current = self.value.lock()
            .map_err(|_| Error::BackendError("MockFence lock poisoned".to_string()))?;
        *current = value;
        Ok(())
    }

    fn completed_value(&self) -> u64 {
        self.value.lock().map(|v| *v).unwrap_or(0)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Mock Descriptor
// ============================================================================

#[derive(Debug)]
pub struct MockDescriptor {
    pub index: u32,
    pub name: String,
}

impl Descriptor for MockDescriptor {
    fn heap_index(&self) -> u32 {
        self.index
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Mock device counting every object it creates
#[derive(Debug, Default)]
pub struct MockGraphicsDevice {
    frame_id: u64,
    /// When set, every create_* call fails with a backend error
    pub fail_creation: bool,
    pub textures_created: u32,
    pub buffers_created: u32,
    pub heaps_created: u32,
    pub fences_created: u32,
    pub shader_resource_views_created: u32,
    pub unordered_access_views_created: u32,
    /// Names of every created object, in creation order
    pub created_names: Vec<String>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: boxed as the shared handle the frame graph expects
    pub fn shared() -> Arc<Mutex<MockGraphicsDevice>> {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn set_frame_id(&mut self, frame_id: u64) {
        self.frame_id = frame_id;
    }

    pub fn advance_frame(&mut self) {
        self.frame_id += 1;
    }

    fn check_creation(&self, what: &str, name: &str) -> Result<()> {
        if self.fail_creation {
            return Err(Error::BackendError(format!("Mock failure creating {} '{}'", what, name)));
        }
        Ok(())
    }

    fn next_descriptor_index(&self) -> u32 {
        self.shader_resource_views_created + self.unordered_access_views_created
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        heap: Option<&Arc<dyn Heap>>,
        name: &str,
    ) -> Result<Arc<dyn Texture>> {
        self.check_creation("texture", name)?;
        self.textures_created += 1;
        self.created_names.push(name.to_string());
        Ok(Arc::new(MockTexture {
            desc: desc.clone(),
            name: name.to_string(),
            heap: heap.map(|h| h.name().to_string()),
        }))
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        heap: Option<&Arc<dyn Heap>>,
        name: &str,
    ) -> Result<Arc<dyn Buffer>> {
        self.check_creation("buffer", name)?;
        self.buffers_created += 1;
        self.created_names.push(name.to_string());
        Ok(Arc::new(MockBuffer {
            desc: desc.clone(),
            name: name.to_string(),
            heap: heap.map(|h| h.name().to_string()),
        }))
    }

    fn create_heap(&mut self, desc: &HeapDesc, name: &str) -> Result<Arc<dyn Heap>> {
        self.check_creation("heap", name)?;
        self.heaps_created += 1;
        self.created_names.push(name.to_string());
        Ok(Arc::new(MockHeap { desc: desc.clone(), name: name.to_string() }))
    }

    fn create_fence(&mut self, name: &str) -> Result<Arc<dyn Fence>> {
        self.check_creation("fence", name)?;
        self.fences_created += 1;
        self.created_names.push(name.to_string());
        Ok(Arc::new(MockFence::new(name)))
    }

    fn create_shader_resource_view(
        &mut self,
        resource: &GpuResource,
        _desc: &ShaderResourceViewDesc,
        name: &str,
    ) -> Result<Arc<dyn Descriptor>> {
        self.check_creation("SRV", name)?;
        let index = self.next_descriptor_index();
        self.shader_resource_views_created += 1;
        Ok(Arc::new(MockDescriptor { index, name: format!("{} SRV", resource.name()) }))
    }

    fn create_unordered_access_view(
        &mut self,
        resource: &GpuResource,
        _desc: &UnorderedAccessViewDesc,
        name: &str,
    ) -> Result<Arc<dyn Descriptor>> {
        self.check_creation("UAV", name)?;
        let index = self.next_descriptor_index();
        self.unordered_access_views_created += 1;
        Ok(Arc::new(MockDescriptor { index, name: format!("{} UAV", resource.name()) }))
    }

    fn frame_id(&self) -> u64 {
        self.frame_id
    }

    fn texture_allocation_size(&self, desc: &TextureDesc) -> u64 {
        let texel = desc.format.bytes_per_texel().max(1) as u64;
        let mut size = 0u64;
        for mip in 0..desc.mip_levels {
            let width = (desc.width >> mip).max(1) as u64;
            let height = (desc.height >> mip).max(1) as u64;
            let depth = (desc.depth >> mip).max(1) as u64;
            size += width * height * depth * texel;
        }
        size *= desc.array_size as u64;
        size.div_ceil(MOCK_PLACEMENT_ALIGNMENT) * MOCK_PLACEMENT_ALIGNMENT
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

/// Command list recording every call as a string
#[derive(Default)]
pub struct MockCommandList {
    pub commands: Vec<String>,
    /// Every render pass description received, in order
    pub render_passes: Vec<RenderPassDesc>,
}

impl MockCommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands starting with `prefix`
    pub fn commands_starting_with(&self, prefix: &str) -> Vec<&str> {
        self.commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .map(|c| c.as_str())
            .collect()
    }

    /// Index of the first recorded command equal to `command`
    pub fn position(&self, command: &str) -> Option<usize> {
        self.commands.iter().position(|c| c == command)
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.commands.push("end".to_string());
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        self.commands.push("submit".to_string());
        Ok(())
    }

    fn wait(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()> {
        self.commands.push(format!("wait {} {}", fence.name(), value));
        Ok(())
    }

    fn signal(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()> {
        self.commands.push(format!("signal {} {}", fence.name(), value));
        Ok(())
    }

    fn texture_barrier(
        &mut self,
        texture: &dyn Texture,
        subresource: u32,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()> {
        self.commands.push(format!(
            "texture_barrier {}[{}] {} -> {}",
            texture.name(), subresource, access_before, access_after
        ));
        Ok(())
    }

    fn buffer_barrier(
        &mut self,
        buffer: &dyn Buffer,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()> {
        self.commands.push(format!(
            "buffer_barrier {} {} -> {}",
            buffer.name(), access_before, access_after
        ));
        Ok(())
    }

    fn global_barrier(
        &mut self,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()> {
        self.commands.push(format!("global_barrier {} -> {}", access_before, access_after));
        Ok(())
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()> {
        let mut command = "begin_render_pass".to_string();
        for (index, color) in desc.color.iter().enumerate() {
            if let Some(color) = color {
                command.push_str(&format!(
                    " color{}={}({:?},{:?})",
                    index, color.texture.name(), color.load_op, color.store_op
                ));
            }
        }
        if let Some(depth) = &desc.depth {
            command.push_str(&format!(
                " depth={}({:?},{:?},{})",
                depth.texture.name(),
                depth.load_op,
                depth.store_op,
                if depth.read_only { "ro" } else { "rw" }
            ));
        }
        self.commands.push(command);
        self.render_passes.push(desc.clone());
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()> {
        self.commands.push(format!("dispatch {} {} {}", group_count_x, group_count_y, group_count_z));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.commands.push(format!("draw {} {}", vertex_count, first_vertex));
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
