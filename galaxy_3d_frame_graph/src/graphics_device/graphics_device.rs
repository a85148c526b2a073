/// GraphicsDevice trait - factory for the GPU objects the frame graph needs

use std::fmt;
use std::sync::Arc;
use crate::error::Result;
use super::{
    Buffer, BufferDesc, Descriptor, Fence, Heap, HeapDesc, ShaderResourceViewDesc, Texture,
    TextureDesc, UnorderedAccessViewDesc,
};

/// A texture or a buffer, compared by identity
#[derive(Clone)]
pub enum GpuResource {
    Texture(Arc<dyn Texture>),
    Buffer(Arc<dyn Buffer>),
}

impl GpuResource {
    pub fn name(&self) -> &str {
        match self {
            GpuResource::Texture(texture) => texture.name(),
            GpuResource::Buffer(buffer) => buffer.name(),
        }
    }

    pub fn is_texture(&self) -> bool {
        matches!(self, GpuResource::Texture(_))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, GpuResource::Buffer(_))
    }

    pub fn as_texture(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            GpuResource::Texture(texture) => Some(texture),
            GpuResource::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        match self {
            GpuResource::Buffer(buffer) => Some(buffer),
            GpuResource::Texture(_) => None,
        }
    }

    /// Same underlying GPU object
    pub fn ptr_eq(&self, other: &GpuResource) -> bool {
        self.address() == other.address()
    }

    fn address(&self) -> *const () {
        match self {
            GpuResource::Texture(texture) => Arc::as_ptr(texture) as *const (),
            GpuResource::Buffer(buffer) => Arc::as_ptr(buffer) as *const (),
        }
    }
}

impl fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuResource::Texture(texture) => write!(f, "Texture({})", texture.name()),
            GpuResource::Buffer(buffer) => write!(f, "Buffer({})", buffer.name()),
        }
    }
}

/// Graphics device (factory for GPU objects)
///
/// Only the narrow surface the frame graph consumes. Backends own queue
/// creation, presentation and everything else.
pub trait GraphicsDevice: Send + Sync {
    /// Create a texture, placed in `heap` when given, committed otherwise
    fn create_texture(
        &mut self,
        desc: &TextureDesc,
        heap: Option<&Arc<dyn Heap>>,
        name: &str,
    ) -> Result<Arc<dyn Texture>>;

    /// Create a buffer, placed in `heap` when given, committed otherwise
    fn create_buffer(
        &mut self,
        desc: &BufferDesc,
        heap: Option<&Arc<dyn Heap>>,
        name: &str,
    ) -> Result<Arc<dyn Buffer>>;

    /// Create a heap of raw device memory
    fn create_heap(&mut self, desc: &HeapDesc, name: &str) -> Result<Arc<dyn Heap>>;

    /// Create a timeline fence starting at 0
    fn create_fence(&mut self, name: &str) -> Result<Arc<dyn Fence>>;

    /// Create a read-only view of a texture or buffer
    fn create_shader_resource_view(
        &mut self,
        resource: &GpuResource,
        desc: &ShaderResourceViewDesc,
        name: &str,
    ) -> Result<Arc<dyn Descriptor>>;

    /// Create a read-write view of a texture or buffer
    fn create_unordered_access_view(
        &mut self,
        resource: &GpuResource,
        desc: &UnorderedAccessViewDesc,
        name: &str,
    ) -> Result<Arc<dyn Descriptor>>;

    /// Index of the frame currently being recorded
    fn frame_id(&self) -> u64;

    /// Bytes a placed texture with this description needs in a heap
    fn texture_allocation_size(&self, desc: &TextureDesc) -> u64;
}
