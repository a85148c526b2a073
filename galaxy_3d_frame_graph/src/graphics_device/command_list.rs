/// CommandList trait - for recording GPU commands on one queue

use std::sync::Arc;
use crate::error::Result;
use super::{Buffer, Fence, ResourceAccessFlags, Texture};

/// Maximum number of simultaneous color attachments
pub const MAX_COLOR_ATTACHMENTS: usize = 8;

/// Attachment load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    #[default]
    Load,
    Clear,
    DontCare,
}

/// Attachment store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

/// One color attachment of a render pass
#[derive(Clone)]
pub struct ColorAttachment {
    pub texture: Arc<dyn Texture>,
    pub mip_slice: u32,
    pub array_slice: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_color: [f32; 4],
}

/// Depth/stencil attachment of a render pass
#[derive(Clone)]
pub struct DepthAttachment {
    pub texture: Arc<dyn Texture>,
    pub mip_slice: u32,
    pub array_slice: u32,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub read_only: bool,
}

/// Attachments bound by `CommandList::begin_render_pass`
#[derive(Clone, Default)]
pub struct RenderPassDesc {
    pub color: [Option<ColorAttachment>; MAX_COLOR_ATTACHMENTS],
    pub depth: Option<DepthAttachment>,
}

/// Command list for recording GPU commands
///
/// One command list records for one queue (graphics or async compute).
/// `submit` hands the recorded commands to that queue; `wait`/`signal`
/// order the queue against a timeline fence.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Submit the recorded commands to the queue
    fn submit(&mut self) -> Result<()>;

    /// Make the queue wait until `fence` reaches `value`
    fn wait(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()>;

    /// Make the queue signal `fence` with `value` once previous work completes
    fn signal(&mut self, fence: &Arc<dyn Fence>, value: u64) -> Result<()>;

    /// Transition one subresource of a texture
    fn texture_barrier(
        &mut self,
        texture: &dyn Texture,
        subresource: u32,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()>;

    /// Transition a whole buffer
    fn buffer_barrier(
        &mut self,
        buffer: &dyn Buffer,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()>;

    /// Memory barrier not tied to a resource
    fn global_barrier(
        &mut self,
        access_before: ResourceAccessFlags,
        access_after: ResourceAccessFlags,
    ) -> Result<()>;

    /// Begin a render pass with the given attachments
    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Dispatch compute work groups
    fn dispatch(&mut self, group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Result<()>;

    /// Draw vertices
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;
}
