/// Pass action trait and implementations.
///
/// Defines what a render graph pass records once its barriers are issued
/// and its render pass (if any) is open.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{Buffer, CommandList, Descriptor, Texture};
use super::render_graph_handle::RgHandle;
use super::render_graph_resource::{RenderGraphResource, RgBuffer, RgTexture};
use super::resource_allocator::ResourceAllocator;

/// What a pass callback sees while recording
///
/// Gives access to the command list of the pass's queue and to the realized
/// resources behind the handles the pass declared.
pub struct PassContext<'a> {
    command_list: &'a mut dyn CommandList,
    resources: &'a [RenderGraphResource],
    allocator: &'a mut ResourceAllocator,
    pass_name: &'a str,
}

impl<'a> PassContext<'a> {
    pub(crate) fn new(
        command_list: &'a mut dyn CommandList,
        resources: &'a [RenderGraphResource],
        allocator: &'a mut ResourceAllocator,
        pass_name: &'a str,
    ) -> Self {
        Self { command_list, resources, allocator, pass_name }
    }

    pub fn command_list(&mut self) -> &mut dyn CommandList {
        &mut *self.command_list
    }

    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// GPU texture behind `handle`
    pub fn texture(&self, handle: RgHandle) -> Result<&Arc<dyn Texture>> {
        let texture = self.rg_texture(handle);
        texture.texture().ok_or_else(|| self.unrealized(handle))
    }

    /// GPU buffer behind `handle`
    pub fn buffer(&self, handle: RgHandle) -> Result<&Arc<dyn Buffer>> {
        let buffer = self.rg_buffer(handle);
        buffer.buffer().ok_or_else(|| self.unrealized(handle))
    }

    pub fn texture_srv(&mut self, handle: RgHandle) -> Result<Arc<dyn Descriptor>> {
        let texture = rg_texture(self.resources, handle);
        texture.srv(self.allocator)
    }

    pub fn texture_uav(&mut self, handle: RgHandle) -> Result<Arc<dyn Descriptor>> {
        let texture = rg_texture(self.resources, handle);
        texture.uav(self.allocator)
    }

    pub fn texture_uav_at(&mut self, handle: RgHandle, mip: u32, slice: u32) -> Result<Arc<dyn Descriptor>> {
        let texture = rg_texture(self.resources, handle);
        texture.uav_at(self.allocator, mip, slice)
    }

    pub fn buffer_srv(&mut self, handle: RgHandle) -> Result<Arc<dyn Descriptor>> {
        let buffer = rg_buffer(self.resources, handle);
        buffer.srv(self.allocator)
    }

    pub fn buffer_uav(&mut self, handle: RgHandle) -> Result<Arc<dyn Descriptor>> {
        let buffer = rg_buffer(self.resources, handle);
        buffer.uav(self.allocator)
    }

    fn rg_texture(&self, handle: RgHandle) -> &'a RgTexture {
        rg_texture(self.resources, handle)
    }

    fn rg_buffer(&self, handle: RgHandle) -> &'a RgBuffer {
        rg_buffer(self.resources, handle)
    }

    fn unrealized(&self, handle: RgHandle) -> Error {
        Error::InvalidResource(format!(
            "Pass '{}': resource {} is not realized", self.pass_name, handle.resource
        ))
    }
}

fn resource(resources: &[RenderGraphResource], handle: RgHandle) -> &RenderGraphResource {
    assert!(handle.is_valid(), "Invalid render graph handle");
    &resources[handle.resource as usize]
}

fn rg_texture(resources: &[RenderGraphResource], handle: RgHandle) -> &RgTexture {
    match resource(resources, handle).as_texture() {
        Some(texture) => texture,
        None => panic!("Handle {} is not a texture", handle.resource),
    }
}

fn rg_buffer(resources: &[RenderGraphResource], handle: RgHandle) -> &RgBuffer {
    match resource(resources, handle).as_buffer() {
        Some(buffer) => buffer,
        None => panic!("Handle {} is not a buffer", handle.resource),
    }
}

// ============================================================================
// PassAction
// ============================================================================

/// Action executed by a render graph pass
pub trait PassAction: Send + Sync {
    /// Record commands for the pass
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()>;
}

/// Fullscreen pass action (data-driven, no closure)
///
/// Draws a fullscreen triangle (3 vertices) inside the pass's render pass.
/// Pipeline and bindings are expected to be set by the backend's pass
/// preamble. Used for post-processing passes (tone mapping, blur, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct FullscreenAction;

impl PassAction for FullscreenAction {
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        ctx.command_list().draw(3, 0)
    }
}

/// Compute dispatch action (data-driven, no closure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchAction {
    pub group_count_x: u32,
    pub group_count_y: u32,
    pub group_count_z: u32,
}

impl DispatchAction {
    pub fn new(group_count_x: u32, group_count_y: u32, group_count_z: u32) -> Self {
        Self { group_count_x, group_count_y, group_count_z }
    }
}

impl PassAction for DispatchAction {
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        ctx.command_list().dispatch(self.group_count_x, self.group_count_y, self.group_count_z)
    }
}

/// Custom pass action (closure-based)
///
/// Executes a user-provided closure for full control over command
/// recording.
pub struct CustomAction {
    callback: Box<dyn FnMut(&mut PassContext) -> Result<()> + Send + Sync>,
}

impl CustomAction {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut PassContext) -> Result<()> + Send + Sync + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl PassAction for CustomAction {
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        (self.callback)(ctx)
    }
}

/// Pass data filled at setup, handed to the execute callback
///
/// Backs `RenderGraph::add_pass`.
pub(crate) struct PassCallback<D> {
    data: D,
    callback: Box<dyn FnMut(&D, &mut PassContext) -> Result<()> + Send + Sync>,
}

impl<D> PassCallback<D> {
    pub(crate) fn new<F>(data: D, callback: F) -> Self
    where
        F: FnMut(&D, &mut PassContext) -> Result<()> + Send + Sync + 'static,
    {
        Self { data, callback: Box::new(callback) }
    }
}

impl<D: Send + Sync> PassAction for PassCallback<D> {
    fn execute(&mut self, ctx: &mut PassContext) -> Result<()> {
        (self.callback)(&self.data, ctx)
    }
}

#[cfg(test)]
#[path = "pass_action_tests.rs"]
mod tests;
