/// Builder handed to a pass's setup callback.
///
/// Thin facade over the render graph bound to one pass: every read or write
/// it records becomes a DAG edge between that pass and a resource version.

use std::sync::Arc;
use glam::Vec4;
use crate::graphics_device::{
    Buffer, BufferDesc, LoadOp, ResourceAccessFlags, Texture, TextureDesc, ALL_SUB_RESOURCE,
};
use super::render_graph::RenderGraph;
use super::render_graph_handle::RgHandle;
use super::render_graph_pass::PassType;

/// Shader stage selecting the default access of a Graphics pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RgBuilderFlag {
    /// Vertex and pixel stages
    #[default]
    None,
    ShaderStagePs,
    ShaderStageNonPs,
}

/// Declares the resources of one pass
pub struct RenderGraphBuilder<'a> {
    graph: &'a mut RenderGraph,
    pass: u32,
}

impl<'a> RenderGraphBuilder<'a> {
    pub(crate) fn new(graph: &'a mut RenderGraph, pass: u32) -> Self {
        Self { graph, pass }
    }

    pub fn pass_type(&self) -> PassType {
        self.graph.pass_type(self.pass)
    }

    /// Pin the pass so culling never removes it
    pub fn skip_culling(&mut self) {
        self.graph.mark_pass_target(self.pass);
    }

    // ===== RESOURCES =====

    /// New graph-managed texture, realized at compile time
    pub fn create_texture(&mut self, desc: &TextureDesc, name: &str) -> RgHandle {
        self.graph.create_texture(desc, name)
    }

    /// New graph-managed buffer, realized at compile time
    pub fn create_buffer(&mut self, desc: &BufferDesc, name: &str) -> RgHandle {
        self.graph.create_buffer(desc, name)
    }

    pub fn import_texture(&mut self, texture: Arc<dyn Texture>, state: ResourceAccessFlags) -> RgHandle {
        self.graph.import_texture(texture, state)
    }

    pub fn import_buffer(&mut self, buffer: Arc<dyn Buffer>, state: ResourceAccessFlags) -> RgHandle {
        self.graph.import_buffer(buffer, state)
    }

    // ===== ACCESS =====

    /// Read one subresource with an explicit access
    pub fn read(&mut self, input: RgHandle, usage: ResourceAccessFlags, subresource: u32) -> RgHandle {
        assert!(
            usage.intersects(ResourceAccessFlags::READ_MASK),
            "read() with non-read access {}", usage
        );
        assert!(subresource != ALL_SUB_RESOURCE, "read() of all subresources is not supported");
        self.graph.read(self.pass, input, usage, subresource)
    }

    /// Write one subresource with an explicit access; returns the new version
    pub fn write(&mut self, input: RgHandle, usage: ResourceAccessFlags, subresource: u32) -> RgHandle {
        assert!(
            usage.intersects(ResourceAccessFlags::WRITE_MASK),
            "write() with non-write access {}", usage
        );
        assert!(subresource != ALL_SUB_RESOURCE, "write() of all subresources is not supported");
        self.graph.write(self.pass, input, usage, subresource)
    }

    /// Read with the access implied by the pass type
    pub fn read_default(&mut self, input: RgHandle, subresource: u32, flag: RgBuilderFlag) -> RgHandle {
        let usage = match self.pass_type() {
            PassType::Graphics => match flag {
                RgBuilderFlag::ShaderStagePs => ResourceAccessFlags::PIXEL_SHADER_READ,
                RgBuilderFlag::ShaderStageNonPs => ResourceAccessFlags::VERTEX_SHADER_READ,
                RgBuilderFlag::None => {
                    ResourceAccessFlags::PIXEL_SHADER_READ | ResourceAccessFlags::VERTEX_SHADER_READ
                }
            },
            PassType::Compute | PassType::AsyncCompute => ResourceAccessFlags::COMPUTE_SHADER_READ,
            PassType::Copy => ResourceAccessFlags::TRANSFER_SRC,
        };
        self.read(input, usage, subresource)
    }

    /// Write with the access implied by the pass type
    pub fn write_default(&mut self, input: RgHandle, subresource: u32, flag: RgBuilderFlag) -> RgHandle {
        let usage = match self.pass_type() {
            PassType::Graphics => match flag {
                RgBuilderFlag::ShaderStagePs => ResourceAccessFlags::PIXEL_SHADER_STORAGE,
                RgBuilderFlag::ShaderStageNonPs => ResourceAccessFlags::VERTEX_SHADER_STORAGE,
                RgBuilderFlag::None => {
                    ResourceAccessFlags::PIXEL_SHADER_STORAGE | ResourceAccessFlags::VERTEX_SHADER_STORAGE
                }
            },
            PassType::Compute | PassType::AsyncCompute => {
                ResourceAccessFlags::COMPUTE_SHADER_STORAGE | ResourceAccessFlags::STORAGE_CLEAR
            }
            PassType::Copy => ResourceAccessFlags::TRANSFER_DST,
        };
        self.write(input, usage, subresource)
    }

    // ===== ATTACHMENTS =====

    /// Render into color slot `color_index`, clearing to opaque black
    pub fn write_color(&mut self, color_index: u32, input: RgHandle, subresource: u32, load_op: LoadOp) -> RgHandle {
        self.write_color_with_clear(color_index, input, subresource, load_op, Vec4::new(0.0, 0.0, 0.0, 1.0))
    }

    pub fn write_color_with_clear(
        &mut self,
        color_index: u32,
        input: RgHandle,
        subresource: u32,
        load_op: LoadOp,
        clear_color: Vec4,
    ) -> RgHandle {
        self.assert_graphics("write_color");
        self.graph.write_color(self.pass, color_index, input, subresource, load_op, clear_color)
    }

    /// Depth-only attachment; stencil is not loaded
    pub fn write_depth(&mut self, input: RgHandle, subresource: u32, depth_load_op: LoadOp, clear_depth: f32) -> RgHandle {
        self.write_depth_stencil(input, subresource, depth_load_op, LoadOp::DontCare, clear_depth, 0)
    }

    pub fn write_depth_stencil(
        &mut self,
        input: RgHandle,
        subresource: u32,
        depth_load_op: LoadOp,
        stencil_load_op: LoadOp,
        clear_depth: f32,
        clear_stencil: u32,
    ) -> RgHandle {
        self.assert_graphics("write_depth");
        self.graph.write_depth(
            self.pass,
            input,
            subresource,
            depth_load_op,
            stencil_load_op,
            clear_depth,
            clear_stencil,
        )
    }

    /// Read-only depth attachment (depth test without writes)
    pub fn read_depth(&mut self, input: RgHandle, subresource: u32) -> RgHandle {
        self.assert_graphics("read_depth");
        self.graph.read_depth(self.pass, input, subresource)
    }

    fn assert_graphics(&self, call: &str) {
        assert!(
            self.pass_type() == PassType::Graphics,
            "{}() requires a Graphics pass", call
        );
    }
}

#[cfg(test)]
#[path = "render_graph_builder_tests.rs"]
mod tests;
