/// Render graph - a DAG describing how a frame is rendered.
///
/// Passes declare the resources they read and write through a
/// `RenderGraphBuilder`. `compile()` then culls the work no presented output
/// depends on, synchronizes async compute runs with the graphics queue,
/// places transient resources in aliased heap memory and derives every
/// barrier. `execute()` replays the surviving passes into command lists.
///
/// A graph is rebuilt every frame: `clear()` retires the resources of the
/// previous frame to the allocator and empties the graph.

use std::sync::Arc;
use glam::Vec4;
use crate::config::RenderGraphContext;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, CommandList, Fence, LoadOp, ResourceAccessFlags, Texture, TextureDesc,
    MAX_COLOR_ATTACHMENTS,
};
use crate::log::Logger;
use crate::{engine_debug, engine_err, engine_trace};
use super::directed_acyclic_graph::NodeId;
use super::pass_action::{PassAction, PassCallback, PassContext};
use super::render_graph_builder::RenderGraphBuilder;
use super::render_graph_handle::RgHandle;
use super::render_graph_nodes_edges::{RenderGraphDag, RenderGraphEdge, RenderGraphNode, ResourceNode};
use super::render_graph_pass::{AsyncResolveContext, PassExecuteContext, PassType, RenderGraphPass};
use super::render_graph_resource::{RenderGraphResource, RgBuffer, RgTexture};
use super::resource_allocator::ResourceAllocator;

const SOURCE: &str = "galaxy3d::RenderGraph";

/// Output resource and the state it must be left in
struct PresentTarget {
    resource: u32,
    state: ResourceAccessFlags,
}

/// Frame render graph
pub struct RenderGraph {
    logger: Arc<dyn Logger>,
    dag: RenderGraphDag,
    passes: Vec<RenderGraphPass>,
    resources: Vec<RenderGraphResource>,
    /// DAG node of every resource version, indexed by `RgHandle::node`
    resource_nodes: Vec<NodeId>,
    allocator: ResourceAllocator,
    outputs: Vec<PresentTarget>,
    compute_fence: Arc<dyn Fence>,
    compute_fence_value: u64,
    graphics_fence: Arc<dyn Fence>,
    graphics_fence_value: u64,
}

impl RenderGraph {
    /// Create an empty graph and its cross-queue fences
    pub fn new(context: &RenderGraphContext) -> Result<Self> {
        let logger = context.logger.clone();
        let (compute_fence, graphics_fence) = {
            let mut device = context.device.lock()
                .map_err(|_| engine_err!(logger, SOURCE, "GraphicsDevice lock poisoned"))?;
            (
                device.create_fence(&context.config.compute_fence_name)?,
                device.create_fence(&context.config.graphics_fence_name)?,
            )
        };
        engine_debug!(logger, SOURCE, "Created queue fences '{}' and '{}'",
            compute_fence.name(), graphics_fence.name());

        Ok(Self {
            logger,
            dag: RenderGraphDag::new(),
            passes: Vec::new(),
            resources: Vec::new(),
            resource_nodes: Vec::new(),
            allocator: ResourceAllocator::new(context),
            outputs: Vec::new(),
            compute_fence,
            compute_fence_value: 0,
            graphics_fence,
            graphics_fence_value: 0,
        })
    }

    // ===== PASSES =====

    /// Declare a pass
    ///
    /// `setup` runs immediately: it declares the pass's resources through the
    /// builder and fills `D`, which is returned so later passes can consume
    /// its handles. `execute` runs during `execute()` if the pass survives
    /// culling.
    pub fn add_pass<D, S, E>(&mut self, name: &str, pass_type: PassType, setup: S, execute: E) -> D
    where
        D: Default + Clone + Send + Sync + 'static,
        S: FnOnce(&mut D, &mut RenderGraphBuilder),
        E: FnMut(&D, &mut PassContext) -> Result<()> + Send + Sync + 'static,
    {
        let index = self.register_pass(name, pass_type);
        let mut data = D::default();
        {
            let mut builder = RenderGraphBuilder::new(self, index);
            setup(&mut data, &mut builder);
        }
        self.passes[index as usize].action = Some(Box::new(PassCallback::new(data.clone(), execute)));
        data
    }

    /// Declare a pass recording through a ready-made action
    pub fn add_pass_with_action<S, A>(&mut self, name: &str, pass_type: PassType, setup: S, action: A)
    where
        S: FnOnce(&mut RenderGraphBuilder),
        A: PassAction + 'static,
    {
        let index = self.register_pass(name, pass_type);
        {
            let mut builder = RenderGraphBuilder::new(self, index);
            setup(&mut builder);
        }
        self.passes[index as usize].action = Some(Box::new(action));
    }

    fn register_pass(&mut self, name: &str, pass_type: PassType) -> u32 {
        let index = self.passes.len() as u32;
        let node = self.dag.add_node(RenderGraphNode::Pass(index));
        self.passes.push(RenderGraphPass::new(name, pass_type, node));
        index
    }

    // ===== RESOURCES =====

    pub(crate) fn create_texture(&mut self, desc: &TextureDesc, name: &str) -> RgHandle {
        self.add_resource(RenderGraphResource::Texture(RgTexture::new(name, desc)))
    }

    pub(crate) fn create_buffer(&mut self, desc: &BufferDesc, name: &str) -> RgHandle {
        self.add_resource(RenderGraphResource::Buffer(RgBuffer::new(name, desc)))
    }

    /// Wrap an externally owned texture currently in `state`
    pub fn import_texture(&mut self, texture: Arc<dyn Texture>, state: ResourceAccessFlags) -> RgHandle {
        self.add_resource(RenderGraphResource::Texture(RgTexture::import(texture, state)))
    }

    /// Wrap an externally owned buffer currently in `state`
    pub fn import_buffer(&mut self, buffer: Arc<dyn Buffer>, state: ResourceAccessFlags) -> RgHandle {
        self.add_resource(RenderGraphResource::Buffer(RgBuffer::import(buffer, state)))
    }

    fn add_resource(&mut self, resource: RenderGraphResource) -> RgHandle {
        let index = self.resources.len() as u32;
        self.resources.push(resource);
        let node = self.dag.add_node(RenderGraphNode::Resource(ResourceNode {
            resource: index,
            version: 0,
        }));
        self.push_resource_node(index, node)
    }

    fn push_resource_node(&mut self, resource: u32, node: NodeId) -> RgHandle {
        let handle = RgHandle {
            resource,
            node: self.resource_nodes.len() as u32,
        };
        self.resource_nodes.push(node);
        handle
    }

    fn resource_node(&self, handle: RgHandle) -> NodeId {
        assert!(
            handle.is_valid()
                && (handle.resource as usize) < self.resources.len()
                && (handle.node as usize) < self.resource_nodes.len(),
            "Invalid render graph handle {:?}", handle
        );
        self.resource_nodes[handle.node as usize]
    }

    // ===== EDGES =====

    pub(crate) fn pass_type(&self, pass: u32) -> PassType {
        self.passes[pass as usize].pass_type()
    }

    pub(crate) fn mark_pass_target(&mut self, pass: u32) {
        let node = self.passes[pass as usize].node();
        self.dag.mark_target(node);
    }

    pub(crate) fn read(&mut self, pass: u32, input: RgHandle, usage: ResourceAccessFlags, subresource: u32) -> RgHandle {
        let input_node = self.resource_node(input);
        let pass_node = self.passes[pass as usize].node();
        self.dag.add_edge(input_node, pass_node, RenderGraphEdge::new(usage, subresource));
        input
    }

    pub(crate) fn write(&mut self, pass: u32, input: RgHandle, usage: ResourceAccessFlags, subresource: u32) -> RgHandle {
        self.write_edge(pass, input, RenderGraphEdge::new(usage, subresource))
    }

    pub(crate) fn write_color(
        &mut self,
        pass: u32,
        color_index: u32,
        input: RgHandle,
        subresource: u32,
        load_op: LoadOp,
        clear_color: Vec4,
    ) -> RgHandle {
        assert!(
            (color_index as usize) < MAX_COLOR_ATTACHMENTS,
            "Color attachment index {} out of range", color_index
        );
        self.assert_texture(input);
        self.write_edge(pass, input, RenderGraphEdge::color(subresource, color_index, load_op, clear_color))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn write_depth(
        &mut self,
        pass: u32,
        input: RgHandle,
        subresource: u32,
        depth_load_op: LoadOp,
        stencil_load_op: LoadOp,
        clear_depth: f32,
        clear_stencil: u32,
    ) -> RgHandle {
        self.assert_texture(input);
        let edge = RenderGraphEdge::depth(
            ResourceAccessFlags::DEPTH_STENCIL_STORAGE,
            subresource,
            depth_load_op,
            stencil_load_op,
            clear_depth,
            clear_stencil,
        );
        self.write_edge(pass, input, edge)
    }

    pub(crate) fn read_depth(&mut self, pass: u32, input: RgHandle, subresource: u32) -> RgHandle {
        self.assert_texture(input);
        let edge = RenderGraphEdge::depth(
            ResourceAccessFlags::DEPTH_STENCIL_READ,
            subresource,
            LoadOp::Load,
            LoadOp::Load,
            0.0,
            0,
        );
        self.write_edge(pass, input, edge)
    }

    /// Edge into the pass, new version, edge out of the pass
    fn write_edge(&mut self, pass: u32, input: RgHandle, edge: RenderGraphEdge) -> RgHandle {
        let input_node = self.resource_node(input);
        let version = self.dag.node(input_node).data().as_resource().map_or(0, |node| node.version);
        let pass_node = self.passes[pass as usize].node();

        self.dag.add_edge(input_node, pass_node, edge);
        let output_node = self.dag.add_node(RenderGraphNode::Resource(ResourceNode {
            resource: input.resource,
            version: version + 1,
        }));
        self.dag.add_edge(pass_node, output_node, edge);

        self.push_resource_node(input.resource, output_node)
    }

    fn assert_texture(&self, handle: RgHandle) {
        self.resource_node(handle);
        assert!(
            self.resources[handle.resource as usize].as_texture().is_some(),
            "Attachment '{}' is not a texture", self.resources[handle.resource as usize].name()
        );
    }

    /// Keep `handle`'s version alive and leave the resource in `final_state`
    /// at the end of `execute()`
    pub fn present(&mut self, handle: RgHandle, final_state: ResourceAccessFlags) {
        let node = self.resource_node(handle);
        self.resources[handle.resource as usize].set_output(true);
        self.dag.mark_target(node);
        self.outputs.push(PresentTarget {
            resource: handle.resource,
            state: final_state,
        });
    }

    // ===== COMPILE =====

    /// Cull, resolve async compute, realize resources and derive barriers
    pub fn compile(&mut self) -> Result<()> {
        self.dag.cull();

        let mut async_context = AsyncResolveContext::default();
        for index in 0..self.passes.len() {
            if !self.passes[index].is_culled(&self.dag) {
                async_context.visit(index, &mut self.passes, &self.dag);
            }
        }
        async_context.flush(&mut self.passes, &self.dag);

        for &node in &self.resource_nodes {
            if self.dag.is_culled(node) {
                continue;
            }
            let Some(resource_node) = self.dag.node(node).data().as_resource() else {
                continue;
            };
            let resource = &mut self.resources[resource_node.resource as usize];

            for edge_id in self.dag.outgoing_edges(node) {
                let edge = self.dag.edge(edge_id);
                resolve_usage(resource, &self.passes, &self.dag, edge.to(), edge.data().usage);
            }
            for edge_id in self.dag.incoming_edges(node) {
                let edge = self.dag.edge(edge_id);
                resolve_usage(resource, &self.passes, &self.dag, edge.from(), edge.data().usage);
            }
        }

        for resource in &mut self.resources {
            if resource.is_used() {
                resource.realize(&mut self.allocator)?;
            }
        }

        for pass in &mut self.passes {
            if !pass.is_culled(&self.dag) {
                pass.resolve_barriers(&self.dag, &self.resources, &mut self.allocator);
            }
        }

        self.log_compile_summary();
        Ok(())
    }

    fn log_compile_summary(&self) {
        for pass in &self.passes {
            if pass.wait_value().is_some() || pass.signal_value().is_some() {
                engine_trace!(self.logger, SOURCE, "Pass '{}' ({:?}): wait {:?}, signal {:?}",
                    pass.name(), pass.pass_type(), pass.wait_value(), pass.signal_value());
            }
        }

        let culled_passes = self.passes.iter().filter(|p| p.is_culled(&self.dag)).count();
        let culled_nodes = self.resource_nodes.iter().filter(|&&n| self.dag.is_culled(n)).count();
        let barriers: usize = self.passes.iter()
            .map(|p| p.barriers().len() + p.discard_barriers().len())
            .sum();
        engine_debug!(self.logger, SOURCE,
            "Compiled {} pass(es) ({} culled), {} resource version(s) ({} culled), {} barrier(s)",
            self.passes.len(), culled_passes, self.resource_nodes.len(), culled_nodes, barriers);
    }

    // ===== EXECUTE =====

    /// Record every pass, then move outputs to their presented state
    ///
    /// Async compute passes record into `compute`, all others into
    /// `graphics`. Output transitions are recorded on `graphics`.
    pub fn execute(&mut self, graphics: &mut dyn CommandList, compute: &mut dyn CommandList) -> Result<()> {
        let mut context = PassExecuteContext {
            graphics_command_list: &mut *graphics,
            compute_command_list: &mut *compute,
            graphics_fence: &self.graphics_fence,
            compute_fence: &self.compute_fence,
            initial_graphics_value: self.graphics_fence_value,
            initial_compute_value: self.compute_fence_value,
            last_signaled_graphics_value: self.graphics_fence_value,
            last_signaled_compute_value: self.compute_fence_value,
        };

        for pass in &mut self.passes {
            pass.execute(&self.dag, &self.resources, &mut self.allocator, &mut context)?;
        }

        let graphics_value = context.last_signaled_graphics_value;
        let compute_value = context.last_signaled_compute_value;
        self.graphics_fence_value = graphics_value;
        self.compute_fence_value = compute_value;

        for target in std::mem::take(&mut self.outputs) {
            let resource = &mut self.resources[target.resource as usize];
            if resource.gpu_resource().is_none() {
                continue;
            }
            let current = if resource.is_used() {
                resource.final_state()
            } else {
                resource.initial_state()
            };
            if current != target.state {
                resource.barrier(graphics, 0, current, target.state)?;
                resource.set_final_state(target.state);
            }
        }
        Ok(())
    }

    // ===== FRAME RESET =====

    /// Retire this frame's resources and empty the graph
    pub fn clear(&mut self) -> Result<()> {
        for resource in &self.resources {
            resource.finalize(&mut self.allocator)?;
        }

        self.dag.clear();
        self.passes.clear();
        self.resource_nodes.clear();
        self.resources.clear();
        self.outputs.clear();

        self.allocator.reset()
    }

    // ===== INTROSPECTION =====

    pub fn dag(&self) -> &RenderGraphDag {
        &self.dag
    }

    pub fn passes(&self) -> &[RenderGraphPass] {
        &self.passes
    }

    /// First pass named `name`
    pub fn pass(&self, name: &str) -> Option<&RenderGraphPass> {
        self.passes.iter().find(|p| p.name() == name)
    }

    pub fn resources(&self) -> &[RenderGraphResource] {
        &self.resources
    }

    pub fn resource(&self, handle: RgHandle) -> &RenderGraphResource {
        self.resource_node(handle);
        &self.resources[handle.resource as usize]
    }

    /// Texture behind `handle` (panics on a buffer handle)
    pub fn texture(&self, handle: RgHandle) -> &RgTexture {
        match self.resource(handle).as_texture() {
            Some(texture) => texture,
            None => panic!("Handle {:?} is not a texture", handle),
        }
    }

    /// Buffer behind `handle` (panics on a texture handle)
    pub fn buffer(&self, handle: RgHandle) -> &RgBuffer {
        match self.resource(handle).as_buffer() {
            Some(buffer) => buffer,
            None => panic!("Handle {:?} is not a buffer", handle),
        }
    }

    pub fn resource_allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    /// Mutable allocator access, for descriptor views outside pass callbacks
    pub fn resource_allocator_mut(&mut self) -> &mut ResourceAllocator {
        &mut self.allocator
    }

    pub fn graphics_fence(&self) -> &Arc<dyn Fence> {
        &self.graphics_fence
    }

    pub fn compute_fence(&self) -> &Arc<dyn Fence> {
        &self.compute_fence
    }

    /// Last value signaled on the graphics fence by a previous `execute()`
    pub fn graphics_fence_value(&self) -> u64 {
        self.graphics_fence_value
    }

    /// Last value signaled on the compute fence by a previous `execute()`
    pub fn compute_fence_value(&self) -> u64 {
        self.compute_fence_value
    }

    /// DOT description of the DAG
    ///
    /// Passes are boxes, resource versions ellipses labelled `name v<n>`,
    /// culled nodes dashed and edges labelled with their access flags.
    pub fn export_graphviz(&self) -> String {
        self.dag.export_graphviz(
            |node| match node.data() {
                RenderGraphNode::Pass(index) => {
                    let pass = &self.passes[*index as usize];
                    format!("label = \"{}\\n{:?}\", shape = box", pass.name(), pass.pass_type())
                }
                RenderGraphNode::Resource(resource) => format!(
                    "label = \"{} v{}\", shape = ellipse",
                    self.resources[resource.resource as usize].name(),
                    resource.version
                ),
            },
            |edge| edge.data().to_string(),
        )
    }
}

/// Account one edge of a resource version, if its pass survived culling
fn resolve_usage(
    resource: &mut RenderGraphResource,
    passes: &[RenderGraphPass],
    dag: &RenderGraphDag,
    pass_node: NodeId,
    usage: ResourceAccessFlags,
) {
    if dag.is_culled(pass_node) {
        return;
    }
    let Some(index) = dag.node(pass_node).data().as_pass() else {
        return;
    };
    let pass = &passes[index as usize];
    resource.resolve(
        usage,
        pass_node,
        pass.pass_type(),
        pass.wait_graphics_pass(),
        pass.signal_graphics_pass(),
    );
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
