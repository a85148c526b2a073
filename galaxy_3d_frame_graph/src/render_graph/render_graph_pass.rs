/// Render graph passes.
///
/// A pass is one unit of GPU work declared against the graph. After
/// `compile()` it holds the barriers to record before its callback, the
/// attachments of its render pass, and the cross-queue fence values it must
/// wait for or signal when async compute is involved.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    decompose_subresource, ColorAttachment, CommandList, DepthAttachment, Fence, GpuResource,
    RenderPassDesc, ResourceAccessFlags, StoreOp, Texture, ALL_SUB_RESOURCE, MAX_COLOR_ATTACHMENTS,
};
use super::directed_acyclic_graph::{EdgeId, NodeId};
use super::pass_action::{PassAction, PassContext};
use super::render_graph_nodes_edges::{EdgeAttachment, RenderGraphDag};
use super::render_graph_resource::RenderGraphResource;
use super::resource_allocator::ResourceAllocator;

/// Queue and kind of work a pass records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    Graphics,
    Compute,
    /// Runs on the async compute queue
    AsyncCompute,
    Copy,
}

/// State transition recorded before a pass runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceBarrier {
    /// Index in the graph's resource list
    pub resource: u32,
    pub subresource: u32,
    pub old_state: ResourceAccessFlags,
    pub new_state: ResourceAccessFlags,
}

/// Hands heap memory over from its previous occupant
#[derive(Debug, Clone)]
pub struct AliasDiscardBarrier {
    pub resource: GpuResource,
    pub access_before: ResourceAccessFlags,
    pub access_after: ResourceAccessFlags,
}

/// A pass registered in a render graph
pub struct RenderGraphPass {
    name: String,
    pass_type: PassType,
    node: NodeId,
    resource_barriers: Vec<ResourceBarrier>,
    discard_barriers: Vec<AliasDiscardBarrier>,
    color_attachments: [Option<EdgeId>; MAX_COLOR_ATTACHMENTS],
    depth_attachment: Option<EdgeId>,
    wait_graphics_pass: Option<NodeId>,
    signal_graphics_pass: Option<NodeId>,
    wait_value: Option<u64>,
    signal_value: Option<u64>,
    pub(crate) action: Option<Box<dyn PassAction>>,
}

impl RenderGraphPass {
    pub(crate) fn new(name: &str, pass_type: PassType, node: NodeId) -> Self {
        Self {
            name: name.to_string(),
            pass_type,
            node,
            resource_barriers: Vec::new(),
            discard_barriers: Vec::new(),
            color_attachments: [None; MAX_COLOR_ATTACHMENTS],
            depth_attachment: None,
            wait_graphics_pass: None,
            signal_graphics_pass: None,
            wait_value: None,
            signal_value: None,
            action: None,
        }
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    /// DAG node of the pass (also its position in execution order)
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Transitions recorded before the pass callback
    pub fn barriers(&self) -> &[ResourceBarrier] {
        &self.resource_barriers
    }

    pub fn discard_barriers(&self) -> &[AliasDiscardBarrier] {
        &self.discard_barriers
    }

    /// Cross-queue fence value waited on before the pass (frame-local)
    pub fn wait_value(&self) -> Option<u64> {
        self.wait_value
    }

    /// Fence value signaled after the pass (frame-local)
    pub fn signal_value(&self) -> Option<u64> {
        self.signal_value
    }

    /// Async compute only: graphics pass this pass runs after
    pub fn wait_graphics_pass(&self) -> Option<NodeId> {
        self.wait_graphics_pass
    }

    /// Async compute only: graphics pass waiting on this pass's run
    pub fn signal_graphics_pass(&self) -> Option<NodeId> {
        self.signal_graphics_pass
    }

    pub fn is_culled(&self, dag: &RenderGraphDag) -> bool {
        dag.is_culled(self.node)
    }

    pub fn has_render_pass(&self) -> bool {
        self.depth_attachment.is_some() || self.color_attachments.iter().any(Option::is_some)
    }

    // ===== BARRIER RESOLUTION =====

    /// Derive the barriers of this pass from its DAG edges
    ///
    /// For every resource the pass consumes, the state before the pass is the
    /// usage of the nearest surviving earlier pass on the same subresource,
    /// else the usage that produced this version, else the resource's initial
    /// state. A resource entering a freshly aliased heap slot also discards
    /// the previous occupant of that memory.
    pub(crate) fn resolve_barriers(
        &mut self,
        dag: &RenderGraphDag,
        resources: &[RenderGraphResource],
        allocator: &mut ResourceAllocator,
    ) {
        for edge_id in dag.incoming_edges(self.node) {
            let edge = dag.edge(edge_id);
            let resource_node_id = edge.from();
            let Some(resource_node) = dag.node(resource_node_id).data().as_resource() else {
                continue;
            };
            let resource = &resources[resource_node.resource as usize];
            let new_state = edge.data().usage;
            let subresource = edge.data().subresource;

            let previous_use = dag.outgoing_edges(resource_node_id)
                .into_iter()
                .rev()
                .map(|id| dag.edge(id))
                .find(|e| {
                    e.data().subresource == subresource
                        && e.to() < self.node
                        && !dag.is_culled(e.to())
                });

            let mut old_state = match previous_use {
                Some(previous) => previous.data().usage,
                None => match dag.incoming_edges(resource_node_id).first() {
                    Some(&producer) => dag.edge(producer).data().usage,
                    None => resource.initial_state(),
                },
            };

            let mut aliased = false;
            if resource.is_overlapping() && resource.first_access_pass() == self.node {
                if let Some((previous, alias_state)) = resource.aliased_prev_resource(allocator) {
                    self.discard_barriers.push(AliasDiscardBarrier {
                        resource: previous,
                        access_before: alias_state,
                        access_after: new_state | ResourceAccessFlags::DISCARD,
                    });
                    old_state |= alias_state | ResourceAccessFlags::DISCARD;
                    aliased = true;
                }
            }

            if old_state != new_state || aliased {
                self.resource_barriers.push(ResourceBarrier {
                    resource: resource_node.resource,
                    subresource,
                    old_state,
                    new_state,
                });
            }
        }

        for edge_id in dag.outgoing_edges(self.node) {
            let edge = dag.edge(edge_id).data();
            if edge.usage == ResourceAccessFlags::RENDER_TARGET {
                match edge.attachment {
                    EdgeAttachment::Color(color) => {
                        self.color_attachments[color.index as usize] = Some(edge_id);
                    }
                    _ => panic!("Pass '{}': RENDER_TARGET write is not a color attachment", self.name),
                }
            } else if edge.usage == ResourceAccessFlags::DEPTH_STENCIL_STORAGE
                || edge.usage == ResourceAccessFlags::DEPTH_STENCIL_READ
            {
                assert!(
                    matches!(edge.attachment, EdgeAttachment::Depth(_)),
                    "Pass '{}': depth access is not a depth attachment", self.name
                );
                self.depth_attachment = Some(edge_id);
            }
        }
    }

    // ===== EXECUTION =====

    /// Record the pass into the command list of its queue
    pub(crate) fn execute(
        &mut self,
        dag: &RenderGraphDag,
        resources: &[RenderGraphResource],
        allocator: &mut ResourceAllocator,
        context: &mut PassExecuteContext<'_>,
    ) -> Result<()> {
        let is_async = self.pass_type == PassType::AsyncCompute;
        let command_list: &mut dyn CommandList = if is_async {
            &mut *context.compute_command_list
        } else {
            &mut *context.graphics_command_list
        };

        if let Some(wait) = self.wait_value {
            command_list.end()?;
            command_list.submit()?;
            command_list.begin()?;
            if is_async {
                command_list.wait(context.graphics_fence, context.initial_graphics_value + wait)?;
            } else {
                command_list.wait(context.compute_fence, context.initial_compute_value + wait)?;
            }
        }

        if !dag.is_culled(self.node) {
            self.begin(dag, resources, command_list)?;
            if let Some(action) = &mut self.action {
                let mut pass_context = PassContext::new(&mut *command_list, resources, allocator, &self.name);
                action.execute(&mut pass_context)?;
            }
            if self.has_render_pass() {
                command_list.end_render_pass()?;
            }
        }

        if let Some(signal) = self.signal_value {
            command_list.end()?;
            if is_async {
                let value = context.initial_compute_value + signal;
                command_list.signal(context.compute_fence, value)?;
                context.last_signaled_compute_value = value;
            } else {
                let value = context.initial_graphics_value + signal;
                command_list.signal(context.graphics_fence, value)?;
                context.last_signaled_graphics_value = value;
            }
            command_list.submit()?;
            command_list.begin()?;
        }
        Ok(())
    }

    fn begin(
        &self,
        dag: &RenderGraphDag,
        resources: &[RenderGraphResource],
        command_list: &mut dyn CommandList,
    ) -> Result<()> {
        for barrier in &self.discard_barriers {
            match &barrier.resource {
                GpuResource::Texture(texture) => command_list.texture_barrier(
                    texture.as_ref(),
                    ALL_SUB_RESOURCE,
                    barrier.access_before,
                    barrier.access_after,
                )?,
                GpuResource::Buffer(buffer) => command_list.buffer_barrier(
                    buffer.as_ref(),
                    barrier.access_before,
                    barrier.access_after,
                )?,
            }
        }

        for barrier in &self.resource_barriers {
            resources[barrier.resource as usize].barrier(
                command_list,
                barrier.subresource,
                barrier.old_state,
                barrier.new_state,
            )?;
        }

        if self.has_render_pass() {
            let desc = self.render_pass_desc(dag, resources)?;
            command_list.begin_render_pass(&desc)?;
        }
        Ok(())
    }

    fn render_pass_desc(&self, dag: &RenderGraphDag, resources: &[RenderGraphResource]) -> Result<RenderPassDesc> {
        let mut desc = RenderPassDesc::default();

        for (slot, edge_id) in self.color_attachments.iter().enumerate() {
            let Some(edge_id) = *edge_id else { continue };
            let edge = dag.edge(edge_id);
            let EdgeAttachment::Color(color) = edge.data().attachment else { continue };
            let texture = self.attachment_texture(dag, resources, edge.to())?;
            let (mip_slice, array_slice) = decompose_subresource(texture.desc(), edge.data().subresource);

            desc.color[slot] = Some(ColorAttachment {
                texture,
                mip_slice,
                array_slice,
                load_op: color.load_op,
                store_op: store_op(dag, edge.to()),
                clear_color: color.clear_color.to_array(),
            });
        }

        if let Some(edge_id) = self.depth_attachment {
            let edge = dag.edge(edge_id);
            if let EdgeAttachment::Depth(depth) = edge.data().attachment {
                let texture = self.attachment_texture(dag, resources, edge.to())?;
                let (mip_slice, array_slice) = decompose_subresource(texture.desc(), edge.data().subresource);

                desc.depth = Some(DepthAttachment {
                    texture,
                    mip_slice,
                    array_slice,
                    load_op: depth.depth_load_op,
                    store_op: store_op(dag, edge.to()),
                    stencil_load_op: depth.stencil_load_op,
                    stencil_store_op: store_op(dag, edge.to()),
                    clear_depth: depth.clear_depth,
                    clear_stencil: depth.clear_stencil,
                    read_only: depth.read_only,
                });
            }
        }
        Ok(desc)
    }

    fn attachment_texture(
        &self,
        dag: &RenderGraphDag,
        resources: &[RenderGraphResource],
        node: NodeId,
    ) -> Result<Arc<dyn Texture>> {
        let texture = dag.node(node).data()
            .as_resource()
            .and_then(|n| resources[n.resource as usize].as_texture())
            .and_then(|t| t.texture());
        match texture {
            Some(texture) => Ok(texture.clone()),
            None => Err(Error::InvalidResource(format!(
                "Pass '{}': attachment texture is not realized", self.name
            ))),
        }
    }
}

/// Contents of a culled version are never read back
fn store_op(dag: &RenderGraphDag, node: NodeId) -> StoreOp {
    if dag.is_culled(node) {
        StoreOp::DontCare
    } else {
        StoreOp::Store
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Command lists and fences shared by every pass of one `execute()`
pub(crate) struct PassExecuteContext<'a> {
    pub graphics_command_list: &'a mut dyn CommandList,
    pub compute_command_list: &'a mut dyn CommandList,
    pub graphics_fence: &'a Arc<dyn Fence>,
    pub compute_fence: &'a Arc<dyn Fence>,
    pub initial_graphics_value: u64,
    pub initial_compute_value: u64,
    pub last_signaled_graphics_value: u64,
    pub last_signaled_compute_value: u64,
}

// ============================================================================
// Async compute resolution
// ============================================================================

/// Running state of the async compute resolution of one `compile()`
///
/// Passes are visited in declaration order. Consecutive async compute passes
/// form a run; the run waits for the latest graphics pass producing one of
/// its inputs and unblocks the earliest graphics pass consuming one of its
/// outputs. Fence values are local to the frame and start at 1.
#[derive(Debug, Default)]
pub(crate) struct AsyncResolveContext {
    /// Pass indices of the current run
    compute_passes: Vec<usize>,
    pre_graphics_passes: Vec<NodeId>,
    post_graphics_passes: Vec<NodeId>,
    compute_fence: u64,
    graphics_fence: u64,
}

impl AsyncResolveContext {
    /// Visit one surviving pass
    pub(crate) fn visit(&mut self, index: usize, passes: &mut [RenderGraphPass], dag: &RenderGraphDag) {
        if passes[index].pass_type != PassType::AsyncCompute {
            self.flush(passes, dag);
            return;
        }

        let node = passes[index].node;
        for edge_id in dag.incoming_edges(node) {
            let resource_node = dag.edge(edge_id).from();
            if let Some(&producer) = dag.incoming_edges(resource_node).first() {
                let producer = dag.edge(producer).from();
                if is_queue_graphics(producer, passes, dag) {
                    self.pre_graphics_passes.push(producer);
                }
            }
        }

        for edge_id in dag.outgoing_edges(node) {
            let resource_node = dag.edge(edge_id).to();
            for consumer in dag.outgoing_edges(resource_node) {
                let consumer = dag.edge(consumer).to();
                if is_queue_graphics(consumer, passes, dag) {
                    self.post_graphics_passes.push(consumer);
                }
            }
        }

        self.compute_passes.push(index);
    }

    /// Close the current run, assigning its fence values
    pub(crate) fn flush(&mut self, passes: &mut [RenderGraphPass], dag: &RenderGraphDag) {
        let (Some(&first), Some(&last)) = (self.compute_passes.first(), self.compute_passes.last()) else {
            return;
        };

        if let Some(&wait_node) = self.pre_graphics_passes.iter().max() {
            if let Some(graphics) = pass_index(wait_node, dag) {
                let value = match passes[graphics].signal_value {
                    Some(value) => value,
                    None => {
                        self.graphics_fence += 1;
                        passes[graphics].signal_value = Some(self.graphics_fence);
                        self.graphics_fence
                    }
                };
                passes[first].wait_value = Some(value);
                for &compute in &self.compute_passes {
                    passes[compute].wait_graphics_pass = Some(wait_node);
                }
            }
        }

        if let Some(&signal_node) = self.post_graphics_passes.iter().min() {
            if let Some(graphics) = pass_index(signal_node, dag) {
                let value = match passes[last].signal_value {
                    Some(value) => value,
                    None => {
                        self.compute_fence += 1;
                        passes[last].signal_value = Some(self.compute_fence);
                        self.compute_fence
                    }
                };
                passes[graphics].wait_value = Some(value);
                for &compute in &self.compute_passes {
                    passes[compute].signal_graphics_pass = Some(signal_node);
                }
            }
        }

        self.compute_passes.clear();
        self.pre_graphics_passes.clear();
        self.post_graphics_passes.clear();
    }
}

fn pass_index(node: NodeId, dag: &RenderGraphDag) -> Option<usize> {
    dag.node(node).data().as_pass().map(|index| index as usize)
}

/// Surviving pass recorded on the graphics queue
fn is_queue_graphics(node: NodeId, passes: &[RenderGraphPass], dag: &RenderGraphDag) -> bool {
    !dag.is_culled(node)
        && pass_index(node, dag).is_some_and(|index| passes[index].pass_type != PassType::AsyncCompute)
}

#[cfg(test)]
#[path = "render_graph_pass_tests.rs"]
mod tests;
