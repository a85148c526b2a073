//! Frame render graph module
//!
//! A render graph is a directed acyclic graph (DAG) describing how a frame
//! is rendered: which passes execute, which resources they read and write,
//! and in what order. It is rebuilt every frame, compiled (culling, heap
//! aliasing, barriers, async compute fences) and replayed into command lists.

mod directed_acyclic_graph;
mod pass_action;
mod render_graph;
mod render_graph_builder;
mod render_graph_handle;
mod render_graph_nodes_edges;
mod render_graph_pass;
mod render_graph_resource;
mod resource_allocator;

pub use directed_acyclic_graph::{DagEdge, DagNode, DirectedAcyclicGraph, EdgeId, NodeId};
pub use pass_action::{CustomAction, DispatchAction, FullscreenAction, PassAction, PassContext};
pub use render_graph::RenderGraph;
pub use render_graph_builder::{RenderGraphBuilder, RgBuilderFlag};
pub use render_graph_handle::RgHandle;
pub use render_graph_nodes_edges::{
    ColorAttachmentInfo, DepthAttachmentInfo, EdgeAttachment, RenderGraphDag, RenderGraphEdge,
    RenderGraphNode, ResourceNode,
};
pub use render_graph_pass::{AliasDiscardBarrier, PassType, RenderGraphPass, ResourceBarrier};
pub use render_graph_resource::{RenderGraphResource, RgBuffer, RgTexture};
pub use resource_allocator::{
    Allocated, AllocationKey, LifetimeRange, ResourceAllocator, ResourceDesc,
};
