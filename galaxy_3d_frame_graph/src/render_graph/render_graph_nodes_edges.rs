/// Node and edge payloads of the render graph DAG.
///
/// Passes and resource versions share one DAG. Edges always connect a
/// resource node to a pass (read) or a pass to a resource node (write).

use std::fmt;
use glam::Vec4;
use crate::graphics_device::{LoadOp, ResourceAccessFlags};
use super::directed_acyclic_graph::DirectedAcyclicGraph;

/// One version of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    /// Index in the graph's resource list
    pub resource: u32,
    /// 0 for the created/imported state, +1 per write
    pub version: u32,
}

/// Payload of a DAG node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderGraphNode {
    /// Index in the graph's pass list
    Pass(u32),
    Resource(ResourceNode),
}

impl RenderGraphNode {
    pub fn as_pass(&self) -> Option<u32> {
        match self {
            RenderGraphNode::Pass(index) => Some(*index),
            RenderGraphNode::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<ResourceNode> {
        match self {
            RenderGraphNode::Resource(node) => Some(*node),
            RenderGraphNode::Pass(_) => None,
        }
    }
}

/// Color attachment parameters carried by a `write_color` edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentInfo {
    /// Attachment slot (0..MAX_COLOR_ATTACHMENTS)
    pub index: u32,
    pub load_op: LoadOp,
    pub clear_color: Vec4,
}

/// Depth attachment parameters carried by `write_depth`/`read_depth` edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachmentInfo {
    pub depth_load_op: LoadOp,
    pub stencil_load_op: LoadOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
    pub read_only: bool,
}

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EdgeAttachment {
    /// Plain access (shader read/write, copy, ...)
    #[default]
    None,
    Color(ColorAttachmentInfo),
    Depth(DepthAttachmentInfo),
}

/// Payload of a DAG edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderGraphEdge {
    pub usage: ResourceAccessFlags,
    pub subresource: u32,
    pub attachment: EdgeAttachment,
}

impl RenderGraphEdge {
    pub fn new(usage: ResourceAccessFlags, subresource: u32) -> Self {
        Self {
            usage,
            subresource,
            attachment: EdgeAttachment::None,
        }
    }

    pub fn color(
        subresource: u32,
        index: u32,
        load_op: LoadOp,
        clear_color: Vec4,
    ) -> Self {
        Self {
            usage: ResourceAccessFlags::RENDER_TARGET,
            subresource,
            attachment: EdgeAttachment::Color(ColorAttachmentInfo {
                index,
                load_op,
                clear_color,
            }),
        }
    }

    /// Depth attachment edge; read-only when `usage` contains DEPTH_STENCIL_READ
    pub fn depth(
        usage: ResourceAccessFlags,
        subresource: u32,
        depth_load_op: LoadOp,
        stencil_load_op: LoadOp,
        clear_depth: f32,
        clear_stencil: u32,
    ) -> Self {
        Self {
            usage,
            subresource,
            attachment: EdgeAttachment::Depth(DepthAttachmentInfo {
                depth_load_op,
                stencil_load_op,
                clear_depth,
                clear_stencil,
                read_only: usage.intersects(ResourceAccessFlags::DEPTH_STENCIL_READ),
            }),
        }
    }
}

impl fmt::Display for RenderGraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.usage)?;
        if self.subresource != 0 {
            write!(f, " [{}]", self.subresource)?;
        }
        match self.attachment {
            EdgeAttachment::None => Ok(()),
            EdgeAttachment::Color(color) => write!(f, " (color{})", color.index),
            EdgeAttachment::Depth(depth) => {
                write!(f, " (depth{})", if depth.read_only { " ro" } else { "" })
            }
        }
    }
}

/// DAG specialization used by the render graph
pub type RenderGraphDag = DirectedAcyclicGraph<RenderGraphNode, RenderGraphEdge>;

#[cfg(test)]
#[path = "render_graph_nodes_edges_tests.rs"]
mod tests;
