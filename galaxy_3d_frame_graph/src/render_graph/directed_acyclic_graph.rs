/// Directed acyclic graph with reference-counted culling.
///
/// Node ids are assigned in creation order and double as a topological
/// order: callers only ever add edges towards nodes created before or after
/// in a way that keeps the graph acyclic. Nothing here checks for cycles.

use std::fmt::Write;

/// Node identifier (index in creation order)
pub type NodeId = u32;

/// Edge identifier (index in registration order)
pub type EdgeId = usize;

/// Graph node carrying a payload
#[derive(Debug, Clone)]
pub struct DagNode<N> {
    id: NodeId,
    ref_count: u32,
    target: bool,
    data: N,
}

impl<N> DagNode<N> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Outgoing edges still alive after the last `cull()`
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Pinned nodes are never culled
    pub fn is_target(&self) -> bool {
        self.target
    }

    pub fn is_culled(&self) -> bool {
        !self.target && self.ref_count == 0
    }

    pub fn data(&self) -> &N {
        &self.data
    }
}

/// Directed edge carrying a payload
#[derive(Debug, Clone)]
pub struct DagEdge<E> {
    from: NodeId,
    to: NodeId,
    data: E,
}

impl<E> DagEdge<E> {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn data(&self) -> &E {
        &self.data
    }
}

/// Node/edge storage plus dead-node elimination
#[derive(Debug, Clone)]
pub struct DirectedAcyclicGraph<N, E> {
    nodes: Vec<DagNode<N>>,
    edges: Vec<DagEdge<E>>,
}

impl<N, E> Default for DirectedAcyclicGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedAcyclicGraph<N, E> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Register a node; its id is the current node count
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(DagNode {
            id,
            ref_count: 0,
            target: false,
            data,
        });
        id
    }

    /// Register an edge between two existing nodes
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, data: E) -> EdgeId {
        assert!((from as usize) < self.nodes.len(), "Edge source node {} does not exist", from);
        assert!((to as usize) < self.nodes.len(), "Edge target node {} does not exist", to);
        self.edges.push(DagEdge { from, to, data });
        self.edges.len() - 1
    }

    /// Pin a node so culling keeps it (and everything it depends on)
    pub fn mark_target(&mut self, id: NodeId) {
        self.nodes[id as usize].target = true;
    }

    pub fn node(&self, id: NodeId) -> &DagNode<N> {
        &self.nodes[id as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &DagEdge<E> {
        &self.edges[id]
    }

    pub fn nodes(&self) -> &[DagNode<N>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DagEdge<E>] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_culled(&self, id: NodeId) -> bool {
        self.nodes[id as usize].is_culled()
    }

    /// First edge going from `from` to `to`
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edges.iter().position(|e| e.from == from && e.to == to)
    }

    /// Edges ending at `id`, in registration order
    pub fn incoming_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.to == id)
            .map(|(index, _)| index)
            .collect()
    }

    /// Edges starting at `id`, in registration order
    pub fn outgoing_edges(&self, id: NodeId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.from == id)
            .map(|(index, _)| index)
            .collect()
    }

    /// Both endpoints survived culling
    pub fn is_edge_valid(&self, id: EdgeId) -> bool {
        let edge = &self.edges[id];
        !self.is_culled(edge.from) && !self.is_culled(edge.to)
    }

    /// Remove every node that no target depends on
    ///
    /// A node's reference count is its number of outgoing edges. Nodes at 0
    /// are culled; culling a node releases the references it held on the
    /// source nodes of its incoming edges, so whole dead chains go at once.
    /// Counts are recomputed from scratch on every call.
    pub fn cull(&mut self) {
        for node in &mut self.nodes {
            node.ref_count = 0;
        }
        for edge in &self.edges {
            self.nodes[edge.from as usize].ref_count += 1;
        }

        let mut stack: Vec<NodeId> = self.nodes
            .iter()
            .filter(|node| node.is_culled())
            .map(|node| node.id)
            .collect();

        while let Some(id) = stack.pop() {
            for edge_id in self.incoming_edges(id) {
                let from = self.edges[edge_id].from as usize;
                let linked = &mut self.nodes[from];
                if linked.ref_count == 0 {
                    continue;
                }
                linked.ref_count -= 1;
                if linked.is_culled() {
                    stack.push(linked.id);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// DOT description of the graph
    ///
    /// `node_attributes` returns the attribute list of a node (without the
    /// brackets), `edge_label` the label of an edge. Culled nodes are dashed.
    pub fn export_graphviz<NA, EL>(&self, node_attributes: NA, edge_label: EL) -> String
    where
        NA: Fn(&DagNode<N>) -> String,
        EL: Fn(&DagEdge<E>) -> String,
    {
        let mut dot = String::from("digraph {\n");
        dot.push_str("  rankdir = LR\n");
        dot.push_str("  node [fontname = \"helvetica\", fontsize = 10]\n\n");

        for node in &self.nodes {
            let style = if node.is_culled() { ", style = dashed" } else { "" };
            let _ = writeln!(dot, "  N{} [{}{}]", node.id, node_attributes(node), style);
        }

        dot.push('\n');
        for edge in &self.edges {
            let _ = writeln!(
                dot,
                "  N{} -> N{} [label = \"{}\"]",
                edge.from,
                edge.to,
                edge_label(edge)
            );
        }

        dot.push_str("}\n");
        dot
    }
}

#[cfg(test)]
#[path = "directed_acyclic_graph_tests.rs"]
mod tests;
