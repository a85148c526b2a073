/// Tests for DirectedAcyclicGraph
///
/// These tests validate node/edge registration, edge queries, culling of
/// dead chains and the DOT export.

use super::*;

/// a -> b -> c, with c as the only target
fn chain() -> DirectedAcyclicGraph<&'static str, u32> {
    let mut graph = DirectedAcyclicGraph::new();
    let a = graph.add_node("a");
    let b = graph.add_node("b");
    let c = graph.add_node("c");
    graph.add_edge(a, b, 1);
    graph.add_edge(b, c, 2);
    graph
}

// ============================================================================
// Tests: Registration
// ============================================================================

#[test]
fn test_node_ids_follow_creation_order() {
    let mut graph: DirectedAcyclicGraph<(), ()> = DirectedAcyclicGraph::new();
    assert_eq!(graph.add_node(()), 0);
    assert_eq!(graph.add_node(()), 1);
    assert_eq!(graph.add_node(()), 2);
    assert_eq!(graph.node_count(), 3);
}

#[test]
fn test_edge_queries() {
    let graph = chain();
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.outgoing_edges(0), vec![0]);
    assert_eq!(graph.incoming_edges(1), vec![0]);
    assert_eq!(graph.outgoing_edges(1), vec![1]);
    assert!(graph.incoming_edges(0).is_empty());
    assert_eq!(*graph.edge(1).data(), 2);
    assert_eq!(graph.find_edge(1, 2), Some(1));
    assert_eq!(graph.find_edge(2, 1), None);
}

#[test]
#[should_panic]
fn test_edge_to_missing_node_panics() {
    let mut graph: DirectedAcyclicGraph<(), ()> = DirectedAcyclicGraph::new();
    let a = graph.add_node(());
    graph.add_edge(a, 7, ());
}

// ============================================================================
// Tests: Culling
// ============================================================================

#[test]
fn test_cull_without_target_removes_everything() {
    let mut graph = chain();
    graph.cull();
    assert!(graph.is_culled(0));
    assert!(graph.is_culled(1));
    assert!(graph.is_culled(2));
}

#[test]
fn test_cull_keeps_target_dependencies() {
    let mut graph = chain();
    graph.mark_target(2);
    graph.cull();
    assert!(!graph.is_culled(0));
    assert!(!graph.is_culled(1));
    assert!(!graph.is_culled(2));
    assert!(graph.node(2).is_target());
    assert!(graph.is_edge_valid(0));
}

#[test]
fn test_cull_removes_dead_branch_only() {
    // a -> b -> c (target), a -> d -> e (dead)
    let mut graph = chain();
    let d = graph.add_node("d");
    let e = graph.add_node("e");
    graph.add_edge(0, d, 3);
    graph.add_edge(d, e, 4);
    graph.mark_target(2);

    graph.cull();

    assert!(!graph.is_culled(0));
    assert!(graph.is_culled(d));
    assert!(graph.is_culled(e));
    assert_eq!(graph.node(0).ref_count(), 1);
    assert!(!graph.is_edge_valid(2));
}

#[test]
fn test_cull_is_repeatable() {
    let mut graph = chain();
    graph.mark_target(2);
    graph.cull();
    graph.cull();
    assert!(!graph.is_culled(0));
    assert_eq!(graph.node(1).ref_count(), 1);
}

#[test]
fn test_target_in_the_middle_keeps_upstream() {
    let mut graph = chain();
    graph.mark_target(1);
    graph.cull();
    assert!(!graph.is_culled(0));
    assert!(!graph.is_culled(1));
    assert!(graph.is_culled(2));
}

// ============================================================================
// Tests: Clear / Export
// ============================================================================

#[test]
fn test_clear() {
    let mut graph = chain();
    graph.clear();
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn test_export_graphviz() {
    let mut graph = chain();
    graph.cull();
    let dot = graph.export_graphviz(
        |node| format!("label = \"{}\"", node.data()),
        |edge| edge.data().to_string(),
    );
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("N0 [label = \"a\", style = dashed]"));
    assert!(dot.contains("N1 -> N2 [label = \"2\"]"));
    assert!(dot.trim_end().ends_with('}'));
}
