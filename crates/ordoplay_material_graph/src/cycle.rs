// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop detection over input links.
//!
//! Walks are keyed by `(node, output index)`: reaching one node through two
//! different outputs is not a loop.

use crate::graph::ExpressionGraph;
use crate::node::{Expression, NodeId};
use std::collections::HashSet;

/// Producer key visited by the walk
type ExpressionKey = (NodeId, usize);

/// Check whether any input of `node`, followed transitively, loops back onto
/// the current walk path.
///
/// Callers recursing through pass-through nodes treat `true` as "cannot tell"
/// and stop recursing.
pub fn contains_input_loop(graph: &ExpressionGraph, node: NodeId) -> bool {
    let mut path = Vec::new();
    let mut visited = HashSet::new();
    walk(graph, node, &mut path, &mut visited)
}

fn walk(
    graph: &ExpressionGraph,
    node_id: NodeId,
    path: &mut Vec<ExpressionKey>,
    visited: &mut HashSet<ExpressionKey>,
) -> bool {
    let Some(node) = graph.node(node_id) else {
        return false;
    };

    for slot in node.expression.inputs() {
        let Some(connection) = slot.connection else {
            continue;
        };
        if graph.node(connection.node).is_none() {
            continue;
        }

        let key = (connection.node, connection.output_index);
        if path.contains(&key) {
            return true;
        }
        if visited.insert(key) {
            path.push(key);
            if walk(graph, connection.node, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Arithmetic, Constant, UnaryMath};
    use crate::port::InputSlot;

    #[test]
    fn test_acyclic_chain() {
        let mut graph = ExpressionGraph::new();
        let constant = graph.add_node(Constant::new(1.0));
        let abs = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(constant, 0)));
        let floor = graph.add_node(UnaryMath::floor().with_input(InputSlot::from_output(abs, 0)));

        assert!(!contains_input_loop(&graph, floor));
        assert!(!contains_input_loop(&graph, constant));
    }

    #[test]
    fn test_diamond_is_not_a_loop() {
        let mut graph = ExpressionGraph::new();
        let source = graph.add_node(Constant::new(1.0));
        let left = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(source, 0)));
        let right = graph.add_node(UnaryMath::floor().with_input(InputSlot::from_output(source, 0)));
        let join = graph.add_node(
            Arithmetic::add()
                .with_a(InputSlot::from_output(left, 0))
                .with_b(InputSlot::from_output(right, 0)),
        );

        assert!(!contains_input_loop(&graph, join));
    }

    #[test]
    fn test_self_loop() {
        let mut graph = ExpressionGraph::new();
        let abs = graph.add_node(UnaryMath::abs());
        graph
            .expression_mut(abs)
            .unwrap()
            .input_mut(0)
            .unwrap()
            .connection = InputSlot::from_output(abs, 0).connection;

        assert!(contains_input_loop(&graph, abs));
    }

    #[test]
    fn test_transitive_loop() {
        let mut graph = ExpressionGraph::new();
        let first = graph.add_node(UnaryMath::abs());
        let second = graph.add_node(UnaryMath::floor().with_input(InputSlot::from_output(first, 0)));
        let third = graph.add_node(Arithmetic::add().with_a(InputSlot::from_output(second, 0)));
        *graph.expression_mut(first).unwrap().input_mut(0).unwrap() = InputSlot::from_output(third, 0);

        assert!(contains_input_loop(&graph, first));
        assert!(contains_input_loop(&graph, third));
    }

    #[test]
    fn test_loop_upstream_of_start() {
        let mut graph = ExpressionGraph::new();
        let looped = graph.add_node(UnaryMath::abs());
        *graph.expression_mut(looped).unwrap().input_mut(0).unwrap() = InputSlot::from_output(looped, 0);
        let consumer = graph.add_node(UnaryMath::floor().with_input(InputSlot::from_output(looped, 0)));

        assert!(contains_input_loop(&graph, consumer));
    }
}
