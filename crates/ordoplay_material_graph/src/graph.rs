// SPDX-License-Identifier: MIT OR Apache-2.0
//! Expression graph: the arena owning a material's or a function's nodes.

use crate::connection::Connection;
use crate::cycle::contains_input_loop;
use crate::function::FunctionLibrary;
use crate::node::{Expression, ExpressionKind, Node, NodeId};
use crate::port::InputSlot;
use crate::value_type::{ComponentMask, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A graph of expression nodes
///
/// Edges live on the consuming inputs as `(node, output)` pairs, so removing
/// a node never invalidates other nodes: links to it simply stop resolving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionGraph {
    /// Nodes in insertion order
    nodes: IndexMap<NodeId, Node>,
    /// Next id handed out by [`ExpressionGraph::add_node`]
    #[serde(default)]
    next_id: u32,
}

impl ExpressionGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, expression: impl Into<ExpressionKind>) -> NodeId {
        self.insert(Node::new(NodeId(0), expression.into()))
    }

    /// Add a node carrying a description, used in place of its caption in diagnostics
    pub fn add_node_with_desc(
        &mut self,
        expression: impl Into<ExpressionKind>,
        desc: impl Into<String>,
    ) -> NodeId {
        let mut node = Node::new(NodeId(0), expression.into());
        node.desc = desc.into();
        self.insert(node)
    }

    fn insert(&mut self, mut node: Node) -> NodeId {
        while self.nodes.contains_key(&NodeId(self.next_id)) {
            self.next_id += 1;
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        node.id = id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node; inputs that read it are left dangling and resolve to unconnected
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.nodes.shift_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get a node's expression
    pub fn expression(&self, node_id: NodeId) -> Option<&ExpressionKind> {
        self.nodes.get(&node_id).map(|node| &node.expression)
    }

    /// Get a node's expression mutably
    pub fn expression_mut(&mut self, node_id: NodeId) -> Option<&mut ExpressionKind> {
        self.nodes.get_mut(&node_id).map(|node| &mut node.expression)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all nodes mutably
    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Connect `producer`'s output to `consumer`'s input after validating both
    /// ends and their value types.
    ///
    /// Loops are not rejected here; compilation reports them.
    pub fn connect(
        &mut self,
        functions: &FunctionLibrary,
        producer: NodeId,
        output_index: usize,
        consumer: NodeId,
        input_index: usize,
    ) -> Result<(), ConnectionError> {
        let cx = GraphContext::new(self, functions);
        let source = self
            .node(producer)
            .ok_or(ConnectionError::NodeNotFound(producer))?;
        let target = self
            .node(consumer)
            .ok_or(ConnectionError::NodeNotFound(consumer))?;

        let outputs = source.expression.outputs(&cx);
        let output = outputs
            .get(output_index)
            .ok_or(ConnectionError::OutputNotFound {
                node: producer,
                index: output_index,
            })?;
        if target.expression.input(input_index).is_none() {
            return Err(ConnectionError::InputNotFound {
                node: consumer,
                index: input_index,
            });
        }

        let input_type = target.expression.input_type(&cx, input_index);
        let output_type = source.expression.output_type(&cx, output_index);
        if !input_type.can_connect(output_type) {
            return Err(ConnectionError::IncompatibleTypes {
                input: input_type,
                output: output_type,
            });
        }

        let mask = output.mask;
        if let Some(slot) = self
            .expression_mut(consumer)
            .and_then(|expression| expression.input_mut(input_index))
        {
            slot.connect(producer, output_index, mask);
        }
        Ok(())
    }

    /// Break the link feeding an input
    pub fn disconnect(&mut self, consumer: NodeId, input_index: usize) -> Option<Connection> {
        self.expression_mut(consumer)?
            .input_mut(input_index)?
            .disconnect()
    }

    /// Override the channel mask of a connected input
    pub fn set_input_mask(
        &mut self,
        functions: &FunctionLibrary,
        consumer: NodeId,
        input_index: usize,
        mask: ComponentMask,
    ) -> Result<(), ConnectionError> {
        let cx = GraphContext::new(self, functions);
        let target = self
            .node(consumer)
            .ok_or(ConnectionError::NodeNotFound(consumer))?;
        let slot = target
            .expression
            .input(input_index)
            .ok_or(ConnectionError::InputNotFound {
                node: consumer,
                index: input_index,
            })?;
        let (producer, connection) = cx.resolve(slot).ok_or(ConnectionError::InputNotFound {
            node: consumer,
            index: input_index,
        })?;
        let output_mask = producer
            .expression
            .outputs(&cx)
            .get(connection.output_index)
            .map(|output| output.mask)
            .unwrap_or_default();
        if !output_mask.is_empty() && !output_mask.contains(mask) {
            return Err(ConnectionError::MaskNotSubset { mask, output_mask });
        }

        if let Some(Some(connection)) = self
            .expression_mut(consumer)
            .and_then(|expression| expression.input_mut(input_index))
            .map(|slot| slot.connection.as_mut())
        {
            connection.mask = mask;
        }
        Ok(())
    }

    /// Every `(consumer, input index)` whose input reads `producer`
    pub fn consumers_of(&self, producer: NodeId) -> Vec<(NodeId, usize)> {
        let mut consumers = Vec::new();
        for node in self.nodes.values() {
            for (index, slot) in node.expression.inputs().into_iter().enumerate() {
                if slot.connection.is_some_and(|c| c.involves_node(producer)) {
                    consumers.push((node.id, index));
                }
            }
        }
        consumers
    }

    /// Clear links whose producer no longer exists. Returns how many were cleared.
    pub fn prune_dangling_connections(&mut self) -> usize {
        let live: Vec<NodeId> = self.nodes.keys().copied().collect();
        let mut pruned = 0;
        for node in self.nodes.values_mut() {
            for slot in node.expression.inputs_mut() {
                if slot.connection.is_some_and(|c| !live.contains(&c.node)) {
                    slot.connection = None;
                    pruned += 1;
                }
            }
        }
        pruned
    }
}

/// Read-only view used by structural queries (types, captions, attribute checks).
///
/// Call nodes need the function library to describe their inputs and outputs,
/// so the graph is always paired with one.
#[derive(Clone, Copy)]
pub struct GraphContext<'a> {
    /// Graph the queried nodes live in
    pub graph: &'a ExpressionGraph,
    /// Functions call nodes may reference
    pub functions: &'a FunctionLibrary,
}

impl<'a> GraphContext<'a> {
    /// Create a new context
    pub fn new(graph: &'a ExpressionGraph, functions: &'a FunctionLibrary) -> Self {
        Self { graph, functions }
    }

    /// Same library, different graph
    pub fn with_graph(&self, graph: &'a ExpressionGraph) -> Self {
        Self {
            graph,
            functions: self.functions,
        }
    }

    /// Resolve an input to its producer node, treating dangling links as unconnected
    pub fn resolve(&self, slot: &InputSlot) -> Option<(&'a Node, Connection)> {
        let connection = slot.connection?;
        self.graph
            .node(connection.node)
            .map(|node| (node, connection))
    }

    /// Whether the input reads a producer that exists
    pub fn is_connected(&self, slot: &InputSlot) -> bool {
        self.resolve(slot).is_some()
    }

    /// Declared type of the output an input reads
    pub fn source_type(&self, slot: &InputSlot) -> Option<ValueType> {
        self.resolve(slot)
            .map(|(node, connection)| node.expression.output_type(self, connection.output_index))
    }

    /// Whether an input carries the attribute bus.
    ///
    /// Answers false for unconnected inputs and for producers sitting on a loop.
    pub fn feeds_material_attributes(&self, slot: &InputSlot) -> bool {
        let Some((node, connection)) = self.resolve(slot) else {
            return false;
        };
        if contains_input_loop(self.graph, node.id) {
            return false;
        }
        node.expression
            .is_result_material_attributes(self, connection.output_index)
    }
}

/// Error when creating a connection
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Output index out of range
    #[error("Node {node} has no output {index}")]
    OutputNotFound {
        /// Producer node
        node: NodeId,
        /// Requested output
        index: usize,
    },

    /// Input index out of range
    #[error("Node {node} has no input {index}")]
    InputNotFound {
        /// Consumer node
        node: NodeId,
        /// Requested input
        index: usize,
    },

    /// Value types cannot be connected
    #[error("Cannot connect a {} output to a {} input", .output.describe(), .input.describe())]
    IncompatibleTypes {
        /// Type the input accepts
        input: ValueType,
        /// Type the output produces
        output: ValueType,
    },

    /// Input mask selects channels the output does not expose
    #[error("Input mask {mask:?} is not a subset of output mask {output_mask:?}")]
    MaskNotSubset {
        /// Requested input mask
        mask: ComponentMask,
        /// Mask of the output being read
        output_mask: ComponentMask,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Arithmetic, Constant, ConstantVector, TextureObject, TextureSample, UnaryMath};

    #[test]
    fn test_add_and_remove_nodes() {
        let mut graph = ExpressionGraph::new();
        let a = graph.add_node(Constant::new(1.0));
        let b = graph.add_node(Constant::new(2.0));
        assert_ne!(a, b);
        assert_eq!(graph.node_count(), 2);

        assert!(graph.remove_node(a).is_some());
        assert!(graph.node(a).is_none());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_connect_validates_types() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let texture = graph.add_node(TextureObject::default());
        let constant = graph.add_node(Constant::new(1.0));
        let abs = graph.add_node(UnaryMath::abs());

        let result = graph.connect(&functions, texture, 0, abs, 0);
        assert!(matches!(result, Err(ConnectionError::IncompatibleTypes { .. })));

        graph.connect(&functions, constant, 0, abs, 0).unwrap();
        let cx = GraphContext::new(&graph, &functions);
        let slot = graph.expression(abs).unwrap().input(0).unwrap();
        assert!(cx.is_connected(slot));
    }

    #[test]
    fn test_connect_rejects_bad_indices() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let constant = graph.add_node(Constant::new(1.0));
        let add = graph.add_node(Arithmetic::add());

        assert_eq!(
            graph.connect(&functions, constant, 3, add, 0),
            Err(ConnectionError::OutputNotFound { node: constant, index: 3 })
        );
        assert_eq!(
            graph.connect(&functions, constant, 0, add, 7),
            Err(ConnectionError::InputNotFound { node: add, index: 7 })
        );
        assert_eq!(
            graph.connect(&functions, NodeId(99), 0, add, 0),
            Err(ConnectionError::NodeNotFound(NodeId(99)))
        );
    }

    #[test]
    fn test_connect_inherits_output_mask() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let sample = graph.add_node(TextureSample::default());
        let abs = graph.add_node(UnaryMath::abs());

        // Output 1 is the red channel.
        graph.connect(&functions, sample, 1, abs, 0).unwrap();
        let connection = graph.expression(abs).unwrap().input(0).unwrap().connection.unwrap();
        assert_eq!(connection.mask, ComponentMask::R);

        let result = graph.set_input_mask(&functions, abs, 0, ComponentMask::G);
        assert!(matches!(result, Err(ConnectionError::MaskNotSubset { .. })));
    }

    #[test]
    fn test_dangling_connection_resolves_to_unconnected() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let value = graph.add_node(ConstantVector::vec3([1.0, 0.0, 0.0]));
        let abs = graph.add_node(UnaryMath::abs());
        graph.connect(&functions, value, 0, abs, 0).unwrap();

        graph.remove_node(value);
        let cx = GraphContext::new(&graph, &functions);
        let slot = graph.expression(abs).unwrap().input(0).unwrap();
        assert!(slot.has_link());
        assert!(!cx.is_connected(slot));

        assert_eq!(graph.prune_dangling_connections(), 1);
        assert!(!graph.expression(abs).unwrap().input(0).unwrap().has_link());
    }

    #[test]
    fn test_consumers_of() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let constant = graph.add_node(Constant::new(1.0));
        let add = graph.add_node(Arithmetic::add());
        graph.connect(&functions, constant, 0, add, 0).unwrap();
        graph.connect(&functions, constant, 0, add, 1).unwrap();

        assert_eq!(graph.consumers_of(constant), vec![(add, 0), (add, 1)]);
    }
}
