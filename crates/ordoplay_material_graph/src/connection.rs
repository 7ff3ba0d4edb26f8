// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the expression graph.
//!
//! Edges are stored on the consuming side as a weak `(node, output)` pair.
//! A connection whose producer has been removed resolves to "unconnected".

use crate::node::NodeId;
use crate::value_type::ComponentMask;
use serde::{Deserialize, Serialize};

/// Back-reference from an input to the producer output it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Producer node
    pub node: NodeId,
    /// Output index on the producer
    pub output_index: usize,
    /// Channel selection, inherited from the output and overridable
    #[serde(default)]
    pub mask: ComponentMask,
}

impl Connection {
    /// Create a connection reading every channel of an output
    pub fn new(node: NodeId, output_index: usize) -> Self {
        Self {
            node,
            output_index,
            mask: ComponentMask::empty(),
        }
    }

    /// Set the channel mask
    pub fn with_mask(mut self, mask: ComponentMask) -> Self {
        self.mask = mask;
        self
    }

    /// Check if this connection reads from a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.node == node_id
    }
}
