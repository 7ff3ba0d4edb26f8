// SPDX-License-Identifier: MIT OR Apache-2.0
//! Input and output slots of expression nodes.

use crate::connection::Connection;
use crate::node::NodeId;
use crate::value_type::ComponentMask;
use serde::{Deserialize, Serialize};

/// An input slot: either unconnected or reading a producer output.
///
/// Literal fallbacks for unconnected inputs live on the owning expression,
/// next to the slot they back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSlot {
    /// Producer this input reads, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
}

impl InputSlot {
    /// Create an unconnected input
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// Create an input reading output `output_index` of `node`
    pub fn from_output(node: NodeId, output_index: usize) -> Self {
        Self {
            connection: Some(Connection::new(node, output_index)),
        }
    }

    /// Whether a link is stored; the producer may still be missing from the graph
    pub fn has_link(&self) -> bool {
        self.connection.is_some()
    }

    /// Point this input at a producer output, inheriting the output mask
    pub fn connect(&mut self, node: NodeId, output_index: usize, mask: ComponentMask) {
        self.connection = Some(Connection::new(node, output_index).with_mask(mask));
    }

    /// Break the link, returning the old connection
    pub fn disconnect(&mut self) -> Option<Connection> {
        self.connection.take()
    }
}

impl From<Connection> for InputSlot {
    fn from(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }
}

/// An output slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputSlot {
    /// Output name, empty for a node's single unnamed output
    pub name: String,
    /// Channels this output exposes; empty for the full value
    pub mask: ComponentMask,
}

impl OutputSlot {
    /// Create a named output exposing the full value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mask: ComponentMask::empty(),
        }
    }

    /// Create a named output exposing some channels
    pub fn masked(name: impl Into<String>, mask: ComponentMask) -> Self {
        Self {
            name: name.into(),
            mask,
        }
    }
}

/// Output list of a color-like value: the full value, then each channel
pub fn channel_outputs(full_mask: ComponentMask) -> Vec<OutputSlot> {
    vec![
        OutputSlot::masked("", full_mask),
        OutputSlot::masked("R", ComponentMask::R),
        OutputSlot::masked("G", ComponentMask::G),
        OutputSlot::masked("B", ComponentMask::B),
        OutputSlot::masked("A", ComponentMask::A),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_inherits_mask() {
        let mut slot = InputSlot::new();
        assert!(!slot.has_link());

        slot.connect(NodeId(3), 1, ComponentMask::R);
        let connection = slot.connection.unwrap();
        assert_eq!(connection.node, NodeId(3));
        assert_eq!(connection.output_index, 1);
        assert_eq!(connection.mask, ComponentMask::R);

        assert_eq!(slot.disconnect(), Some(connection));
        assert!(!slot.has_link());
    }

    #[test]
    fn test_channel_outputs() {
        let outputs = channel_outputs(ComponentMask::RGB);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0].mask, ComponentMask::RGB);
        assert_eq!(outputs[4].name, "A");
        assert_eq!(outputs[4].mask, ComponentMask::A);
    }
}
