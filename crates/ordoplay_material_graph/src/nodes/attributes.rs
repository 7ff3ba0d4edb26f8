// SPDX-License-Identifier: MIT OR Apache-2.0
//! Aggregate and break nodes for the attribute bus.
//!
//! A bus value is never compiled whole. Readers compile the producer once
//! per channel, passing the channel index as the multiplex index, and the
//! aggregate node answers with that channel's input.

use crate::compiler::CodeResult;
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::{InputSlot, OutputSlot};
use crate::property::{property_from_index, MaterialProperty, ATTRIBUTE_CHANNELS, MATERIAL_PROPERTY_COUNT};
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};

/// Compile one channel of the bus read through `slot`.
///
/// An unconnected bus yields the channel default; a connected producer that
/// does not carry the bus is rejected.
pub(crate) fn compile_attribute_channel(
    ctx: &mut CompileContext<'_>,
    slot: &InputSlot,
    property: MaterialProperty,
) -> CodeResult {
    if !ctx.is_connected(slot) {
        return property.compile_default(ctx.compiler());
    }
    if !ctx.graph_context().feeds_material_attributes(slot) {
        return Err(ctx.error("Cannot connect a non MaterialAttributes node to a MaterialAttributes pin."));
    }
    ctx.compile_input_multiplexed(slot, Some(property.index()))
}

/// Builds the attribute bus from one input per channel.
///
/// An unconnected channel carries that channel's default value, so a partially
/// filled bus is still valid. Only a connected channel that fails is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeMaterialAttributes {
    /// One input per channel, in bus order
    #[serde(default)]
    pub channels: [InputSlot; MATERIAL_PROPERTY_COUNT],
}

impl MakeMaterialAttributes {
    /// Connect one channel
    pub fn with_channel(mut self, property: MaterialProperty, slot: InputSlot) -> Self {
        self.channels[property.index()] = slot;
        self
    }

    /// Input feeding a channel
    pub fn channel(&self, property: MaterialProperty) -> &InputSlot {
        &self.channels[property.index()]
    }
}

impl Expression for MakeMaterialAttributes {
    /// Compiles the channel selected by `multiplex`. An unconnected channel
    /// yields its default so partially filled busses stay valid.
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let Some(property) = multiplex.and_then(property_from_index) else {
            return Err(ctx.error(match multiplex {
                Some(index) => format!("Invalid material attribute channel {index}"),
                None => "Material attributes must be read one channel at a time".to_string(),
            }));
        };

        let slot = self.channel(property);
        if !ctx.is_connected(slot) {
            return property.compile_default(ctx.compiler());
        }
        ctx.compile_input(slot).map_err(|error| {
            ctx.error(format!("Error on property {}", property.name()));
            error
        })
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["MakeMaterialAttributes".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        self.channels.iter().collect()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        self.channels.iter_mut().collect()
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        property_from_index(index)
            .map(MaterialProperty::name)
            .unwrap_or_default()
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, _: usize) -> bool {
        false
    }

    fn input_type(&self, _: &GraphContext<'_>, index: usize) -> ValueType {
        property_from_index(index).map_or(ValueType::FLOAT, MaterialProperty::value_type)
    }

    fn is_result_material_attributes(&self, _: &GraphContext<'_>, _: usize) -> bool {
        true
    }
}

/// Splits the attribute bus into one output per channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakMaterialAttributes {
    /// The bus
    #[serde(default)]
    pub attributes: InputSlot,
}

impl BreakMaterialAttributes {
    /// Create a break node reading `attributes`
    pub fn new(attributes: InputSlot) -> Self {
        Self { attributes }
    }
}

impl Expression for BreakMaterialAttributes {
    /// Compiles output `k` by asking the bus for channel `k`; the incoming
    /// multiplex index is ignored.
    fn compile(&self, ctx: &mut CompileContext<'_>, output_index: usize, _: Option<usize>) -> CodeResult {
        let Some(property) = property_from_index(output_index) else {
            return Err(ctx.error(format!("Invalid material attribute channel {output_index}")));
        };
        compile_attribute_channel(ctx, &self.attributes, property)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["BreakMaterialAttributes".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.attributes]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.attributes]
    }

    fn input_name(&self, _: &GraphContext<'_>, _: usize) -> String {
        "Attr".to_string()
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::MATERIAL_ATTRIBUTES
    }

    fn outputs(&self, _: &GraphContext<'_>) -> Vec<OutputSlot> {
        ATTRIBUTE_CHANNELS
            .iter()
            .map(|property| OutputSlot::new(property.name()))
            .collect()
    }

    fn output_type(&self, _: &GraphContext<'_>, index: usize) -> ValueType {
        property_from_index(index).map_or(ValueType::FLOAT, MaterialProperty::value_type)
    }
}
