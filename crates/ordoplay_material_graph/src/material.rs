// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material root: the graph plus the inputs that feed each attribute channel.

use crate::compiler::{Code, CodeResult, MaterialCompiler};
use crate::context::CompileContext;
use crate::function::{self, FunctionId, FunctionLibrary};
use crate::graph::ExpressionGraph;
use crate::node::NodeId;
use crate::nodes::attributes::compile_attribute_channel;
use crate::port::InputSlot;
use crate::property::{MaterialProperty, ATTRIBUTE_CHANNELS, MATERIAL_PROPERTY_COUNT};
use crate::settings::{load_ron, save_ron, LoadError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_properties() -> Vec<InputSlot> {
    vec![InputSlot::new(); MATERIAL_PROPERTY_COUNT]
}

/// A material document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// Display name
    pub name: String,
    /// Expression graph
    #[serde(default)]
    pub graph: ExpressionGraph,
    /// Read every channel from [`Material::attributes`] instead of [`Material::properties`]
    #[serde(default)]
    pub use_material_attributes: bool,
    /// Attribute bus root
    #[serde(default)]
    pub attributes: InputSlot,
    /// One root input per channel, in bus order
    #[serde(default = "default_properties")]
    pub properties: Vec<InputSlot>,
}

impl Material {
    /// Create an empty material
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: ExpressionGraph::new(),
            use_material_attributes: false,
            attributes: InputSlot::new(),
            properties: default_properties(),
        }
    }

    /// Root input of a channel
    pub fn property_input(&self, property: MaterialProperty) -> Option<&InputSlot> {
        self.properties.get(property.index())
    }

    /// Connect the root input of a channel
    pub fn set_property_input(&mut self, property: MaterialProperty, slot: InputSlot) {
        if self.properties.len() < MATERIAL_PROPERTY_COUNT {
            self.properties.resize(MATERIAL_PROPERTY_COUNT, InputSlot::new());
        }
        self.properties[property.index()] = slot;
    }

    /// Feed every channel from an attribute bus producer
    pub fn set_attributes_input(&mut self, slot: InputSlot) {
        self.use_material_attributes = true;
        self.attributes = slot;
    }

    /// Point a call node of this material at `target`
    pub fn set_call_target(
        &mut self,
        library: &FunctionLibrary,
        node: NodeId,
        target: Option<FunctionId>,
    ) -> function::Result<()> {
        function::set_call_target(&mut self.graph, library, None, node, target)
    }

    /// Re-match every call node against the current library. Returns how many changed.
    pub fn refresh_calls(&mut self, library: &FunctionLibrary) -> usize {
        function::refresh_graph_calls(&mut self.graph, library)
    }

    /// Load a material from a RON file
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        load_ron(path)
    }

    /// Save the material to a RON file
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        save_ron(self, path)
    }
}

/// Per-channel results of [`compile_material`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialCompileOutput {
    /// Result of every channel, in bus order
    pub channels: Vec<(MaterialProperty, CodeResult)>,
    /// Diagnostics recorded during this compile
    pub diagnostic_count: usize,
}

impl MaterialCompileOutput {
    /// No diagnostic was recorded and every channel produced code
    pub fn succeeded(&self) -> bool {
        self.diagnostic_count == 0 && self.channels.iter().all(|(_, result)| result.is_ok())
    }

    /// Result of one channel
    pub fn channel(&self, property: MaterialProperty) -> Option<CodeResult> {
        self.channels
            .get(property.index())
            .map(|(_, result)| *result)
    }

    /// Channels that produced code
    pub fn compiled(&self) -> Vec<(MaterialProperty, Code)> {
        self.channels
            .iter()
            .filter_map(|(property, result)| result.ok().map(|code| (*property, code)))
            .collect()
    }
}

/// Compile every channel of `material`.
///
/// A failing channel does not stop the others, so one pass reports every
/// independent problem.
pub fn compile_material(
    material: &Material,
    library: &FunctionLibrary,
    compiler: &mut dyn MaterialCompiler,
) -> MaterialCompileOutput {
    let errors_before = compiler.error_count();
    let mut channels = Vec::with_capacity(MATERIAL_PROPERTY_COUNT);
    {
        let mut ctx = CompileContext::new(&mut *compiler, library, &material.graph);
        for property in ATTRIBUTE_CHANNELS {
            let result = if material.use_material_attributes {
                compile_attribute_channel(&mut ctx, &material.attributes, property)
            } else {
                match material.property_input(property) {
                    Some(slot) if ctx.is_connected(slot) => ctx.compile_input(slot),
                    _ => property.compile_default(ctx.compiler()),
                }
            };
            let result =
                result.and_then(|code| ctx.compiler().valid_cast(code, property.value_type()));
            channels.push((property, result));
        }
    }

    let diagnostic_count = compiler.error_count() - errors_before;
    info!(
        material = %material.name,
        channels = channels.len(),
        diagnostics = diagnostic_count,
        "Compiled material"
    );
    MaterialCompileOutput {
        channels,
        diagnostic_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Constant, ConstantVector, MakeMaterialAttributes, UnaryMath};
    use crate::settings::{from_ron, to_ron};
    use crate::translator::HlslTranslator;
    use crate::value_type::ValueType;

    #[test]
    fn test_empty_material_compiles_defaults() {
        let material = Material::new("Empty");
        let library = FunctionLibrary::new();
        let mut translator = HlslTranslator::default();
        let output = compile_material(&material, &library, &mut translator);

        assert!(output.succeeded());
        assert_eq!(output.channels.len(), MATERIAL_PROPERTY_COUNT);
        let roughness = output.channel(MaterialProperty::Roughness).unwrap().unwrap();
        assert_eq!(roughness, translator.constant(0.5).unwrap());
    }

    #[test]
    fn test_channels_are_cast_to_their_type() {
        let mut material = Material::new("Cast");
        let color = material.graph.add_node(ConstantVector::vec4([1.0, 0.0, 0.0, 1.0]));
        material.set_property_input(MaterialProperty::BaseColor, InputSlot::from_output(color, 0));

        let library = FunctionLibrary::new();
        let mut translator = HlslTranslator::default();
        let output = compile_material(&material, &library, &mut translator);
        let base = output.channel(MaterialProperty::BaseColor).unwrap().unwrap();
        assert_eq!(translator.get_type(base), ValueType::FLOAT3);
    }

    #[test]
    fn test_failing_channels_do_not_stop_the_compile() {
        let mut material = Material::new("Broken");
        let abs = material.graph.add_node(UnaryMath::abs());
        let floor = material.graph.add_node(UnaryMath::floor());
        material.set_property_input(MaterialProperty::Metallic, InputSlot::from_output(abs, 0));
        material.set_property_input(MaterialProperty::Roughness, InputSlot::from_output(floor, 0));

        let library = FunctionLibrary::new();
        let mut translator = HlslTranslator::default();
        let output = compile_material(&material, &library, &mut translator);

        assert!(!output.succeeded());
        assert_eq!(output.diagnostic_count, 2);
        assert_eq!(
            translator.diagnostics(),
            ["Abs> Missing Abs input", "Floor> Missing Floor input"]
        );
        assert!(output.channel(MaterialProperty::Specular).unwrap().is_ok());
    }

    #[test]
    fn test_bus_root_reads_each_channel() {
        let mut material = Material::new("Bus");
        let metallic = material.graph.add_node(Constant::new(0.75));
        let make = material.graph.add_node(
            MakeMaterialAttributes::default()
                .with_channel(MaterialProperty::Metallic, InputSlot::from_output(metallic, 0)),
        );
        material.set_attributes_input(InputSlot::from_output(make, 0));

        let library = FunctionLibrary::new();
        let mut translator = HlslTranslator::default();
        let output = compile_material(&material, &library, &mut translator);

        assert!(output.succeeded());
        let code = output.channel(MaterialProperty::Metallic).unwrap().unwrap();
        assert_eq!(code, translator.constant(0.75).unwrap());
    }

    #[test]
    fn test_bus_root_rejects_plain_values() {
        let mut material = Material::new("NotABus");
        let value = material.graph.add_node(Constant::new(1.0));
        material.set_attributes_input(InputSlot::from_output(value, 0));

        let library = FunctionLibrary::new();
        let mut translator = HlslTranslator::default();
        let output = compile_material(&material, &library, &mut translator);
        assert!(!output.succeeded());
        assert_eq!(output.diagnostic_count, MATERIAL_PROPERTY_COUNT);
    }

    #[test]
    fn test_material_ron_roundtrip() {
        let mut material = Material::new("Saved");
        let value = material.graph.add_node(Constant::new(0.25));
        material.set_property_input(MaterialProperty::Opacity, InputSlot::from_output(value, 0));

        let text = to_ron(&material).unwrap();
        let loaded: Material = from_ron(&text).unwrap();
        assert_eq!(loaded.name, "Saved");
        assert_eq!(
            loaded.property_input(MaterialProperty::Opacity),
            Some(&InputSlot::from_output(value, 0))
        );
        assert_eq!(loaded.graph.node_count(), 1);
    }
}
