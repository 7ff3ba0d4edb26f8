// SPDX-License-Identifier: MIT OR Apache-2.0
//! Switches selecting an input by the quality or feature level being compiled.
//!
//! Input 0 is the mandatory `Default`; the rest are one optional input per
//! level, in level order.

use crate::compiler::{CodeResult, FeatureLevel, QualityLevel};
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::InputSlot;
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};

fn compile_level(
    ctx: &mut CompileContext<'_>,
    switch_name: &str,
    default: &InputSlot,
    level_input: Option<&InputSlot>,
    multiplex: Option<usize>,
) -> CodeResult {
    if !ctx.is_connected(default) {
        return Err(ctx.error(format!("{switch_name} switch missing default input")));
    }
    match level_input {
        Some(slot) if ctx.is_connected(slot) => ctx.compile_input_multiplexed(slot, multiplex),
        _ => ctx.compile_input_multiplexed(default, multiplex),
    }
}

/// True as soon as one connected input carries the bus
fn any_input_carries_attributes(cx: &GraphContext<'_>, inputs: Vec<&InputSlot>) -> bool {
    inputs
        .into_iter()
        .any(|slot| cx.feeds_material_attributes(slot))
}

/// Selects an input by [`QualityLevel`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySwitch {
    /// Used for levels without their own connection
    #[serde(default)]
    pub default: InputSlot,
    /// One input per level, in [`QualityLevel::ALL`] order
    #[serde(default)]
    pub levels: [InputSlot; 2],
}

impl QualitySwitch {
    /// Create a switch with only its default connected
    pub fn new(default: InputSlot) -> Self {
        Self {
            default,
            levels: Default::default(),
        }
    }

    /// Connect the input of one level
    pub fn with_level(mut self, level: QualityLevel, slot: InputSlot) -> Self {
        self.levels[level.index()] = slot;
        self
    }
}

impl Expression for QualitySwitch {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let level = ctx.compiler().quality_level();
        let level_input = self.levels.get(level.index());
        compile_level(ctx, "Quality", &self.default, level_input, multiplex)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["Quality Switch".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        std::iter::once(&self.default)
            .chain(self.levels.iter())
            .collect()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        std::iter::once(&mut self.default)
            .chain(self.levels.iter_mut())
            .collect()
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        match index {
            0 => "Default".to_string(),
            i => QualityLevel::ALL
                .get(i - 1)
                .map(|level| level.name().to_string())
                .unwrap_or_default(),
        }
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, index: usize) -> bool {
        index == 0
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::UNKNOWN
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, _: usize) -> bool {
        any_input_carries_attributes(cx, self.inputs())
    }
}

/// Selects an input by [`FeatureLevel`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLevelSwitch {
    /// Used for levels without their own connection
    #[serde(default)]
    pub default: InputSlot,
    /// One input per level, in [`FeatureLevel::ALL`] order
    #[serde(default)]
    pub levels: [InputSlot; 4],
}

impl FeatureLevelSwitch {
    /// Create a switch with only its default connected
    pub fn new(default: InputSlot) -> Self {
        Self {
            default,
            levels: Default::default(),
        }
    }

    /// Connect the input of one level
    pub fn with_level(mut self, level: FeatureLevel, slot: InputSlot) -> Self {
        self.levels[level.index()] = slot;
        self
    }
}

impl Expression for FeatureLevelSwitch {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let level = ctx.compiler().feature_level();
        let level_input = self.levels.get(level.index());
        compile_level(ctx, "Feature Level", &self.default, level_input, multiplex)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["Feature Level Switch".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        std::iter::once(&self.default)
            .chain(self.levels.iter())
            .collect()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        std::iter::once(&mut self.default)
            .chain(self.levels.iter_mut())
            .collect()
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        match index {
            0 => "Default".to_string(),
            i => FeatureLevel::ALL
                .get(i - 1)
                .map(|level| level.name().to_string())
                .unwrap_or_default(),
        }
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, index: usize) -> bool {
        index == 0
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::UNKNOWN
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, _: usize) -> bool {
        any_input_carries_attributes(cx, self.inputs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Code;
    use crate::graph::ExpressionGraph;
    use crate::node::NodeId;
    use crate::nodes::{Constant, MakeMaterialAttributes};
    use crate::settings::CompileSettings;
    use crate::translator::HlslTranslator;

    fn compile_at(quality: QualityLevel, graph: &ExpressionGraph, node: NodeId) -> (HlslTranslator, CodeResult) {
        let functions = FunctionLibrary::new();
        let mut translator = HlslTranslator::new(CompileSettings {
            quality_level: quality,
            ..CompileSettings::default()
        });
        let result = CompileContext::new(&mut translator, &functions, graph).compile_node(node, 0, None);
        (translator, result)
    }

    fn constant_code(quality: QualityLevel, graph: &ExpressionGraph, node: NodeId) -> Code {
        compile_at(quality, graph, node).1.unwrap()
    }

    #[test]
    fn test_default_only_serves_every_level() {
        let mut graph = ExpressionGraph::new();
        let fallback = graph.add_node(Constant::new(0.25));
        let switch = graph.add_node(QualitySwitch::new(InputSlot::from_output(fallback, 0)));

        for level in QualityLevel::ALL {
            let (translator, result) = compile_at(level, &graph, switch);
            assert!(translator.diagnostics().is_empty());
            assert_eq!(result.unwrap(), constant_code(level, &graph, fallback));
        }
    }

    #[test]
    fn test_connected_level_overrides_only_that_level() {
        let mut graph = ExpressionGraph::new();
        let fallback = graph.add_node(Constant::new(0.25));
        let low = graph.add_node(Constant::new(0.75));
        let switch = graph.add_node(
            QualitySwitch::new(InputSlot::from_output(fallback, 0))
                .with_level(QualityLevel::Low, InputSlot::from_output(low, 0)),
        );

        let (_, low_result) = compile_at(QualityLevel::Low, &graph, switch);
        assert_eq!(low_result.unwrap(), constant_code(QualityLevel::Low, &graph, low));

        let (_, high_result) = compile_at(QualityLevel::High, &graph, switch);
        assert_eq!(high_result.unwrap(), constant_code(QualityLevel::High, &graph, fallback));
    }

    #[test]
    fn test_missing_default_is_an_error() {
        let mut graph = ExpressionGraph::new();
        let high = graph.add_node(Constant::new(1.0));
        let switch = graph.add_node(
            QualitySwitch::default().with_level(QualityLevel::High, InputSlot::from_output(high, 0)),
        );
        let (translator, result) = compile_at(QualityLevel::High, &graph, switch);
        assert!(result.is_err());
        assert_eq!(
            translator.diagnostics(),
            ["Quality Switch> Quality switch missing default input"]
        );

        let feature = graph.add_node(FeatureLevelSwitch::default());
        let (translator, _) = compile_at(QualityLevel::High, &graph, feature);
        assert_eq!(
            translator.diagnostics(),
            ["Feature Level Switch> Feature Level switch missing default input"]
        );
    }

    #[test]
    fn test_feature_level_selection() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let fallback = graph.add_node(Constant::new(0.0));
        let mobile = graph.add_node(Constant::new(1.0));
        let switch = graph.add_node(
            FeatureLevelSwitch::new(InputSlot::from_output(fallback, 0))
                .with_level(FeatureLevel::Es2, InputSlot::from_output(mobile, 0)),
        );

        let mut translator = HlslTranslator::new(CompileSettings {
            feature_level: FeatureLevel::Es2,
            ..CompileSettings::default()
        });
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let switched = ctx.compile_node(switch, 0, None).unwrap();
        let expected = ctx.compile_node(mobile, 0, None).unwrap();
        assert_eq!(switched, expected);
    }

    #[test]
    fn test_input_names_and_attribute_result() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let attributes = graph.add_node(MakeMaterialAttributes::default());
        let switch = graph.add_node(
            FeatureLevelSwitch::default().with_level(FeatureLevel::Sm5, InputSlot::from_output(attributes, 0)),
        );

        let cx = GraphContext::new(&graph, &functions);
        let expression = graph.expression(switch).unwrap();
        assert_eq!(expression.inputs().len(), 5);
        assert_eq!(expression.input_name(&cx, 0), "Default");
        assert_eq!(expression.input_name(&cx, 2), "ES3_1");
        assert!(expression.is_input_connection_required(&cx, 0));
        assert!(!expression.is_input_connection_required(&cx, 4));
        assert!(expression.is_result_material_attributes(&cx, 0));
    }
}
