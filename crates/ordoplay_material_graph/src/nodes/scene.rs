// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene, view, particle and instance values.

use crate::compiler::{CodeResult, SceneProperty};
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::InputSlot;
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};

/// Reads one [`SceneProperty`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInput {
    /// Value read
    pub property: SceneProperty,
}

impl Default for SceneInput {
    fn default() -> Self {
        Self::new(SceneProperty::Time)
    }
}

impl SceneInput {
    /// Create a node reading `property`
    pub fn new(property: SceneProperty) -> Self {
        Self { property }
    }
}

impl Expression for SceneInput {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler().scene_property(self.property)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![self.property.name().to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        self.property.value_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MaterialCompiler;
    use crate::graph::ExpressionGraph;
    use crate::translator::HlslTranslator;

    #[test]
    fn test_scene_inputs_match_declared_types() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let nodes: Vec<_> = SceneProperty::ALL
            .into_iter()
            .map(|property| (property, graph.add_node(SceneInput::new(property))))
            .collect();

        let cx = GraphContext::new(&graph, &functions);
        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        for (property, node) in nodes {
            let code = ctx.compile_node(node, 0, None).unwrap();
            assert_eq!(ctx.compiler().get_type(code), property.value_type());
            assert_eq!(
                graph.expression(node).unwrap().output_type(&cx, 0),
                property.value_type()
            );
        }
    }
}
