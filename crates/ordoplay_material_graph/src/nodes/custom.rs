// SPDX-License-Identifier: MIT OR Apache-2.0
//! User-authored inline code.

use crate::compiler::{Code, CodeResult, ExpressionError};
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::InputSlot;
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};

/// Type produced by a [`Custom`] node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum CustomOutputType {
    Float1,
    Float2,
    #[default]
    Float3,
    Float4,
}

impl CustomOutputType {
    /// Value type of the result
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Float1 => ValueType::FLOAT1,
            Self::Float2 => ValueType::FLOAT2,
            Self::Float3 => ValueType::FLOAT3,
            Self::Float4 => ValueType::FLOAT4,
        }
    }
}

/// Named argument of a [`Custom`] node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomInput {
    /// Argument name used by the code
    pub name: String,
    /// Value
    #[serde(default)]
    pub input: InputSlot,
}

/// Inline code with named arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Custom {
    /// Shown as the caption
    pub description: String,
    /// Code body
    pub code: String,
    /// Type of the result
    #[serde(default)]
    pub output_type: CustomOutputType,
    /// Arguments, all required
    #[serde(default)]
    pub inputs: Vec<CustomInput>,
}

impl Default for Custom {
    fn default() -> Self {
        Self {
            description: "Custom".to_string(),
            code: "1".to_string(),
            output_type: CustomOutputType::default(),
            inputs: Vec::new(),
        }
    }
}

impl Custom {
    /// Create a node running `code`
    pub fn new(code: impl Into<String>, output_type: CustomOutputType) -> Self {
        Self {
            code: code.into(),
            output_type,
            ..Self::default()
        }
    }

    /// Add a named argument
    pub fn with_input(mut self, name: impl Into<String>, input: InputSlot) -> Self {
        self.inputs.push(CustomInput {
            name: name.into(),
            input,
        });
        self
    }
}

impl Expression for Custom {
    /// Reports every unconnected argument before giving up.
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        let mut missing = false;
        for (index, argument) in self.inputs.iter().enumerate() {
            if !ctx.is_connected(&argument.input) {
                ctx.error(format!(
                    "Custom material {} missing input {} ({})",
                    self.description,
                    index + 1,
                    argument.name
                ));
                missing = true;
            }
        }
        if missing {
            return Err(ExpressionError);
        }

        let mut arguments: Vec<(String, Code)> = Vec::with_capacity(self.inputs.len());
        for argument in &self.inputs {
            let code = ctx.compile_input(&argument.input)?;
            arguments.push((argument.name.clone(), code));
        }
        ctx.compiler()
            .custom_expression(&self.code, self.output_type.value_type(), &arguments)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![self.description.clone()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        self.inputs.iter().map(|argument| &argument.input).collect()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        self.inputs
            .iter_mut()
            .map(|argument| &mut argument.input)
            .collect()
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        self.inputs
            .get(index)
            .map(|argument| argument.name.clone())
            .unwrap_or_default()
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::UNKNOWN
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        self.output_type.value_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MaterialCompiler;
    use crate::graph::ExpressionGraph;
    use crate::nodes::Constant;
    use crate::translator::HlslTranslator;

    #[test]
    fn test_every_missing_argument_is_reported() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let custom = graph.add_node(
            Custom::new("a * b", CustomOutputType::Float1)
                .with_input("a", InputSlot::new())
                .with_input("b", InputSlot::new()),
        );

        let mut translator = HlslTranslator::default();
        let result = CompileContext::new(&mut translator, &functions, &graph).compile_node(custom, 0, None);
        assert_eq!(result, Err(ExpressionError));
        assert_eq!(
            translator.diagnostics(),
            [
                "Custom> Custom material Custom missing input 1 (a)",
                "Custom> Custom material Custom missing input 2 (b)",
            ]
        );
    }

    #[test]
    fn test_custom_result_has_declared_type() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let value = graph.add_node(Constant::new(2.0));
        let custom = graph.add_node(
            Custom::new("float2(x, x)", CustomOutputType::Float2).with_input("x", InputSlot::from_output(value, 0)),
        );

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let code = ctx.compile_node(custom, 0, None).unwrap();
        assert_eq!(ctx.compiler().get_type(code), ValueType::FLOAT2);
    }
}
