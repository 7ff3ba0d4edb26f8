// SPDX-License-Identifier: MIT OR Apache-2.0
//! Literal values and named parameters.

use crate::compiler::CodeResult;
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::{channel_outputs, InputSlot, OutputSlot};
use crate::value_type::{ComponentMask, ValueType};
use serde::{Deserialize, Serialize};

/// Scalar literal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// Value
    pub r: f32,
}

impl Constant {
    /// Create a scalar literal
    pub fn new(r: f32) -> Self {
        Self { r }
    }
}

impl Expression for Constant {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler().constant(self.r)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![format!("{}", self.r)]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::FLOAT1
    }
}

/// Vector literal with two to four components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantVector {
    /// Components; only the first `components` are used
    pub value: [f32; 4],
    /// Number of components, 2 to 4
    pub components: u32,
}

impl ConstantVector {
    /// Two component literal
    pub fn vec2(value: [f32; 2]) -> Self {
        Self {
            value: [value[0], value[1], 0.0, 0.0],
            components: 2,
        }
    }

    /// Three component literal
    pub fn vec3(value: [f32; 3]) -> Self {
        Self {
            value: [value[0], value[1], value[2], 0.0],
            components: 3,
        }
    }

    /// Four component literal
    pub fn vec4(value: [f32; 4]) -> Self {
        Self {
            value,
            components: 4,
        }
    }

    fn width(&self) -> u32 {
        self.components.clamp(2, 4)
    }
}

impl Default for ConstantVector {
    fn default() -> Self {
        Self::vec3([0.0; 3])
    }
}

impl Expression for ConstantVector {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        let [x, y, z, w] = self.value;
        match self.width() {
            2 => ctx.compiler().constant2(x, y),
            3 => ctx.compiler().constant3(x, y, z),
            _ => ctx.compiler().constant4(x, y, z, w),
        }
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        let parts: Vec<String> = self.value[..self.width() as usize]
            .iter()
            .map(|v| format!("{v}"))
            .collect();
        vec![parts.join(",")]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn outputs(&self, _: &GraphContext<'_>) -> Vec<OutputSlot> {
        channel_outputs(ComponentMask::first(self.width()))
    }
}

/// Named scalar a material instance may override at runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarParameter {
    /// Parameter name
    pub name: String,
    /// Value used when not overridden
    pub default_value: f32,
}

impl ScalarParameter {
    /// Create a scalar parameter
    pub fn new(name: impl Into<String>, default_value: f32) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }
}

impl Expression for ScalarParameter {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler()
            .scalar_parameter(&self.name, self.default_value)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![
            format!("Param ({})", self.default_value),
            format!("'{}'", self.name),
        ]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::FLOAT1
    }
}

/// Named color/vector a material instance may override at runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorParameter {
    /// Parameter name
    pub name: String,
    /// Value used when not overridden
    pub default_value: [f32; 4],
}

impl VectorParameter {
    /// Create a vector parameter
    pub fn new(name: impl Into<String>, default_value: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }
}

impl Expression for VectorParameter {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler()
            .vector_parameter(&self.name, self.default_value)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        let [r, g, b, a] = self.default_value;
        vec![
            format!("Param ({r},{g},{b},{a})"),
            format!("'{}'", self.name),
        ]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn outputs(&self, _: &GraphContext<'_>) -> Vec<OutputSlot> {
        channel_outputs(ComponentMask::RGB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ExpressionGraph;
    use crate::compiler::MaterialCompiler;
    use crate::translator::HlslTranslator;

    #[test]
    fn test_constant_vector_width() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let color = graph.add_node(ConstantVector::vec3([1.0, 0.5, 0.0]));

        let mut translator = HlslTranslator::default();
        let code = CompileContext::new(&mut translator, &functions, &graph)
            .compile_node(color, 0, None)
            .unwrap();
        assert_eq!(translator.get_type(code), ValueType::FLOAT3);

        let cx = GraphContext::new(&graph, &functions);
        let expression = graph.expression(color).unwrap();
        assert_eq!(expression.output_type(&cx, 0), ValueType::FLOAT3);
        assert_eq!(expression.output_type(&cx, 1), ValueType::FLOAT1);
        assert_eq!(expression.captions(&functions), vec!["1,0.5,0".to_string()]);
    }

    #[test]
    fn test_parameter_captions() {
        let functions = FunctionLibrary::new();
        let parameter = ScalarParameter::new("Roughness", 0.25);
        assert_eq!(
            parameter.captions(&functions),
            vec!["Param (0.25)".to_string(), "'Roughness'".to_string()]
        );
    }
}
