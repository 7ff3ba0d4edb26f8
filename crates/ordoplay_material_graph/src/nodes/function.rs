// SPDX-License-Identifier: MIT OR Apache-2.0
//! Function input, output and call nodes.
//!
//! A call node inlines the referenced function's body at the call site: the
//! function output being read is compiled inside a new scope in which every
//! function input node answers with the call site's connection.

use crate::compiler::CodeResult;
use crate::context::{CompileContext, InputOverride};
use crate::function::{FunctionId, FunctionLibrary, MaterialFunction};
use crate::graph::GraphContext;
use crate::node::{Expression, NodeId};
use crate::port::{InputSlot, OutputSlot};
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Declared type of a function input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionInputType {
    /// One float
    Scalar,
    /// float2
    Vector2,
    /// float3
    #[default]
    Vector3,
    /// float4
    Vector4,
    /// 2D texture object
    Texture2D,
    /// Cube texture object
    TextureCube,
    /// Compile-time boolean
    StaticBool,
    /// Attribute bus
    MaterialAttributes,
}

impl FunctionInputType {
    /// Every input type
    pub const ALL: [FunctionInputType; 8] = [
        FunctionInputType::Scalar,
        FunctionInputType::Vector2,
        FunctionInputType::Vector3,
        FunctionInputType::Vector4,
        FunctionInputType::Texture2D,
        FunctionInputType::TextureCube,
        FunctionInputType::StaticBool,
        FunctionInputType::MaterialAttributes,
    ];

    /// Value type values are cast to
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Scalar => ValueType::FLOAT1,
            Self::Vector2 => ValueType::FLOAT2,
            Self::Vector3 => ValueType::FLOAT3,
            Self::Vector4 => ValueType::FLOAT4,
            Self::Texture2D => ValueType::TEXTURE2D,
            Self::TextureCube => ValueType::TEXTURE_CUBE,
            Self::StaticBool => ValueType::STATIC_BOOL,
            Self::MaterialAttributes => ValueType::MATERIAL_ATTRIBUTES,
        }
    }

    /// Abbreviation shown next to call node input names
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Scalar => "S",
            Self::Vector2 => "V2",
            Self::Vector3 => "V3",
            Self::Vector4 => "V4",
            Self::Texture2D => "T2d",
            Self::TextureCube => "TCube",
            Self::StaticBool => "B",
            Self::MaterialAttributes => "MA",
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Texture2D => "Texture2D",
            Self::TextureCube => "TextureCube",
            Self::StaticBool => "StaticBool",
            Self::MaterialAttributes => "MaterialAttributes",
        }
    }
}

/// Entry point of a function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionInput {
    /// Identity kept across renames
    pub id: Uuid,
    /// Name, unique among the function's inputs
    pub name: String,
    /// Tooltip text
    #[serde(default)]
    pub description: String,
    /// Type call site values are cast to
    #[serde(default)]
    pub input_type: FunctionInputType,
    /// Value used when the function is compiled on its own
    #[serde(default)]
    pub preview: InputSlot,
    /// Literal used when `preview` is unconnected
    #[serde(default)]
    pub preview_value: [f32; 4],
    /// Let call sites leave this input unconnected and use the preview instead
    #[serde(default)]
    pub use_preview_value_as_default: bool,
    /// Order among the function's inputs
    #[serde(default)]
    pub sort_priority: i32,
}

impl Default for FunctionInput {
    fn default() -> Self {
        Self::new("In", FunctionInputType::default())
    }
}

impl FunctionInput {
    /// Create an input with a fresh identity
    pub fn new(name: impl Into<String>, input_type: FunctionInputType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            input_type,
            preview: InputSlot::new(),
            preview_value: [0.0; 4],
            use_preview_value_as_default: false,
            sort_priority: 0,
        }
    }

    /// Fall back to the preview value when a call site leaves the input unconnected
    pub fn with_preview_default(mut self, preview_value: [f32; 4]) -> Self {
        self.preview_value = preview_value;
        self.use_preview_value_as_default = true;
        self
    }

    /// Compile the preview: the preview connection, or the literal for numeric types
    fn compile_preview_value(
        &self,
        ctx: &mut CompileContext<'_>,
        multiplex: Option<usize>,
    ) -> CodeResult {
        if ctx.is_connected(&self.preview) {
            return ctx.compile_input_multiplexed(&self.preview, multiplex);
        }
        let [x, y, z, w] = self.preview_value;
        match self.input_type {
            FunctionInputType::Scalar => ctx.compiler().constant(x),
            FunctionInputType::Vector2 => ctx.compiler().constant2(x, y),
            FunctionInputType::Vector3 => ctx.compiler().constant3(x, y, z),
            FunctionInputType::Vector4 => ctx.compiler().constant4(x, y, z, w),
            _ => Err(ctx.error(format!(
                "Missing Preview connection for function input '{}'",
                self.name
            ))),
        }
    }
}

impl Expression for FunctionInput {
    /// Inside an inlined call this reads the call site; otherwise it reads
    /// the preview. Either way the value is cast to the declared type.
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let code = match ctx.current_input_override() {
            Some(InputOverride::CallSite(slot)) => {
                match ctx.in_caller_scope(|caller| caller.compile_input_multiplexed(&slot, multiplex)) {
                    Some(result) => result?,
                    None => return Err(ctx.error("Function input compiled outside of its call")),
                }
            }
            Some(InputOverride::Missing) => {
                return Err(ctx.error(format!("Missing function input '{}'", self.name)));
            }
            None => self.compile_preview_value(ctx, multiplex)?,
        };
        ctx.compiler().valid_cast(code, self.input_type.value_type())
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![format!("Input {} ({})", self.name, self.input_type.name())]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.preview]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.preview]
    }

    fn input_name(&self, _: &GraphContext<'_>, _: usize) -> String {
        "Preview".to_string()
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, _: usize) -> bool {
        false
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        self.input_type.value_type()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        self.input_type.value_type()
    }

    fn is_result_material_attributes(&self, _: &GraphContext<'_>, _: usize) -> bool {
        self.input_type == FunctionInputType::MaterialAttributes
    }
}

/// Exit point of a function body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionOutput {
    /// Identity kept across renames
    pub id: Uuid,
    /// Name, unique among the function's outputs
    pub name: String,
    /// Tooltip text
    #[serde(default)]
    pub description: String,
    /// Order among the function's outputs
    #[serde(default)]
    pub sort_priority: i32,
    /// Value returned to call sites
    #[serde(default)]
    pub a: InputSlot,
}

impl Default for FunctionOutput {
    fn default() -> Self {
        Self::new("Result", InputSlot::new())
    }
}

impl FunctionOutput {
    /// Create an output with a fresh identity
    pub fn new(name: impl Into<String>, a: InputSlot) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            sort_priority: 0,
            a,
        }
    }
}

impl Expression for FunctionOutput {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        if !ctx.is_connected(&self.a) {
            return Err(ctx.error(format!("Missing function output '{}'", self.name)));
        }
        ctx.compile_input_multiplexed(&self.a, multiplex)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![format!("Output {}", self.name)]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.a]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.a]
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::UNKNOWN
    }

    fn output_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        if self.is_result_material_attributes(cx, index) {
            return ValueType::MATERIAL_ATTRIBUTES;
        }
        cx.source_type(&self.a).unwrap_or(ValueType::UNKNOWN)
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, _: usize) -> bool {
        cx.feeds_material_attributes(&self.a)
    }
}

/// Call site connection for one function input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInputBinding {
    /// Identity of the function input
    pub input_id: Uuid,
    /// Name the input had when last refreshed
    pub name: String,
    /// Call site connection
    #[serde(default)]
    pub slot: InputSlot,
}

/// One output of a call node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionOutputBinding {
    /// Identity of the function output
    pub output_id: Uuid,
    /// Name the output had when last refreshed
    pub name: String,
}

/// Inlines a material function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Called function
    #[serde(default)]
    pub function: Option<FunctionId>,
    /// One binding per function input, in the function's input order
    #[serde(default)]
    pub inputs: Vec<FunctionInputBinding>,
    /// One binding per function output, in the function's output order
    #[serde(default)]
    pub outputs: Vec<FunctionOutputBinding>,
}

impl FunctionCall {
    /// Create a call bound to `function`'s current inputs and outputs
    pub fn new(function: &MaterialFunction) -> Self {
        Self {
            function: Some(function.id),
            inputs: function
                .function_inputs()
                .into_iter()
                .map(|(_, input)| FunctionInputBinding {
                    input_id: input.id,
                    name: input.name.clone(),
                    slot: InputSlot::new(),
                })
                .collect(),
            outputs: function
                .function_outputs()
                .into_iter()
                .map(|(_, output)| FunctionOutputBinding {
                    output_id: output.id,
                    name: output.name.clone(),
                })
                .collect(),
        }
    }

    /// Connect the input bound to `name`
    pub fn with_input(mut self, name: &str, slot: InputSlot) -> Self {
        if let Some(binding) = self.inputs.iter_mut().find(|binding| binding.name == name) {
            binding.slot = slot;
        }
        self
    }

    /// Index of the output bound to `name`
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|binding| binding.name == name)
    }

    fn target<'a>(&self, functions: &'a FunctionLibrary) -> Option<&'a MaterialFunction> {
        self.function.and_then(|id| functions.get(id))
    }

    fn target_input<'a>(&self, cx: &GraphContext<'a>, index: usize) -> Option<&'a FunctionInput> {
        let binding = self.inputs.get(index)?;
        let (_, input) = self
            .target(cx.functions)?
            .find_input(binding.input_id, &binding.name)?;
        Some(input)
    }

    fn target_output<'a>(
        &self,
        functions: &'a FunctionLibrary,
        index: usize,
    ) -> Option<(&'a MaterialFunction, &'a FunctionOutput)> {
        let binding = self.outputs.get(index)?;
        let function = self.target(functions)?;
        let (_, output) = function.find_output(binding.output_id, &binding.name)?;
        Some((function, output))
    }

    /// What each function input node reads while this call is inlined
    fn input_overrides(
        &self,
        ctx: &CompileContext<'_>,
        function: &MaterialFunction,
    ) -> HashMap<NodeId, InputOverride> {
        let mut overrides = HashMap::new();
        for (node, input) in function.function_inputs() {
            let slot = self
                .inputs
                .iter()
                .find(|binding| binding.input_id == input.id)
                .or_else(|| self.inputs.iter().find(|binding| binding.name == input.name))
                .map(|binding| binding.slot)
                .filter(|slot| ctx.is_connected(slot));
            match slot {
                Some(slot) => {
                    overrides.insert(node, InputOverride::CallSite(slot));
                }
                None if input.use_preview_value_as_default => {}
                None => {
                    overrides.insert(node, InputOverride::Missing);
                }
            }
        }
        overrides
    }
}

impl Expression for FunctionCall {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let functions = ctx.functions();
        let Some(function) = self.target(functions) else {
            return Err(ctx.error("Missing Material Function"));
        };
        let Some((_, output)) = self.target_output(functions, output_index) else {
            return Err(ctx.error("Invalid function output"));
        };
        if !GraphContext::new(&function.graph, functions).is_connected(&output.a) {
            return Err(ctx.error(format!("Missing function output '{}'", output.name)));
        }
        if ctx.is_inlining(function.id) {
            return Err(ctx.error(format!("Recursive call to function '{}'", function.name)));
        }

        let inputs = self.input_overrides(ctx, function);
        let caption = self
            .captions(functions)
            .into_iter()
            .next()
            .unwrap_or_default();
        let result = &output.a;
        ctx.in_function(function, caption, inputs, |inner| {
            inner.compile_input_multiplexed(result, multiplex)
        })
    }

    fn captions(&self, functions: &FunctionLibrary) -> Vec<String> {
        match self.target(functions) {
            Some(function) => vec![function.name.clone()],
            None => vec!["Unspecified Function".to_string()],
        }
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        self.inputs.iter().map(|binding| &binding.slot).collect()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        self.inputs.iter_mut().map(|binding| &mut binding.slot).collect()
    }

    fn input_name(&self, cx: &GraphContext<'_>, index: usize) -> String {
        match self.target_input(cx, index) {
            Some(input) => format!("{} ({})", input.name, input.input_type.short_name()),
            None => self
                .inputs
                .get(index)
                .map(|binding| binding.name.clone())
                .unwrap_or_default(),
        }
    }

    fn is_input_connection_required(&self, cx: &GraphContext<'_>, index: usize) -> bool {
        self.target_input(cx, index)
            .map_or(true, |input| !input.use_preview_value_as_default)
    }

    fn input_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        self.target_input(cx, index)
            .map_or(ValueType::UNKNOWN, |input| input.input_type.value_type())
    }

    fn outputs(&self, _: &GraphContext<'_>) -> Vec<OutputSlot> {
        self.outputs
            .iter()
            .map(|binding| OutputSlot::new(binding.name.clone()))
            .collect()
    }

    fn output_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        match self.target_output(cx.functions, index) {
            Some((function, output)) => output.output_type(&cx.with_graph(&function.graph), 0),
            None => ValueType::UNKNOWN,
        }
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, index: usize) -> bool {
        self.target_output(cx.functions, index)
            .is_some_and(|(function, output)| {
                cx.with_graph(&function.graph).feeds_material_attributes(&output.a)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ExpressionError, MaterialCompiler};
    use crate::graph::ExpressionGraph;
    use crate::nodes::{Arithmetic, Constant, UnaryMath};
    use crate::translator::HlslTranslator;

    /// `Abs(In)` exposed as a single output named `Result`
    fn abs_function() -> MaterialFunction {
        let mut function = MaterialFunction::new("AbsOf");
        let input = function
            .graph
            .add_node(FunctionInput::new("In", FunctionInputType::Scalar));
        let abs = function
            .graph
            .add_node(UnaryMath::abs().with_input(InputSlot::from_output(input, 0)));
        function
            .graph
            .add_node(FunctionOutput::new("Result", InputSlot::from_output(abs, 0)));
        function
    }

    #[test]
    fn test_call_inlines_function_body() {
        let mut functions = FunctionLibrary::new();
        let id = functions.insert(abs_function());
        let function = functions.get(id).unwrap();

        let mut graph = ExpressionGraph::new();
        let value = graph.add_node(Constant::new(-3.0));
        let call = graph.add_node(FunctionCall::new(function).with_input("In", InputSlot::from_output(value, 0)));

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let inlined = ctx.compile_node(call, 0, None).unwrap();
        assert_eq!(ctx.call_depth(), 0);

        let constant = ctx.compiler().constant(-3.0).unwrap();
        let expected = ctx.compiler().abs(constant).unwrap();
        assert_eq!(inlined, expected);
        drop(ctx);
        assert!(translator.diagnostics().is_empty());
    }

    #[test]
    fn test_unconnected_call_input_is_reported() {
        let mut functions = FunctionLibrary::new();
        let id = functions.insert(abs_function());

        let mut graph = ExpressionGraph::new();
        let call = graph.add_node(FunctionCall::new(functions.get(id).unwrap()));

        let mut translator = HlslTranslator::default();
        let result = CompileContext::new(&mut translator, &functions, &graph).compile_node(call, 0, None);
        assert_eq!(result, Err(ExpressionError));
        assert_eq!(
            translator.diagnostics(),
            ["Function AbsOf: Input In (Scalar)> Missing function input 'In'"]
        );
    }

    #[test]
    fn test_preview_value_used_as_default() {
        let mut function = MaterialFunction::new("Offset");
        let input = function.graph.add_node(
            FunctionInput::new("Bias", FunctionInputType::Scalar).with_preview_default([0.5, 0.0, 0.0, 0.0]),
        );
        let add = function.graph.add_node(Arithmetic::add().with_a(InputSlot::from_output(input, 0)));
        function
            .graph
            .add_node(FunctionOutput::new("Result", InputSlot::from_output(add, 0)));

        let mut functions = FunctionLibrary::new();
        let id = functions.insert(function);
        let mut graph = ExpressionGraph::new();
        let call = graph.add_node(FunctionCall::new(functions.get(id).unwrap()));

        let cx = GraphContext::new(&graph, &functions);
        let expression = graph.expression(call).unwrap();
        assert!(!expression.is_input_connection_required(&cx, 0));
        assert_eq!(expression.input_name(&cx, 0), "Bias (S)");

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let inlined = ctx.compile_node(call, 0, None).unwrap();
        let bias = ctx.compiler().constant(0.5).unwrap();
        let one = ctx.compiler().constant(1.0).unwrap();
        assert_eq!(inlined, ctx.compiler().add(bias, one).unwrap());
    }

    #[test]
    fn test_call_errors() {
        let mut functions = FunctionLibrary::new();
        let mut hollow = MaterialFunction::new("Hollow");
        hollow.graph.add_node(FunctionOutput::default());
        let id = functions.insert(hollow);

        let mut graph = ExpressionGraph::new();
        let unbound = graph.add_node(FunctionCall::default());
        let call = graph.add_node(FunctionCall::new(functions.get(id).unwrap()));

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        assert!(ctx.compile_node(unbound, 0, None).is_err());
        assert!(ctx.compile_node(call, 3, None).is_err());
        assert!(ctx.compile_node(call, 0, None).is_err());
        assert_eq!(ctx.call_depth(), 0);
        drop(ctx);

        assert_eq!(
            translator.diagnostics(),
            [
                "Unspecified Function> Missing Material Function",
                "Hollow> Invalid function output",
                "Hollow> Missing function output 'Result'",
            ]
        );
    }

    #[test]
    fn test_standalone_input_compiles_preview() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let input = graph.add_node(FunctionInput {
            preview_value: [1.0, 2.0, 3.0, 4.0],
            ..FunctionInput::new("In", FunctionInputType::Vector2)
        });
        let texture = graph.add_node(FunctionInput::new("Tex", FunctionInputType::Texture2D));

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let preview = ctx.compile_node(input, 0, None).unwrap();
        assert_eq!(preview, ctx.compiler().constant2(1.0, 2.0).unwrap());
        assert!(ctx.compile_node(texture, 0, None).is_err());
        drop(ctx);

        assert_eq!(
            translator.diagnostics(),
            ["Input Tex (Texture2D)> Missing Preview connection for function input 'Tex'"]
        );
    }
}
