// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions: the per-kind expression interface and the closed set of kinds.

use crate::compiler::CodeResult;
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::nodes::{
    AppendVector, Arithmetic, BreakMaterialAttributes, Clamp, ComponentMaskExpression, Constant,
    ConstantVector, CrossProduct, Custom, DotProduct, FeatureLevelSwitch, Fmod, FunctionCall,
    FunctionInput, FunctionOutput, If, LinearInterpolate, MakeMaterialAttributes, Power,
    QualitySwitch, ScalarParameter, SceneInput, StaticBool, StaticBoolParameter, StaticSwitch,
    StaticSwitchParameter, TextureCoordinate, TextureObject, TextureSample, UnaryMath,
    VectorParameter,
};
use crate::port::{InputSlot, OutputSlot};
use crate::value_type::ValueType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behavior shared by every node kind.
///
/// `compile` must never panic on missing or ill-typed inputs: it reports
/// through [`CompileContext::error`] and returns the sentinel instead.
pub trait Expression {
    /// Compile output `output_index`. `multiplex` selects an attribute bus
    /// channel for nodes whose result is the bus.
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult;

    /// Compile the value shown when previewing this node on its own
    fn compile_preview(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        self.compile(ctx, output_index, multiplex)
    }

    /// Caption lines; the first one prefixes diagnostics
    fn captions(&self, functions: &FunctionLibrary) -> Vec<String>;

    /// Input slots in display order
    fn inputs(&self) -> Vec<&InputSlot>;

    /// Input slots in display order, mutably
    fn inputs_mut(&mut self) -> Vec<&mut InputSlot>;

    /// Input slot by index
    fn input(&self, index: usize) -> Option<&InputSlot> {
        self.inputs().into_iter().nth(index)
    }

    /// Input slot by index, mutably
    fn input_mut(&mut self, index: usize) -> Option<&mut InputSlot> {
        self.inputs_mut().into_iter().nth(index)
    }

    /// Display name of an input
    fn input_name(&self, _cx: &GraphContext<'_>, _index: usize) -> String {
        String::new()
    }

    /// Whether leaving the input unconnected is an error
    fn is_input_connection_required(&self, _cx: &GraphContext<'_>, _index: usize) -> bool {
        true
    }

    /// Types the input accepts
    fn input_type(&self, _cx: &GraphContext<'_>, _index: usize) -> ValueType {
        ValueType::FLOAT
    }

    /// Output slots
    fn outputs(&self, _cx: &GraphContext<'_>) -> Vec<OutputSlot> {
        vec![OutputSlot::default()]
    }

    /// Type an output produces
    fn output_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        if self.is_result_material_attributes(cx, index) {
            return ValueType::MATERIAL_ATTRIBUTES;
        }
        self.outputs(cx)
            .get(index)
            .map_or(ValueType::FLOAT, |output| ValueType::from_mask(output.mask))
    }

    /// Whether the output carries the attribute bus
    fn is_result_material_attributes(&self, _cx: &GraphContext<'_>, _index: usize) -> bool {
        false
    }
}

macro_rules! expression_kinds {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Every node kind, each wrapping its own expression data
        #[derive(Debug, Clone, Serialize, Deserialize)]
        pub enum ExpressionKind {
            $(
                #[doc = concat!("`", stringify!($variant), "` node")]
                $variant($ty),
            )*
        }

        impl ExpressionKind {
            /// Behavior of this kind
            pub fn as_expression(&self) -> &dyn Expression {
                match self {
                    $(Self::$variant(expression) => expression,)*
                }
            }

            /// Behavior of this kind, mutably
            pub fn as_expression_mut(&mut self) -> &mut dyn Expression {
                match self {
                    $(Self::$variant(expression) => expression,)*
                }
            }

            /// Name of the kind
            pub fn kind_name(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                }
            }
        }

        $(
            impl From<$ty> for ExpressionKind {
                fn from(expression: $ty) -> Self {
                    Self::$variant(expression)
                }
            }
        )*
    };
}

expression_kinds! {
    Constant(Constant),
    ConstantVector(ConstantVector),
    ScalarParameter(ScalarParameter),
    VectorParameter(VectorParameter),
    StaticBool(StaticBool),
    StaticBoolParameter(StaticBoolParameter),
    Arithmetic(Arithmetic),
    UnaryMath(UnaryMath),
    Power(Power),
    Clamp(Clamp),
    LinearInterpolate(LinearInterpolate),
    DotProduct(DotProduct),
    CrossProduct(CrossProduct),
    AppendVector(AppendVector),
    Fmod(Fmod),
    ComponentMask(ComponentMaskExpression),
    If(If),
    StaticSwitch(StaticSwitch),
    StaticSwitchParameter(StaticSwitchParameter),
    QualitySwitch(QualitySwitch),
    FeatureLevelSwitch(FeatureLevelSwitch),
    MakeMaterialAttributes(MakeMaterialAttributes),
    BreakMaterialAttributes(BreakMaterialAttributes),
    FunctionInput(FunctionInput),
    FunctionOutput(FunctionOutput),
    FunctionCall(FunctionCall),
    TextureObject(TextureObject),
    TextureSample(TextureSample),
    TextureCoordinate(TextureCoordinate),
    SceneInput(SceneInput),
    Custom(Custom),
}

impl Expression for ExpressionKind {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        self.as_expression().compile(ctx, output_index, multiplex)
    }

    fn compile_preview(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        self.as_expression()
            .compile_preview(ctx, output_index, multiplex)
    }

    fn captions(&self, functions: &FunctionLibrary) -> Vec<String> {
        self.as_expression().captions(functions)
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        self.as_expression().inputs()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        self.as_expression_mut().inputs_mut()
    }

    fn input(&self, index: usize) -> Option<&InputSlot> {
        self.as_expression().input(index)
    }

    fn input_mut(&mut self, index: usize) -> Option<&mut InputSlot> {
        self.as_expression_mut().input_mut(index)
    }

    fn input_name(&self, cx: &GraphContext<'_>, index: usize) -> String {
        self.as_expression().input_name(cx, index)
    }

    fn is_input_connection_required(&self, cx: &GraphContext<'_>, index: usize) -> bool {
        self.as_expression().is_input_connection_required(cx, index)
    }

    fn input_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        self.as_expression().input_type(cx, index)
    }

    fn outputs(&self, cx: &GraphContext<'_>) -> Vec<OutputSlot> {
        self.as_expression().outputs(cx)
    }

    fn output_type(&self, cx: &GraphContext<'_>, index: usize) -> ValueType {
        self.as_expression().output_type(cx, index)
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, index: usize) -> bool {
        self.as_expression().is_result_material_attributes(cx, index)
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Identifier within the owning graph
    pub id: NodeId,
    /// User description; replaces the caption in diagnostics when set
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desc: String,
    /// What the node computes
    pub expression: ExpressionKind,
}

impl Node {
    /// Create a node
    pub fn new(id: NodeId, expression: ExpressionKind) -> Self {
        Self {
            id,
            desc: String::new(),
            expression,
        }
    }

    /// Name used to prefix diagnostics raised by this node
    pub fn caption(&self, functions: &FunctionLibrary) -> String {
        if !self.desc.is_empty() {
            return self.desc.clone();
        }
        self.expression
            .captions(functions)
            .into_iter()
            .next()
            .unwrap_or_else(|| self.expression.kind_name().to_string())
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Literal values
    Constants,
    /// Named values a material instance can override
    Parameters,
    /// Arithmetic
    Math,
    /// Vector construction and selection
    VectorOps,
    /// Compile-time and level branches
    Branching,
    /// Attribute bus
    MaterialAttributes,
    /// Function inputs, outputs and calls
    Functions,
    /// Texture objects and sampling
    Texture,
    /// Scene, particle and instance values
    Scene,
    /// User code
    Custom,
}

/// Node type definition
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique type identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Builds a fresh, unconnected instance
    pub create: fn() -> ExpressionKind,
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by ID
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Create an expression from a type ID
    pub fn create(&self, type_id: &str) -> Option<ExpressionKind> {
        self.get(type_id).map(|t| (t.create)())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
