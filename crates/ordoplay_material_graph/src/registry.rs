// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalogue of every material expression kind.
//!
//! Editors build their node palettes from it and the command line compiler
//! lists it with `list-nodes`.

use crate::compiler::{SceneProperty, TextureKind};
use crate::node::{ExpressionKind, NodeCategory, NodeRegistry, NodeType};
use crate::nodes::{
    AppendVector, Arithmetic, ArithmeticOp, BreakMaterialAttributes, Clamp, ClampMode,
    ComponentMaskExpression, Constant, ConstantVector, CrossProduct, Custom, DotProduct,
    FeatureLevelSwitch, Fmod, FunctionCall, FunctionInput, FunctionOutput, If, LinearInterpolate,
    MakeMaterialAttributes, Power, QualitySwitch, ScalarParameter, SceneInput, StaticBool,
    StaticBoolParameter, StaticSwitch, StaticSwitchParameter, TextureCoordinate, TextureObject,
    TextureSample, UnaryMath, UnaryOp, VectorParameter,
};

fn node_type(
    id: &str,
    name: &str,
    category: NodeCategory,
    description: &str,
    create: fn() -> ExpressionKind,
) -> NodeType {
    NodeType {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        create,
    }
}

/// Create the registry with every material expression kind
pub fn create_material_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // ========================================================================
    // Constants and Parameters
    // ========================================================================

    registry.register(node_type(
        "constant",
        "Constant",
        NodeCategory::Constants,
        "Scalar literal",
        || Constant::new(0.0).into(),
    ));
    registry.register(node_type(
        "constant2",
        "Constant2Vector",
        NodeCategory::Constants,
        "Two component literal",
        || ConstantVector::vec2([0.0; 2]).into(),
    ));
    registry.register(node_type(
        "constant3",
        "Constant3Vector",
        NodeCategory::Constants,
        "Three component literal",
        || ConstantVector::vec3([0.0; 3]).into(),
    ));
    registry.register(node_type(
        "constant4",
        "Constant4Vector",
        NodeCategory::Constants,
        "Four component literal",
        || ConstantVector::vec4([0.0; 4]).into(),
    ));
    registry.register(node_type(
        "static_bool",
        "Static Bool",
        NodeCategory::Constants,
        "Compile-time boolean literal",
        || StaticBool::new(true).into(),
    ));
    registry.register(node_type(
        "scalar_parameter",
        "Scalar Parameter",
        NodeCategory::Parameters,
        "Named scalar a material instance can override",
        || ScalarParameter::new("Param", 0.0).into(),
    ));
    registry.register(node_type(
        "vector_parameter",
        "Vector Parameter",
        NodeCategory::Parameters,
        "Named vector a material instance can override",
        || VectorParameter::new("Param", [0.0; 4]).into(),
    ));
    registry.register(node_type(
        "static_bool_parameter",
        "Static Bool Parameter",
        NodeCategory::Parameters,
        "Named compile-time boolean",
        || StaticBoolParameter::new("Param", true).into(),
    ));

    // ========================================================================
    // Math
    // ========================================================================

    registry.register(node_type("add", "Add", NodeCategory::Math, "a + b", || {
        Arithmetic::new(ArithmeticOp::Add).into()
    }));
    registry.register(node_type("subtract", "Subtract", NodeCategory::Math, "a - b", || {
        Arithmetic::new(ArithmeticOp::Subtract).into()
    }));
    registry.register(node_type("multiply", "Multiply", NodeCategory::Math, "a * b", || {
        Arithmetic::new(ArithmeticOp::Multiply).into()
    }));
    registry.register(node_type("divide", "Divide", NodeCategory::Math, "a / b", || {
        Arithmetic::new(ArithmeticOp::Divide).into()
    }));
    registry.register(node_type("min", "Min", NodeCategory::Math, "Smaller of a and b", || {
        Arithmetic::new(ArithmeticOp::Min).into()
    }));
    registry.register(node_type("max", "Max", NodeCategory::Math, "Larger of a and b", || {
        Arithmetic::new(ArithmeticOp::Max).into()
    }));

    registry.register(node_type("abs", "Abs", NodeCategory::Math, "Absolute value", || {
        UnaryMath::new(UnaryOp::Abs).into()
    }));
    registry.register(node_type("floor", "Floor", NodeCategory::Math, "Round down", || {
        UnaryMath::new(UnaryOp::Floor).into()
    }));
    registry.register(node_type("ceil", "Ceil", NodeCategory::Math, "Round up", || {
        UnaryMath::new(UnaryOp::Ceil).into()
    }));
    registry.register(node_type("frac", "Frac", NodeCategory::Math, "Fractional part", || {
        UnaryMath::new(UnaryOp::Frac).into()
    }));
    registry.register(node_type("sqrt", "Square Root", NodeCategory::Math, "Square root", || {
        UnaryMath::new(UnaryOp::SquareRoot).into()
    }));
    registry.register(node_type("log2", "Logarithm2", NodeCategory::Math, "Base 2 logarithm", || {
        UnaryMath::new(UnaryOp::Logarithm2).into()
    }));
    registry.register(node_type("sine", "Sine", NodeCategory::Math, "Sine", || {
        UnaryMath::new(UnaryOp::Sine).into()
    }));
    registry.register(node_type("cosine", "Cosine", NodeCategory::Math, "Cosine", || {
        UnaryMath::new(UnaryOp::Cosine).into()
    }));
    registry.register(node_type("one_minus", "OneMinus", NodeCategory::Math, "1 - x", || {
        UnaryMath::new(UnaryOp::OneMinus).into()
    }));
    registry.register(node_type("saturate", "Saturate", NodeCategory::Math, "Clamp to [0, 1]", || {
        UnaryMath::new(UnaryOp::Saturate).into()
    }));
    registry.register(node_type("normalize", "Normalize", NodeCategory::Math, "Unit length vector", || {
        UnaryMath::new(UnaryOp::Normalize).into()
    }));

    registry.register(node_type("power", "Power", NodeCategory::Math, "Base raised to an exponent", || {
        Power::default().into()
    }));
    registry.register(node_type("clamp", "Clamp", NodeCategory::Math, "Clamp into a range", || {
        Clamp::default().into()
    }));
    registry.register(node_type("clamp_min", "Clamp (Min)", NodeCategory::Math, "Lower bound only", || {
        Clamp {
            mode: ClampMode::ClampMin,
            ..Clamp::default()
        }
        .into()
    }));
    registry.register(node_type("clamp_max", "Clamp (Max)", NodeCategory::Math, "Upper bound only", || {
        Clamp {
            mode: ClampMode::ClampMax,
            ..Clamp::default()
        }
        .into()
    }));
    registry.register(node_type("lerp", "Lerp", NodeCategory::Math, "Blend a and b by alpha", || {
        LinearInterpolate::default().into()
    }));
    registry.register(node_type("fmod", "Fmod", NodeCategory::Math, "Floating point remainder", || {
        Fmod::default().into()
    }));
    registry.register(node_type("dot", "Dot", NodeCategory::Math, "Dot product", || {
        DotProduct::default().into()
    }));
    registry.register(node_type("cross", "Cross", NodeCategory::Math, "Cross product", || {
        CrossProduct::default().into()
    }));

    // ========================================================================
    // Vector Operations
    // ========================================================================

    registry.register(node_type(
        "append",
        "Append",
        NodeCategory::VectorOps,
        "Concatenate the channels of two values",
        || AppendVector::default().into(),
    ));
    registry.register(node_type(
        "component_mask",
        "Mask",
        NodeCategory::VectorOps,
        "Select channels",
        || ComponentMaskExpression::default().into(),
    ));

    // ========================================================================
    // Branching
    // ========================================================================

    registry.register(node_type(
        "if",
        "If",
        NodeCategory::Branching,
        "Runtime branch on a compared to b",
        || If::default().into(),
    ));
    registry.register(node_type(
        "static_switch",
        "Static Switch",
        NodeCategory::Branching,
        "Compile only the side chosen by a static bool",
        || StaticSwitch::default().into(),
    ));
    registry.register(node_type(
        "static_switch_parameter",
        "Static Switch Parameter",
        NodeCategory::Branching,
        "Static switch driven by a named parameter",
        || StaticSwitchParameter::default().into(),
    ));
    registry.register(node_type(
        "quality_switch",
        "Quality Switch",
        NodeCategory::Branching,
        "Input chosen by the target quality level",
        || QualitySwitch::default().into(),
    ));
    registry.register(node_type(
        "feature_level_switch",
        "Feature Level Switch",
        NodeCategory::Branching,
        "Input chosen by the target feature level",
        || FeatureLevelSwitch::default().into(),
    ));

    // ========================================================================
    // Material Attributes
    // ========================================================================

    registry.register(node_type(
        "make_material_attributes",
        "Make Material Attributes",
        NodeCategory::MaterialAttributes,
        "Build the attribute bus from one input per channel",
        || MakeMaterialAttributes::default().into(),
    ));
    registry.register(node_type(
        "break_material_attributes",
        "Break Material Attributes",
        NodeCategory::MaterialAttributes,
        "Split the attribute bus into its channels",
        || BreakMaterialAttributes::default().into(),
    ));

    // ========================================================================
    // Functions
    // ========================================================================

    registry.register(node_type(
        "function_input",
        "Function Input",
        NodeCategory::Functions,
        "Value supplied by the call site",
        || FunctionInput::default().into(),
    ));
    registry.register(node_type(
        "function_output",
        "Function Output",
        NodeCategory::Functions,
        "Value returned to the call site",
        || FunctionOutput::default().into(),
    ));
    registry.register(node_type(
        "function_call",
        "Material Function Call",
        NodeCategory::Functions,
        "Inline a material function",
        || FunctionCall::default().into(),
    ));

    // ========================================================================
    // Textures
    // ========================================================================

    registry.register(node_type(
        "texture_object",
        "Texture Object",
        NodeCategory::Texture,
        "Reference to a texture asset",
        || TextureObject::new("", TextureKind::Texture2D).into(),
    ));
    registry.register(node_type(
        "texture_sample",
        "Texture Sample",
        NodeCategory::Texture,
        "Sample a texture",
        || TextureSample::default().into(),
    ));
    registry.register(node_type(
        "texture_coordinate",
        "Texture Coordinate",
        NodeCategory::Texture,
        "Mesh texture coordinates",
        || TextureCoordinate::new(0).into(),
    ));

    // ========================================================================
    // Scene
    // ========================================================================

    registry.register(node_type("time", "Time", NodeCategory::Scene, "Game time in seconds", || {
        SceneInput::new(SceneProperty::Time).into()
    }));
    registry.register(node_type(
        "vertex_color",
        "Vertex Color",
        NodeCategory::Scene,
        "Interpolated vertex color",
        || SceneInput::new(SceneProperty::VertexColor).into(),
    ));
    registry.register(node_type(
        "world_position",
        "World Position",
        NodeCategory::Scene,
        "World position of the shaded point",
        || SceneInput::new(SceneProperty::WorldPosition).into(),
    ));
    registry.register(node_type(
        "camera_vector",
        "Camera Vector",
        NodeCategory::Scene,
        "Direction to the camera",
        || SceneInput::new(SceneProperty::CameraVector).into(),
    ));
    registry.register(node_type(
        "screen_position",
        "Screen Position",
        NodeCategory::Scene,
        "Screen-space position",
        || SceneInput::new(SceneProperty::ScreenPosition).into(),
    ));
    registry.register(node_type(
        "pixel_depth",
        "Pixel Depth",
        NodeCategory::Scene,
        "Depth of the shaded pixel",
        || SceneInput::new(SceneProperty::PixelDepth).into(),
    ));
    registry.register(node_type(
        "particle_color",
        "Particle Color",
        NodeCategory::Scene,
        "Color of the emitting particle",
        || SceneInput::new(SceneProperty::ParticleColor).into(),
    ));
    registry.register(node_type(
        "per_instance_random",
        "Per Instance Random",
        NodeCategory::Scene,
        "Random value per mesh instance",
        || SceneInput::new(SceneProperty::PerInstanceRandom).into(),
    ));
    registry.register(node_type(
        "object_position",
        "Object Position",
        NodeCategory::Scene,
        "World position of the object origin",
        || SceneInput::new(SceneProperty::ObjectPosition).into(),
    ));

    // ========================================================================
    // Custom
    // ========================================================================

    registry.register(node_type(
        "custom",
        "Custom",
        NodeCategory::Custom,
        "Inline user code",
        || Custom::default().into(),
    ));

    registry
}
