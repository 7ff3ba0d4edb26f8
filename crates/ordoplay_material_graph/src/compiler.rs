// SPDX-License-Identifier: MIT OR Apache-2.0
//! The code-generation backend contract expressions compile against.
//!
//! Expressions never build shader text themselves. They hand [`Code`] handles
//! to a [`MaterialCompiler`], which owns type checking of the generated code,
//! casts, and the diagnostic list.

use crate::value_type::{ComponentMask, ValueType};
use serde::{Deserialize, Serialize};

/// Opaque handle to a compiled sub-expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Code(pub u32);

/// Failure sentinel returned by compilation.
///
/// Whoever produces it has already recorded a diagnostic with the backend,
/// so callers propagate it with `?` instead of reporting again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expression failed to compile")]
pub struct ExpressionError;

/// Result of compiling one expression output
pub type CodeResult = Result<Code, ExpressionError>;

/// Shading quality tier a material is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QualityLevel {
    /// Low quality
    Low,
    /// High quality
    #[default]
    High,
}

impl QualityLevel {
    /// Every level, in switch input order
    pub const ALL: [QualityLevel; 2] = [QualityLevel::Low, QualityLevel::High];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::High => "High",
        }
    }

    /// Position in [`QualityLevel::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Hardware feature tier a material is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeatureLevel {
    /// Mobile, OpenGL ES 2
    Es2,
    /// Mobile, OpenGL ES 3.1
    Es31,
    /// Shader model 4
    Sm4,
    /// Shader model 5
    #[default]
    Sm5,
}

impl FeatureLevel {
    /// Every level, in switch input order
    pub const ALL: [FeatureLevel; 4] = [
        FeatureLevel::Es2,
        FeatureLevel::Es31,
        FeatureLevel::Sm4,
        FeatureLevel::Sm5,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Es2 => "ES2",
            Self::Es31 => "ES3_1",
            Self::Sm4 => "SM4",
            Self::Sm5 => "SM5",
        }
    }

    /// Position in [`FeatureLevel::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Scene, view, particle and instance values readable by expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneProperty {
    /// Game time in seconds
    Time,
    /// Interpolated vertex color
    VertexColor,
    /// Absolute world position of the shaded point
    WorldPosition,
    /// Direction from the shaded point to the camera
    CameraVector,
    /// Screen-space position
    ScreenPosition,
    /// Depth of the shaded pixel
    PixelDepth,
    /// Color of the emitting particle
    ParticleColor,
    /// Random value per mesh instance
    PerInstanceRandom,
    /// World position of the object origin
    ObjectPosition,
}

impl SceneProperty {
    /// Every property
    pub const ALL: [SceneProperty; 9] = [
        SceneProperty::Time,
        SceneProperty::VertexColor,
        SceneProperty::WorldPosition,
        SceneProperty::CameraVector,
        SceneProperty::ScreenPosition,
        SceneProperty::PixelDepth,
        SceneProperty::ParticleColor,
        SceneProperty::PerInstanceRandom,
        SceneProperty::ObjectPosition,
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::VertexColor => "VertexColor",
            Self::WorldPosition => "WorldPosition",
            Self::CameraVector => "CameraVector",
            Self::ScreenPosition => "ScreenPosition",
            Self::PixelDepth => "PixelDepth",
            Self::ParticleColor => "ParticleColor",
            Self::PerInstanceRandom => "PerInstanceRandom",
            Self::ObjectPosition => "ObjectPosition",
        }
    }

    /// Type of the value read
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Time | Self::PixelDepth | Self::PerInstanceRandom => ValueType::FLOAT1,
            Self::ScreenPosition => ValueType::FLOAT2,
            Self::WorldPosition | Self::CameraVector | Self::ObjectPosition => ValueType::FLOAT3,
            Self::VertexColor | Self::ParticleColor => ValueType::FLOAT4,
        }
    }
}

/// Kind of texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureKind {
    /// 2D texture
    #[default]
    Texture2D,
    /// Cube map
    Cube,
}

impl TextureKind {
    /// Value type of a texture object of this kind
    pub fn value_type(self) -> ValueType {
        match self {
            Self::Texture2D => ValueType::TEXTURE2D,
            Self::Cube => ValueType::TEXTURE_CUBE,
        }
    }
}

/// Frame pushed on the backend while a function body is being inlined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFrame {
    /// Name of the function being inlined
    pub function_name: String,
    /// Caption of the call node inlining it
    pub call_caption: String,
}

/// Code-generation backend.
///
/// Every operation takes already-compiled handles. Operations that can fail
/// record a diagnostic through [`MaterialCompiler::error`] and return the
/// sentinel; they never panic on ill-typed input.
pub trait MaterialCompiler {
    /// Record a diagnostic and return the failure sentinel
    fn error(&mut self, message: &str) -> ExpressionError;

    /// Number of diagnostics recorded so far
    fn error_count(&self) -> usize;

    /// Scalar literal
    fn constant(&mut self, x: f32) -> CodeResult;
    /// Two component literal
    fn constant2(&mut self, x: f32, y: f32) -> CodeResult;
    /// Three component literal
    fn constant3(&mut self, x: f32, y: f32, z: f32) -> CodeResult;
    /// Four component literal
    fn constant4(&mut self, x: f32, y: f32, z: f32, w: f32) -> CodeResult;

    /// Type of a compiled value
    fn get_type(&self, code: Code) -> ValueType;
    /// Convert to `dest`, truncating or zero padding float vectors
    fn force_cast(&mut self, code: Code, dest: ValueType) -> CodeResult;
    /// Convert to `dest` where that is lossless or a narrowing of floats
    fn valid_cast(&mut self, code: Code, dest: ValueType) -> CodeResult;

    /// `a + b`
    fn add(&mut self, a: Code, b: Code) -> CodeResult;
    /// `a - b`
    fn sub(&mut self, a: Code, b: Code) -> CodeResult;
    /// `a * b`
    fn mul(&mut self, a: Code, b: Code) -> CodeResult;
    /// `a / b`
    fn div(&mut self, a: Code, b: Code) -> CodeResult;
    /// Component-wise minimum
    fn min(&mut self, a: Code, b: Code) -> CodeResult;
    /// Component-wise maximum
    fn max(&mut self, a: Code, b: Code) -> CodeResult;
    /// Clamp `x` into `[min, max]`
    fn clamp(&mut self, x: Code, min: Code, max: Code) -> CodeResult;
    /// Linear interpolation
    fn lerp(&mut self, a: Code, b: Code, alpha: Code) -> CodeResult;
    /// Dot product
    fn dot(&mut self, a: Code, b: Code) -> CodeResult;
    /// Cross product of two 3-vectors
    fn cross(&mut self, a: Code, b: Code) -> CodeResult;
    /// `base` raised to `exponent`
    fn power(&mut self, base: Code, exponent: Code) -> CodeResult;
    /// Floating point remainder
    fn fmod(&mut self, a: Code, b: Code) -> CodeResult;
    /// Absolute value
    fn abs(&mut self, x: Code) -> CodeResult;
    /// Round down
    fn floor(&mut self, x: Code) -> CodeResult;
    /// Round up
    fn ceil(&mut self, x: Code) -> CodeResult;
    /// Fractional part
    fn frac(&mut self, x: Code) -> CodeResult;
    /// Square root
    fn square_root(&mut self, x: Code) -> CodeResult;
    /// Base 2 logarithm
    fn logarithm2(&mut self, x: Code) -> CodeResult;
    /// Sine
    fn sine(&mut self, x: Code) -> CodeResult;
    /// Cosine
    fn cosine(&mut self, x: Code) -> CodeResult;
    /// Clamp into `[0, 1]`
    fn saturate(&mut self, x: Code) -> CodeResult;
    /// Normalize a vector
    fn normalize(&mut self, x: Code) -> CodeResult;
    /// Select channels; an empty mask returns `x` unchanged
    fn component_mask(&mut self, x: Code, mask: ComponentMask) -> CodeResult;
    /// Concatenate channels of `a` and `b`
    fn append_vector(&mut self, a: Code, b: Code) -> CodeResult;
    /// Runtime three-way branch on `a` compared to `b`
    fn if_(
        &mut self,
        a: Code,
        b: Code,
        a_greater_than_b: Code,
        a_equals_b: Option<Code>,
        a_less_than_b: Code,
        threshold: Code,
    ) -> CodeResult;

    /// Compile-time boolean literal
    fn static_bool(&mut self, value: bool) -> CodeResult;
    /// Named compile-time boolean the material instance may override
    fn static_bool_parameter(&mut self, name: &str, default: bool) -> CodeResult;
    /// Resolve a compiled value to a literal boolean
    fn get_static_bool_value(&mut self, code: Code) -> Result<bool, ExpressionError>;
    /// Named scalar parameter
    fn scalar_parameter(&mut self, name: &str, default: f32) -> CodeResult;
    /// Named vector parameter
    fn vector_parameter(&mut self, name: &str, default: [f32; 4]) -> CodeResult;

    /// Quality tier being compiled
    fn quality_level(&self) -> QualityLevel;
    /// Feature tier being compiled
    fn feature_level(&self) -> FeatureLevel;

    /// Enter a function body
    fn push_function(&mut self, frame: FunctionFrame);
    /// Leave the innermost function body
    fn pop_function(&mut self) -> Option<FunctionFrame>;

    /// Texture object from an asset reference
    fn texture(&mut self, reference: &str, kind: TextureKind) -> CodeResult;
    /// Sample a texture object
    fn texture_sample(&mut self, texture: Code, uv: Code) -> CodeResult;
    /// Mesh texture coordinate channel
    fn texture_coordinate(&mut self, index: u32, u_tiling: f32, v_tiling: f32) -> CodeResult;
    /// Scene, view, particle or instance value
    fn scene_property(&mut self, property: SceneProperty) -> CodeResult;
    /// Inline user code with named arguments
    fn custom_expression(
        &mut self,
        code: &str,
        output_type: ValueType,
        inputs: &[(String, Code)],
    ) -> CodeResult;
}
