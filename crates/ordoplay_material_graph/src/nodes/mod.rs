// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node kinds, one module per family.

pub mod attributes;
pub mod constant;
pub mod custom;
pub mod function;
pub mod level_switch;
pub mod math;
pub mod scene;
pub mod switch;
pub mod texture;

pub use attributes::{BreakMaterialAttributes, MakeMaterialAttributes};
pub use constant::{Constant, ConstantVector, ScalarParameter, VectorParameter};
pub use custom::{Custom, CustomInput, CustomOutputType};
pub use function::{
    FunctionCall, FunctionInput, FunctionInputBinding, FunctionInputType, FunctionOutput,
    FunctionOutputBinding,
};
pub use level_switch::{FeatureLevelSwitch, QualitySwitch};
pub use math::{
    AppendVector, Arithmetic, ArithmeticOp, Clamp, ClampMode, ComponentMaskExpression,
    CrossProduct, DotProduct, Fmod, If, LinearInterpolate, Power, UnaryMath, UnaryOp,
};
pub use scene::SceneInput;
pub use switch::{StaticBool, StaticBoolParameter, StaticSwitch, StaticSwitchParameter};
pub use texture::{TextureCoordinate, TextureObject, TextureSample};
