// SPDX-License-Identifier: MIT OR Apache-2.0
//! Channel schema of the attribute bus.
//!
//! Channel indices are persisted in saved graphs (as input and output
//! indices of the aggregate/break nodes and as multiplex indices), so the
//! order below is fixed. New channels go at the end.

use crate::compiler::{CodeResult, MaterialCompiler};
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Number of channels carried by the attribute bus
pub const MATERIAL_PROPERTY_COUNT: usize = 28;

/// One named channel of the attribute bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum MaterialProperty {
    BaseColor,
    Metallic,
    Specular,
    Roughness,
    EmissiveColor,
    Opacity,
    OpacityMask,
    Normal,
    WorldPositionOffset,
    WorldDisplacement,
    TessellationMultiplier,
    SubsurfaceColor,
    ClearCoat,
    ClearCoatRoughness,
    AmbientOcclusion,
    Refraction,
    CustomizedUv0,
    CustomizedUv1,
    CustomizedUv2,
    CustomizedUv3,
    CustomizedUv4,
    CustomizedUv5,
    CustomizedUv6,
    CustomizedUv7,
    PixelDepthOffset,
    ShadingModel,
    Anisotropy,
    Tangent,
}

const_assert_eq!(MaterialProperty::Tangent as usize + 1, MATERIAL_PROPERTY_COUNT);
const_assert_eq!(MaterialProperty::CustomizedUv7 as usize - MaterialProperty::CustomizedUv0 as usize, 7);

/// Every channel in bus order
pub const ATTRIBUTE_CHANNELS: [MaterialProperty; MATERIAL_PROPERTY_COUNT] = [
    MaterialProperty::BaseColor,
    MaterialProperty::Metallic,
    MaterialProperty::Specular,
    MaterialProperty::Roughness,
    MaterialProperty::EmissiveColor,
    MaterialProperty::Opacity,
    MaterialProperty::OpacityMask,
    MaterialProperty::Normal,
    MaterialProperty::WorldPositionOffset,
    MaterialProperty::WorldDisplacement,
    MaterialProperty::TessellationMultiplier,
    MaterialProperty::SubsurfaceColor,
    MaterialProperty::ClearCoat,
    MaterialProperty::ClearCoatRoughness,
    MaterialProperty::AmbientOcclusion,
    MaterialProperty::Refraction,
    MaterialProperty::CustomizedUv0,
    MaterialProperty::CustomizedUv1,
    MaterialProperty::CustomizedUv2,
    MaterialProperty::CustomizedUv3,
    MaterialProperty::CustomizedUv4,
    MaterialProperty::CustomizedUv5,
    MaterialProperty::CustomizedUv6,
    MaterialProperty::CustomizedUv7,
    MaterialProperty::PixelDepthOffset,
    MaterialProperty::ShadingModel,
    MaterialProperty::Anisotropy,
    MaterialProperty::Tangent,
];

/// Channel at a bus index. The single mapping used by every bus reader and writer.
pub fn property_from_index(index: usize) -> Option<MaterialProperty> {
    ATTRIBUTE_CHANNELS.get(index).copied()
}

impl MaterialProperty {
    /// Bus index of the channel
    pub fn index(self) -> usize {
        self as usize
    }

    /// Texture coordinate channel of a customized UV, if this is one
    pub fn customized_uv_index(self) -> Option<u32> {
        let index = self.index();
        let first = Self::CustomizedUv0.index();
        (first..=Self::CustomizedUv7.index())
            .contains(&index)
            .then(|| (index - first) as u32)
    }

    /// Schema name
    pub fn name(self) -> String {
        if let Some(uv) = self.customized_uv_index() {
            return format!("CustomizedUV{uv}");
        }
        let name = match self {
            Self::BaseColor => "BaseColor",
            Self::Metallic => "Metallic",
            Self::Specular => "Specular",
            Self::Roughness => "Roughness",
            Self::EmissiveColor => "EmissiveColor",
            Self::Opacity => "Opacity",
            Self::OpacityMask => "OpacityMask",
            Self::Normal => "Normal",
            Self::WorldPositionOffset => "WorldPositionOffset",
            Self::WorldDisplacement => "WorldDisplacement",
            Self::TessellationMultiplier => "TessellationMultiplier",
            Self::SubsurfaceColor => "SubsurfaceColor",
            Self::ClearCoat => "ClearCoat",
            Self::ClearCoatRoughness => "ClearCoatRoughness",
            Self::AmbientOcclusion => "AmbientOcclusion",
            Self::Refraction => "Refraction",
            Self::PixelDepthOffset => "PixelDepthOffset",
            Self::ShadingModel => "ShadingModel",
            Self::Anisotropy => "Anisotropy",
            _ => "Tangent",
        };
        name.to_string()
    }

    /// Type the channel is cast to
    pub fn value_type(self) -> ValueType {
        if self.customized_uv_index().is_some() {
            return ValueType::FLOAT2;
        }
        match self {
            Self::BaseColor
            | Self::EmissiveColor
            | Self::Normal
            | Self::WorldPositionOffset
            | Self::WorldDisplacement
            | Self::SubsurfaceColor
            | Self::Tangent => ValueType::FLOAT3,
            _ => ValueType::FLOAT1,
        }
    }

    /// Emit the value used when nothing supplies the channel
    pub fn compile_default(self, compiler: &mut dyn MaterialCompiler) -> CodeResult {
        if let Some(uv) = self.customized_uv_index() {
            return compiler.texture_coordinate(uv, 1.0, 1.0);
        }
        match self {
            Self::Opacity
            | Self::OpacityMask
            | Self::TessellationMultiplier
            | Self::ClearCoat
            | Self::AmbientOcclusion
            | Self::Refraction => compiler.constant(1.0),
            Self::Specular | Self::Roughness => compiler.constant(0.5),
            Self::ClearCoatRoughness => compiler.constant(0.1),
            Self::SubsurfaceColor => compiler.constant3(1.0, 1.0, 1.0),
            Self::Normal => compiler.constant3(0.0, 0.0, 1.0),
            Self::Tangent => compiler.constant3(1.0, 0.0, 0.0),
            Self::BaseColor
            | Self::EmissiveColor
            | Self::WorldPositionOffset
            | Self::WorldDisplacement => compiler.constant3(0.0, 0.0, 0.0),
            _ => compiler.constant(0.0),
        }
    }
}
