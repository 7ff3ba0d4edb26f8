// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types carried by expression connections.
//!
//! Types are bitmasks rather than exclusive tags: the generic [`ValueType::FLOAT`]
//! covers every float arity, so a `float3` output satisfies a `FLOAT` input.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Set of value kinds an input accepts or an output produces.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ValueType: u32 {
        /// Scalar float
        const FLOAT1 = 1 << 0;
        /// Two component vector
        const FLOAT2 = 1 << 1;
        /// Three component vector
        const FLOAT3 = 1 << 2;
        /// Four component vector
        const FLOAT4 = 1 << 3;
        /// Any float arity
        const FLOAT = Self::FLOAT1.bits() | Self::FLOAT2.bits() | Self::FLOAT3.bits() | Self::FLOAT4.bits();
        /// 2D texture object
        const TEXTURE2D = 1 << 4;
        /// Cube texture object
        const TEXTURE_CUBE = 1 << 5;
        /// Any texture object
        const TEXTURE = Self::TEXTURE2D.bits() | Self::TEXTURE_CUBE.bits();
        /// Compile-time boolean
        const STATIC_BOOL = 1 << 6;
        /// The attribute bus
        const MATERIAL_ATTRIBUTES = 1 << 7;
        /// Not yet resolved
        const UNKNOWN = 1 << 8;
    }
}

impl ValueType {
    /// Check whether an input of this type may read an output of `output` type.
    ///
    /// Unknown on either side always connects. Any two float types connect,
    /// the arity difference is resolved by a cast when compiling.
    pub fn can_connect(self, output: ValueType) -> bool {
        if self.contains(Self::UNKNOWN) || output.contains(Self::UNKNOWN) {
            return true;
        }
        if self.intersects(output) {
            return true;
        }
        self.intersects(Self::FLOAT) && output.intersects(Self::FLOAT)
    }

    /// Whether this type only contains float kinds.
    pub fn is_float(self) -> bool {
        !self.is_empty() && Self::FLOAT.contains(self)
    }

    /// Number of components of an exact float type.
    pub fn component_count(self) -> Option<u32> {
        match self {
            t if t == Self::FLOAT1 => Some(1),
            t if t == Self::FLOAT2 => Some(2),
            t if t == Self::FLOAT3 => Some(3),
            t if t == Self::FLOAT4 => Some(4),
            _ => None,
        }
    }

    /// Exact float type with `components` components.
    pub fn float_of_width(components: u32) -> Option<ValueType> {
        match components {
            1 => Some(Self::FLOAT1),
            2 => Some(Self::FLOAT2),
            3 => Some(Self::FLOAT3),
            4 => Some(Self::FLOAT4),
            _ => None,
        }
    }

    /// Type implied by an output mask; no mask means generic float.
    pub fn from_mask(mask: ComponentMask) -> ValueType {
        Self::float_of_width(mask.channel_count()).unwrap_or(Self::FLOAT)
    }

    /// Short name used in diagnostics and generated code.
    pub fn describe(self) -> &'static str {
        match self {
            t if t == Self::FLOAT1 || t == Self::FLOAT => "float",
            t if t == Self::FLOAT2 => "float2",
            t if t == Self::FLOAT3 => "float3",
            t if t == Self::FLOAT4 => "float4",
            t if t == Self::TEXTURE2D => "texture2D",
            t if t == Self::TEXTURE_CUBE => "textureCube",
            t if t == Self::TEXTURE => "texture",
            t if t == Self::STATIC_BOOL => "bool",
            t if t == Self::MATERIAL_ATTRIBUTES => "MaterialAttributes",
            _ => "unknown",
        }
    }
}

impl Default for ValueType {
    fn default() -> Self {
        Self::FLOAT
    }
}

bitflags! {
    /// Channel selection applied to an output or to the input reading it.
    ///
    /// An empty mask means "every channel".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ComponentMask: u8 {
        /// First channel
        const R = 1 << 0;
        /// Second channel
        const G = 1 << 1;
        /// Third channel
        const B = 1 << 2;
        /// Fourth channel
        const A = 1 << 3;
        /// First three channels
        const RGB = Self::R.bits() | Self::G.bits() | Self::B.bits();
        /// All channels
        const RGBA = Self::RGB.bits() | Self::A.bits();
    }
}

impl ComponentMask {
    /// Number of selected channels.
    pub fn channel_count(self) -> u32 {
        self.bits().count_ones()
    }

    /// Highest channel index selected, plus one.
    pub fn required_components(self) -> u32 {
        8 - self.bits().leading_zeros()
    }

    /// Swizzle suffix such as `rgb` or `ga`.
    pub fn swizzle(self) -> String {
        [(Self::R, 'r'), (Self::G, 'g'), (Self::B, 'b'), (Self::A, 'a')]
            .into_iter()
            .filter(|(channel, _)| self.contains(*channel))
            .map(|(_, name)| name)
            .collect()
    }

    /// Mask covering the first `components` channels.
    pub fn first(components: u32) -> ComponentMask {
        Self::from_bits_truncate(((1u16 << components.min(4)) - 1) as u8)
    }
}
