// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture object, sampling and coordinate nodes.

use crate::compiler::{CodeResult, TextureKind};
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::{InputSlot, OutputSlot};
use crate::value_type::{ComponentMask, ValueType};
use serde::{Deserialize, Serialize};

/// A texture referenced by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureObject {
    /// Texture reference, empty when none is assigned
    #[serde(default)]
    pub texture: String,
    /// 2D or cube
    #[serde(default)]
    pub kind: TextureKind,
}

impl TextureObject {
    /// Create a texture object
    pub fn new(texture: impl Into<String>, kind: TextureKind) -> Self {
        Self {
            texture: texture.into(),
            kind,
        }
    }
}

impl Expression for TextureObject {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        if self.texture.is_empty() {
            return Err(ctx.error("Requires valid texture"));
        }
        ctx.compiler().texture(&self.texture, self.kind)
    }

    /// Previews by sampling itself with the first UV channel
    fn compile_preview(
        &self,
        ctx: &mut CompileContext<'_>,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let texture = self.compile(ctx, output_index, multiplex)?;
        let uv = ctx.compiler().texture_coordinate(0, 1.0, 1.0)?;
        ctx.compiler().texture_sample(texture, uv)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["Texture Object".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        self.kind.value_type()
    }
}

/// Samples a texture at a coordinate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureSample {
    /// UVs; the mesh coordinate channel `coordinate_index` when unconnected
    #[serde(default)]
    pub coordinates: InputSlot,
    /// Texture object; `texture` is used when unconnected
    #[serde(default)]
    pub texture_object: InputSlot,
    /// Texture sampled when no texture object is connected
    #[serde(default)]
    pub texture: String,
    /// Kind of `texture`
    #[serde(default)]
    pub kind: TextureKind,
    /// Coordinate channel used when `coordinates` is unconnected
    #[serde(default)]
    pub coordinate_index: u32,
}

impl TextureSample {
    /// Sample a named texture
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: texture.into(),
            ..Self::default()
        }
    }

    /// Sample a connected texture object
    pub fn with_texture_object(mut self, slot: InputSlot) -> Self {
        self.texture_object = slot;
        self
    }

    /// Read the coordinates from an input
    pub fn with_coordinates(mut self, slot: InputSlot) -> Self {
        self.coordinates = slot;
        self
    }
}

impl Expression for TextureSample {
    /// Compiles the full sample; outputs select channels through their masks.
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        let texture = if ctx.is_connected(&self.texture_object) {
            ctx.compile_input(&self.texture_object)?
        } else if !self.texture.is_empty() {
            ctx.compiler().texture(&self.texture, self.kind)?
        } else {
            return Err(ctx.error("Missing input texture"));
        };

        let uv = if ctx.is_connected(&self.coordinates) {
            ctx.compile_input(&self.coordinates)?
        } else {
            ctx.compiler().texture_coordinate(self.coordinate_index, 1.0, 1.0)?
        };
        ctx.compiler().texture_sample(texture, uv)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["Texture Sample".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.coordinates, &self.texture_object]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.coordinates, &mut self.texture_object]
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        match index {
            0 => "UVs",
            1 => "Tex",
            _ => "",
        }
        .to_string()
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, _: usize) -> bool {
        false
    }

    fn input_type(&self, _: &GraphContext<'_>, index: usize) -> ValueType {
        if index == 1 {
            ValueType::TEXTURE
        } else {
            ValueType::FLOAT
        }
    }

    fn outputs(&self, _: &GraphContext<'_>) -> Vec<OutputSlot> {
        vec![
            OutputSlot::masked("RGB", ComponentMask::RGB),
            OutputSlot::masked("R", ComponentMask::R),
            OutputSlot::masked("G", ComponentMask::G),
            OutputSlot::masked("B", ComponentMask::B),
            OutputSlot::masked("A", ComponentMask::A),
            OutputSlot::masked("RGBA", ComponentMask::RGBA),
        ]
    }
}

/// Mesh texture coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureCoordinate {
    /// UV channel
    #[serde(default)]
    pub coordinate_index: u32,
    /// Horizontal tiling
    pub u_tiling: f32,
    /// Vertical tiling
    pub v_tiling: f32,
}

impl Default for TextureCoordinate {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TextureCoordinate {
    /// Untiled coordinates of one UV channel
    pub fn new(coordinate_index: u32) -> Self {
        Self {
            coordinate_index,
            u_tiling: 1.0,
            v_tiling: 1.0,
        }
    }
}

impl Expression for TextureCoordinate {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler()
            .texture_coordinate(self.coordinate_index, self.u_tiling, self.v_tiling)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![format!("TexCoord[{}]", self.coordinate_index)]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::FLOAT2
    }
}
