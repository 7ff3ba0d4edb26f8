// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference backend producing HLSL-flavoured code.
//!
//! Every compiled value becomes a chunk with a type and a definition.
//! Literals and other leaf values are inlined where they are used; the rest
//! are emitted as numbered locals. Identical chunks are shared, so two
//! handles are equal exactly when they denote the same code.

use crate::compiler::{
    Code, CodeResult, ExpressionError, FeatureLevel, FunctionFrame, MaterialCompiler,
    QualityLevel, SceneProperty, TextureKind,
};
use crate::property::MaterialProperty;
use crate::settings::CompileSettings;
use crate::value_type::{ComponentMask, ValueType};
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::debug;

#[derive(Debug, Clone)]
struct Chunk {
    value_type: ValueType,
    definition: String,
    /// Inlined at each use instead of being declared as a local
    inline: bool,
}

/// Code generated for a material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedMaterial {
    /// Shader source
    pub source: String,
    /// Diagnostics recorded while compiling
    pub diagnostics: Vec<String>,
}

/// In-crate [`MaterialCompiler`] used by tests and the command line compiler
#[derive(Debug, Default)]
pub struct HlslTranslator {
    settings: CompileSettings,
    chunks: Vec<Chunk>,
    chunk_lookup: HashMap<(u32, String), Code>,
    static_values: HashMap<Code, bool>,
    custom_functions: Vec<(String, ValueType)>,
    function_stack: Vec<FunctionFrame>,
    diagnostics: Vec<String>,
}

fn type_name(value_type: ValueType) -> &'static str {
    value_type.describe()
}

fn float_literal(x: f32) -> String {
    format!("{x:?}")
}

impl HlslTranslator {
    /// Create a translator for `settings`
    pub fn new(settings: CompileSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Settings being compiled for
    pub fn settings(&self) -> &CompileSettings {
        &self.settings
    }

    /// Diagnostics recorded so far, in order
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Text of a compiled value as it appears where it is used
    pub fn expression_text(&self, code: Code) -> String {
        match self.chunks.get(code.0 as usize) {
            Some(chunk) if chunk.inline => chunk.definition.clone(),
            Some(_) => format!("Local{}", code.0),
            None => "<invalid>".to_string(),
        }
    }

    /// Render the locals and one assignment per compiled channel
    pub fn finish(&self, channels: &[(MaterialProperty, Code)]) -> GeneratedMaterial {
        let mut source = String::new();
        for (index, (body, output_type)) in self.custom_functions.iter().enumerate() {
            let _ = writeln!(
                source,
                "{} CustomExpression{index}(...)\n{{\n    return {body};\n}}\n",
                type_name(*output_type)
            );
        }

        source.push_str("void CalcMaterialAttributes(inout MaterialAttributes Attributes)\n{\n");
        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.inline {
                continue;
            }
            let _ = writeln!(
                source,
                "    {} Local{index} = {};",
                type_name(chunk.value_type),
                chunk.definition
            );
        }
        for (property, code) in channels {
            let _ = writeln!(
                source,
                "    Attributes.{} = {};",
                property.name(),
                self.expression_text(*code)
            );
        }
        source.push_str("}\n");

        GeneratedMaterial {
            source,
            diagnostics: self.diagnostics.clone(),
        }
    }

    fn add_chunk(&mut self, value_type: ValueType, definition: String, inline: bool) -> CodeResult {
        let key = (value_type.bits(), definition);
        if let Some(&code) = self.chunk_lookup.get(&key) {
            return Ok(code);
        }
        let code = Code(self.chunks.len() as u32);
        self.chunks.push(Chunk {
            value_type,
            definition: key.1.clone(),
            inline,
        });
        self.chunk_lookup.insert(key, code);
        Ok(code)
    }

    fn local(&mut self, value_type: ValueType, definition: String) -> CodeResult {
        self.add_chunk(value_type, definition, false)
    }

    fn inline(&mut self, value_type: ValueType, definition: String) -> CodeResult {
        self.add_chunk(value_type, definition, true)
    }

    fn text(&self, code: Code) -> String {
        self.expression_text(code)
    }

    /// Result type of a component-wise operation on `a` and `b`
    fn arithmetic_type(&mut self, a: Code, b: Code) -> Result<ValueType, ExpressionError> {
        let (ta, tb) = (self.get_type(a), self.get_type(b));
        if !ta.is_float() || !tb.is_float() {
            return Err(self.error(&format!(
                "Attempting to perform arithmetic on non-numeric types: {} {}",
                type_name(ta),
                type_name(tb)
            )));
        }
        if ta == tb || tb == ValueType::FLOAT1 {
            Ok(ta)
        } else if ta == ValueType::FLOAT1 {
            Ok(tb)
        } else {
            Err(self.error(&format!(
                "Arithmetic between types {} and {} are undefined",
                type_name(ta),
                type_name(tb)
            )))
        }
    }

    fn binary_operator(&mut self, a: Code, b: Code, operator: &str) -> CodeResult {
        let result_type = self.arithmetic_type(a, b)?;
        let definition = format!("({} {operator} {})", self.text(a), self.text(b));
        self.local(result_type, definition)
    }

    fn binary_function(&mut self, a: Code, b: Code, function: &str) -> CodeResult {
        let result_type = self.arithmetic_type(a, b)?;
        let definition = format!("{function}({}, {})", self.text(a), self.text(b));
        self.local(result_type, definition)
    }

    fn unary_function(&mut self, x: Code, function: &str) -> CodeResult {
        let value_type = self.get_type(x);
        if !value_type.is_float() {
            return Err(self.error(&format!(
                "Attempting to perform arithmetic on non-numeric types: {}",
                type_name(value_type)
            )));
        }
        let definition = format!("{function}({})", self.text(x));
        self.local(value_type, definition)
    }

    /// Narrow or widen a float value between exact widths
    fn resize(&mut self, code: Code, from: u32, to: u32, pad_with_zeros: bool) -> CodeResult {
        let dest = ValueType::float_of_width(to).unwrap_or(ValueType::FLOAT);
        let text = self.text(code);
        if from > to {
            let definition = format!("{text}.{}", ComponentMask::first(to).swizzle());
            return self.local(dest, definition);
        }
        let mut parts = vec![text.clone()];
        let filler = if pad_with_zeros || from != 1 {
            "0.0".to_string()
        } else {
            text
        };
        parts.extend(std::iter::repeat(filler).take((to - from) as usize));
        self.local(dest, format!("float{to}({})", parts.join(", ")))
    }

    fn cast(&mut self, code: Code, dest: ValueType, forced: bool) -> CodeResult {
        let source = self.get_type(code);
        if source == dest || dest.contains(ValueType::MATERIAL_ATTRIBUTES) {
            return Ok(code);
        }
        if source.is_float() && dest.is_float() {
            return match (source.component_count(), dest.component_count()) {
                (_, None) => Ok(code),
                (Some(from), Some(to)) if from > to || from == 1 || forced => {
                    self.resize(code, from, to, forced)
                }
                _ => Err(self.error(&format!(
                    "Cannot cast from {} to {}.",
                    type_name(source),
                    type_name(dest)
                ))),
            };
        }
        if !source.is_empty() && dest.contains(source) {
            return Ok(code);
        }
        if forced {
            return Err(self.error("Cannot force a cast between non-numeric types."));
        }
        Err(self.error(&format!(
            "Cannot cast from {} to {}.",
            type_name(source),
            type_name(dest)
        )))
    }
}

impl MaterialCompiler for HlslTranslator {
    fn error(&mut self, message: &str) -> ExpressionError {
        let message = match self.function_stack.last() {
            Some(frame) => format!("Function {}: {message}", frame.function_name),
            None => message.to_string(),
        };
        debug!(diagnostic = %message, "Material compile error");
        self.diagnostics.push(message);
        ExpressionError
    }

    fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    fn constant(&mut self, x: f32) -> CodeResult {
        self.inline(ValueType::FLOAT1, float_literal(x))
    }

    fn constant2(&mut self, x: f32, y: f32) -> CodeResult {
        let definition = format!("float2({}, {})", float_literal(x), float_literal(y));
        self.inline(ValueType::FLOAT2, definition)
    }

    fn constant3(&mut self, x: f32, y: f32, z: f32) -> CodeResult {
        let definition = format!(
            "float3({}, {}, {})",
            float_literal(x),
            float_literal(y),
            float_literal(z)
        );
        self.inline(ValueType::FLOAT3, definition)
    }

    fn constant4(&mut self, x: f32, y: f32, z: f32, w: f32) -> CodeResult {
        let definition = format!(
            "float4({}, {}, {}, {})",
            float_literal(x),
            float_literal(y),
            float_literal(z),
            float_literal(w)
        );
        self.inline(ValueType::FLOAT4, definition)
    }

    fn get_type(&self, code: Code) -> ValueType {
        self.chunks
            .get(code.0 as usize)
            .map_or(ValueType::UNKNOWN, |chunk| chunk.value_type)
    }

    fn force_cast(&mut self, code: Code, dest: ValueType) -> CodeResult {
        self.cast(code, dest, true)
    }

    fn valid_cast(&mut self, code: Code, dest: ValueType) -> CodeResult {
        self.cast(code, dest, false)
    }

    fn add(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_operator(a, b, "+")
    }

    fn sub(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_operator(a, b, "-")
    }

    fn mul(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_operator(a, b, "*")
    }

    fn div(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_operator(a, b, "/")
    }

    fn min(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_function(a, b, "min")
    }

    fn max(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_function(a, b, "max")
    }

    fn clamp(&mut self, x: Code, min: Code, max: Code) -> CodeResult {
        self.arithmetic_type(x, min)?;
        let result_type = self.arithmetic_type(x, max)?;
        let definition = format!("clamp({}, {}, {})", self.text(x), self.text(min), self.text(max));
        self.local(result_type, definition)
    }

    fn lerp(&mut self, a: Code, b: Code, alpha: Code) -> CodeResult {
        let blended = self.arithmetic_type(a, b)?;
        let alpha_type = self.get_type(alpha);
        if alpha_type != ValueType::FLOAT1 && alpha_type != blended {
            return Err(self.error(&format!(
                "Arithmetic between types {} and {} are undefined",
                type_name(blended),
                type_name(alpha_type)
            )));
        }
        let definition = format!("lerp({}, {}, {})", self.text(a), self.text(b), self.text(alpha));
        self.local(blended, definition)
    }

    fn dot(&mut self, a: Code, b: Code) -> CodeResult {
        self.arithmetic_type(a, b)?;
        let definition = format!("dot({}, {})", self.text(a), self.text(b));
        self.local(ValueType::FLOAT1, definition)
    }

    fn cross(&mut self, a: Code, b: Code) -> CodeResult {
        let a = self.valid_cast(a, ValueType::FLOAT3)?;
        let b = self.valid_cast(b, ValueType::FLOAT3)?;
        let definition = format!("cross({}, {})", self.text(a), self.text(b));
        self.local(ValueType::FLOAT3, definition)
    }

    fn power(&mut self, base: Code, exponent: Code) -> CodeResult {
        self.binary_function(base, exponent, "pow")
    }

    fn fmod(&mut self, a: Code, b: Code) -> CodeResult {
        self.binary_function(a, b, "fmod")
    }

    fn abs(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "abs")
    }

    fn floor(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "floor")
    }

    fn ceil(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "ceil")
    }

    fn frac(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "frac")
    }

    fn square_root(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "sqrt")
    }

    fn logarithm2(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "log2")
    }

    fn sine(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "sin")
    }

    fn cosine(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "cos")
    }

    fn saturate(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "saturate")
    }

    fn normalize(&mut self, x: Code) -> CodeResult {
        self.unary_function(x, "normalize")
    }

    fn component_mask(&mut self, x: Code, mask: ComponentMask) -> CodeResult {
        if mask.is_empty() {
            return Ok(x);
        }
        let source = self.get_type(x);
        let available = source.component_count().unwrap_or(0);
        if !source.is_float() || available < mask.required_components() {
            let bits: String = [ComponentMask::R, ComponentMask::G, ComponentMask::B, ComponentMask::A]
                .into_iter()
                .map(|channel| if mask.contains(channel) { '1' } else { '0' })
                .collect();
            return Err(self.error(&format!(
                "Not enough components in ({}) for component mask {bits}",
                self.text(x)
            )));
        }
        let result_type = ValueType::float_of_width(mask.channel_count()).unwrap_or(ValueType::FLOAT);
        if result_type == source && mask == ComponentMask::first(available) {
            return Ok(x);
        }
        let definition = format!("{}.{}", self.text(x), mask.swizzle());
        self.local(result_type, definition)
    }

    fn append_vector(&mut self, a: Code, b: Code) -> CodeResult {
        let (ta, tb) = (self.get_type(a), self.get_type(b));
        let width = match (ta.component_count(), tb.component_count()) {
            (Some(wa), Some(wb)) if wa + wb <= 4 => wa + wb,
            (Some(_), Some(_)) => {
                return Err(self.error(&format!(
                    "Cannot append {} and {}, the result would have more than four components",
                    type_name(ta),
                    type_name(tb)
                )));
            }
            _ => {
                return Err(self.error(&format!(
                    "Attempting to perform arithmetic on non-numeric types: {} {}",
                    type_name(ta),
                    type_name(tb)
                )));
            }
        };
        let result_type = ValueType::float_of_width(width).unwrap_or(ValueType::FLOAT);
        let definition = format!("float{width}({}, {})", self.text(a), self.text(b));
        self.local(result_type, definition)
    }

    fn if_(
        &mut self,
        a: Code,
        b: Code,
        a_greater_than_b: Code,
        a_equals_b: Option<Code>,
        a_less_than_b: Code,
        threshold: Code,
    ) -> CodeResult {
        let a = self.valid_cast(a, ValueType::FLOAT1)?;
        let b = self.valid_cast(b, ValueType::FLOAT1)?;
        let mut result_type = self.arithmetic_type(a_greater_than_b, a_less_than_b)?;
        if let Some(equals) = a_equals_b {
            result_type = self.arithmetic_type(a_greater_than_b, equals)?;
        }

        let (ta, tb) = (self.text(a), self.text(b));
        let greater = self.text(a_greater_than_b);
        let less = self.text(a_less_than_b);
        let definition = match a_equals_b {
            Some(equals) => format!(
                "((abs({ta} - {tb}) > {}) ? (({ta} >= {tb}) ? {greater} : {less}) : {})",
                self.text(threshold),
                self.text(equals)
            ),
            None => format!("(({ta} >= {tb}) ? {greater} : {less})"),
        };
        self.local(result_type, definition)
    }

    fn static_bool(&mut self, value: bool) -> CodeResult {
        let code = self.inline(ValueType::STATIC_BOOL, value.to_string())?;
        self.static_values.insert(code, value);
        Ok(code)
    }

    fn static_bool_parameter(&mut self, name: &str, default: bool) -> CodeResult {
        let value = self
            .settings
            .static_parameter_overrides
            .get(name)
            .copied()
            .unwrap_or(default);
        self.static_bool(value)
    }

    fn get_static_bool_value(&mut self, code: Code) -> Result<bool, ExpressionError> {
        let value_type = self.get_type(code);
        match self.static_values.get(&code) {
            Some(&value) if value_type == ValueType::STATIC_BOOL => Ok(value),
            _ => Err(self.error(&format!(
                "Failed to cast {} input to static bool type",
                type_name(value_type)
            ))),
        }
    }

    fn scalar_parameter(&mut self, name: &str, default: f32) -> CodeResult {
        let definition = format!("ScalarParameter(\"{name}\", {})", float_literal(default));
        self.inline(ValueType::FLOAT1, definition)
    }

    fn vector_parameter(&mut self, name: &str, default: [f32; 4]) -> CodeResult {
        let [x, y, z, w] = default.map(float_literal);
        let definition = format!("VectorParameter(\"{name}\", float4({x}, {y}, {z}, {w}))");
        self.inline(ValueType::FLOAT4, definition)
    }

    fn quality_level(&self) -> QualityLevel {
        self.settings.quality_level
    }

    fn feature_level(&self) -> FeatureLevel {
        self.settings.feature_level
    }

    fn push_function(&mut self, frame: FunctionFrame) {
        self.function_stack.push(frame);
    }

    fn pop_function(&mut self) -> Option<FunctionFrame> {
        self.function_stack.pop()
    }

    fn texture(&mut self, reference: &str, kind: TextureKind) -> CodeResult {
        let definition = match kind {
            TextureKind::Texture2D => format!("Texture2DReference(\"{reference}\")"),
            TextureKind::Cube => format!("TextureCubeReference(\"{reference}\")"),
        };
        self.inline(kind.value_type(), definition)
    }

    fn texture_sample(&mut self, texture: Code, uv: Code) -> CodeResult {
        let texture_type = self.get_type(texture);
        let uv_type = if texture_type == ValueType::TEXTURE2D {
            ValueType::FLOAT2
        } else if texture_type == ValueType::TEXTURE_CUBE {
            ValueType::FLOAT3
        } else {
            return Err(self.error(&format!(
                "Sampling requires a texture object, got {}",
                type_name(texture_type)
            )));
        };
        let uv = self.valid_cast(uv, uv_type)?;
        let definition = format!("{}.Sample(Sampler, {})", self.text(texture), self.text(uv));
        self.local(ValueType::FLOAT4, definition)
    }

    fn texture_coordinate(&mut self, index: u32, u_tiling: f32, v_tiling: f32) -> CodeResult {
        let coordinates = self.inline(ValueType::FLOAT2, format!("TexCoords[{index}].xy"))?;
        if u_tiling == 1.0 && v_tiling == 1.0 {
            return Ok(coordinates);
        }
        let tiling = self.constant2(u_tiling, v_tiling)?;
        self.mul(coordinates, tiling)
    }

    fn scene_property(&mut self, property: SceneProperty) -> CodeResult {
        self.inline(property.value_type(), format!("Scene.{}", property.name()))
    }

    fn custom_expression(
        &mut self,
        code: &str,
        output_type: ValueType,
        inputs: &[(String, Code)],
    ) -> CodeResult {
        let index = match self
            .custom_functions
            .iter()
            .position(|(body, value_type)| body == code && *value_type == output_type)
        {
            Some(index) => index,
            None => {
                self.custom_functions.push((code.to_string(), output_type));
                self.custom_functions.len() - 1
            }
        };
        let arguments: Vec<String> = inputs.iter().map(|(_, code)| self.text(*code)).collect();
        let definition = format!("CustomExpression{index}({})", arguments.join(", "));
        self.local(output_type, definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_chunks_share_a_handle() {
        let mut translator = HlslTranslator::default();
        let a = translator.constant(1.0).unwrap();
        let b = translator.constant(1.0).unwrap();
        assert_eq!(a, b);

        let sum = translator.add(a, b).unwrap();
        assert_eq!(translator.add(a, b).unwrap(), sum);
        assert_eq!(translator.expression_text(a), "1.0");
        assert_eq!(translator.expression_text(sum), format!("Local{}", sum.0));
    }

    #[test]
    fn test_scalar_broadcasts_in_arithmetic() {
        let mut translator = HlslTranslator::default();
        let v = translator.constant3(1.0, 2.0, 3.0).unwrap();
        let s = translator.constant(2.0).unwrap();
        let product = translator.mul(v, s).unwrap();
        assert_eq!(translator.get_type(product), ValueType::FLOAT3);

        let w = translator.constant2(1.0, 1.0).unwrap();
        assert!(translator.add(v, w).is_err());
        assert_eq!(
            translator.diagnostics(),
            ["Arithmetic between types float3 and float2 are undefined"]
        );
    }

    #[test]
    fn test_valid_cast_rules() {
        let mut translator = HlslTranslator::default();
        let v = translator.constant3(1.0, 2.0, 3.0).unwrap();
        let narrowed = translator.valid_cast(v, ValueType::FLOAT2).unwrap();
        assert_eq!(translator.get_type(narrowed), ValueType::FLOAT2);

        let s = translator.constant(0.5).unwrap();
        let replicated = translator.valid_cast(s, ValueType::FLOAT4).unwrap();
        assert_eq!(translator.get_type(replicated), ValueType::FLOAT4);

        let xy = translator.constant2(1.0, 2.0).unwrap();
        assert!(translator.valid_cast(xy, ValueType::FLOAT3).is_err());
        let padded = translator.force_cast(xy, ValueType::FLOAT3).unwrap();
        assert_eq!(translator.get_type(padded), ValueType::FLOAT3);

        let texture = translator.texture("Noise", TextureKind::Texture2D).unwrap();
        assert!(translator.force_cast(texture, ValueType::FLOAT1).is_err());
        assert_eq!(translator.valid_cast(texture, ValueType::TEXTURE).unwrap(), texture);

        assert_eq!(
            translator.diagnostics(),
            [
                "Cannot cast from float2 to float3.",
                "Cannot force a cast between non-numeric types.",
            ]
        );
    }

    #[test]
    fn test_component_mask_checks_width() {
        let mut translator = HlslTranslator::default();
        let xy = translator.constant2(1.0, 2.0).unwrap();
        let y = translator.component_mask(xy, ComponentMask::G).unwrap();
        assert_eq!(translator.get_type(y), ValueType::FLOAT1);

        assert!(translator.component_mask(xy, ComponentMask::B).is_err());
        assert_eq!(
            translator.diagnostics(),
            ["Not enough components in (float2(1.0, 2.0)) for component mask 0010"]
        );
    }

    #[test]
    fn test_static_bool_parameter_override() {
        let mut settings = CompileSettings::default();
        settings
            .static_parameter_overrides
            .insert("Detail".to_string(), false);
        let mut translator = HlslTranslator::new(settings);

        let overridden = translator.static_bool_parameter("Detail", true).unwrap();
        assert_eq!(translator.get_static_bool_value(overridden), Ok(false));
        let untouched = translator.static_bool_parameter("Other", true).unwrap();
        assert_eq!(translator.get_static_bool_value(untouched), Ok(true));
    }

    #[test]
    fn test_errors_inside_functions_are_prefixed() {
        let mut translator = HlslTranslator::default();
        translator.push_function(FunctionFrame {
            function_name: "Blend".to_string(),
            call_caption: "Blend".to_string(),
        });
        translator.error("Something failed");
        translator.pop_function();
        translator.error("Outside");
        assert_eq!(
            translator.diagnostics(),
            ["Function Blend: Something failed", "Outside"]
        );
    }

    #[test]
    fn test_finish_renders_channels() {
        let mut translator = HlslTranslator::default();
        let a = translator.constant(0.25).unwrap();
        let b = translator.scene_property(SceneProperty::Time).unwrap();
        let sum = translator.add(a, b).unwrap();

        let generated = translator.finish(&[(MaterialProperty::Roughness, sum)]);
        assert!(generated.source.contains("float Local"));
        assert!(generated.source.contains("(0.25 + Scene.Time)"));
        assert!(generated.source.contains(&format!("Attributes.Roughness = Local{};", sum.0)));
        assert!(generated.diagnostics.is_empty());
    }
}
