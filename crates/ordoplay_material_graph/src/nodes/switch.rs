// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile-time booleans and the static branches they drive.
//!
//! A static switch compiles only the branch its condition selects. The other
//! branch is never visited, so errors inside it cannot fail the compile.

use crate::compiler::{CodeResult, ExpressionError};
use crate::context::CompileContext;
use crate::function::FunctionLibrary;
use crate::graph::GraphContext;
use crate::node::Expression;
use crate::port::InputSlot;
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};

fn bool_label(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Whether a two-branch switch produces the attribute bus: at least one branch
/// is connected and every connected branch carries the bus.
fn branches_carry_attributes(cx: &GraphContext<'_>, a: &InputSlot, b: &InputSlot) -> bool {
    let connected: Vec<&InputSlot> = [a, b]
        .into_iter()
        .filter(|slot| cx.is_connected(slot))
        .collect();
    !connected.is_empty()
        && connected
            .into_iter()
            .all(|slot| cx.feeds_material_attributes(slot))
}

/// Compile the branch `value` selects, forwarding the bus channel
fn compile_branch(
    ctx: &mut CompileContext<'_>,
    value: bool,
    a: &InputSlot,
    b: &InputSlot,
    multiplex: Option<usize>,
) -> CodeResult {
    let branch = if value { a } else { b };
    if !ctx.is_connected(branch) {
        return Err(ctx.error(format!("Missing {} input", bool_label(value))));
    }
    ctx.compile_input_multiplexed(branch, multiplex)
}

/// Compile-time boolean literal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticBool {
    /// Value
    pub value: bool,
}

impl StaticBool {
    /// Create a literal
    pub fn new(value: bool) -> Self {
        Self { value }
    }
}

impl Expression for StaticBool {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler().static_bool(self.value)
    }

    /// A compile-time boolean has nothing to show.
    fn compile_preview(&self, _: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        Err(ExpressionError)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![format!("Static Bool ({})", bool_label(self.value))]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        Vec::new()
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        Vec::new()
    }

    fn output_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::STATIC_BOOL
    }
}

/// Named compile-time boolean a material instance may override
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticBoolParameter {
    /// Parameter name
    pub name: String,
    /// Value used when not overridden
    pub default_value: bool,
}

impl StaticBoolParameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, default_value: bool) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }
}

impl Expression for StaticBoolParameter {
    fn compile(&self, ctx: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        ctx.compiler()
            .static_bool_parameter(&self.name, self.default_value)
    }

    fn compile_preview(&self, _: &mut CompileContext<'_>, _: usize, _: Option<usize>) -> CodeResult {
        Err(ExpressionError)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![
            format!("Static Bool Param ({})", bool_label(self.default_value)),
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
        ValueType::STATIC_BOOL
    }
}

/// Branch chosen at compile time by a static boolean input or a literal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSwitch {
    /// Used when `value` is unconnected
    pub default_value: bool,
    /// Compiled when the condition is true
    #[serde(default)]
    pub a: InputSlot,
    /// Compiled when the condition is false
    #[serde(default)]
    pub b: InputSlot,
    /// Optional static boolean condition
    #[serde(default)]
    pub value: InputSlot,
}

impl StaticSwitch {
    /// Create a switch over two branches
    pub fn new(a: InputSlot, b: InputSlot) -> Self {
        Self {
            default_value: false,
            a,
            b,
            value: InputSlot::new(),
        }
    }

    /// Drive the switch from a static boolean
    pub fn with_value(mut self, value: InputSlot) -> Self {
        self.value = value;
        self
    }

    /// Set the literal condition
    pub fn with_default(mut self, default_value: bool) -> Self {
        self.default_value = default_value;
        self
    }
}

impl Expression for StaticSwitch {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let value = if ctx.is_connected(&self.value) {
            let condition = ctx.compile_input(&self.value)?;
            ctx.compiler().get_static_bool_value(condition)?
        } else {
            self.default_value
        };
        compile_branch(ctx, value, &self.a, &self.b, multiplex)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec!["Switch".to_string()]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.a, &self.b, &self.value]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.a, &mut self.b, &mut self.value]
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        ["True", "False", "Value"]
            .get(index)
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    fn is_input_connection_required(&self, _: &GraphContext<'_>, index: usize) -> bool {
        index != 2
    }

    fn input_type(&self, _: &GraphContext<'_>, index: usize) -> ValueType {
        if index == 2 {
            ValueType::STATIC_BOOL
        } else {
            ValueType::UNKNOWN
        }
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, _: usize) -> bool {
        branches_carry_attributes(cx, &self.a, &self.b)
    }
}

/// Static branch on a named parameter.
///
/// Both branches must be connected whatever the current value, since an
/// instance may flip the parameter without editing the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticSwitchParameter {
    /// Parameter name
    pub name: String,
    /// Value used when not overridden
    pub default_value: bool,
    /// Compiled when the parameter is true
    #[serde(default)]
    pub a: InputSlot,
    /// Compiled when the parameter is false
    #[serde(default)]
    pub b: InputSlot,
}

impl StaticSwitchParameter {
    /// Create a parameter switch
    pub fn new(name: impl Into<String>, default_value: bool, a: InputSlot, b: InputSlot) -> Self {
        Self {
            name: name.into(),
            default_value,
            a,
            b,
        }
    }
}

impl Expression for StaticSwitchParameter {
    fn compile(
        &self,
        ctx: &mut CompileContext<'_>,
        _: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let missing_a = !ctx.is_connected(&self.a);
        let missing_b = !ctx.is_connected(&self.b);
        if missing_a {
            ctx.error("Missing A input");
        }
        if missing_b {
            ctx.error("Missing B input");
        }
        if missing_a || missing_b {
            return Err(ExpressionError);
        }

        let parameter = ctx
            .compiler()
            .static_bool_parameter(&self.name, self.default_value)?;
        let value = ctx.compiler().get_static_bool_value(parameter)?;
        compile_branch(ctx, value, &self.a, &self.b, multiplex)
    }

    fn captions(&self, _: &FunctionLibrary) -> Vec<String> {
        vec![
            format!("Switch Param ({})", bool_label(self.default_value)),
            format!("'{}'", self.name),
        ]
    }

    fn inputs(&self) -> Vec<&InputSlot> {
        vec![&self.a, &self.b]
    }

    fn inputs_mut(&mut self) -> Vec<&mut InputSlot> {
        vec![&mut self.a, &mut self.b]
    }

    fn input_name(&self, _: &GraphContext<'_>, index: usize) -> String {
        ["True", "False"]
            .get(index)
            .copied()
            .unwrap_or_default()
            .to_string()
    }

    fn input_type(&self, _: &GraphContext<'_>, _: usize) -> ValueType {
        ValueType::UNKNOWN
    }

    fn is_result_material_attributes(&self, cx: &GraphContext<'_>, _: usize) -> bool {
        branches_carry_attributes(cx, &self.a, &self.b)
    }
}
