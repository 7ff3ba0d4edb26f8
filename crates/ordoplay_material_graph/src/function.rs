// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material functions: reusable graphs inlined by call nodes.
//!
//! Call nodes keep one binding per input and output of the function they
//! reference. Bindings are matched by identity first and by name second
//! whenever they are refreshed, so connections survive renames and
//! reordering of the function's inputs and outputs.

use crate::compiler::{CodeResult, MaterialCompiler};
use crate::context::CompileContext;
use crate::graph::{ExpressionGraph, GraphContext};
use crate::node::{Expression, ExpressionKind, NodeId};
use crate::nodes::{
    FunctionCall, FunctionInput, FunctionInputBinding, FunctionOutput, FunctionOutputBinding,
};
use crate::value_type::ValueType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Result type for function library operations
pub type Result<T> = std::result::Result<T, FunctionError>;

/// Identifier of a material function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId(pub Uuid);

impl FunctionId {
    /// Create a new unique function ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FunctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reusable expression graph with named inputs and outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialFunction {
    /// Identity referenced by call nodes
    pub id: FunctionId,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Body
    #[serde(default)]
    pub graph: ExpressionGraph,
    /// Union of the input types, kept by [`FunctionLibrary::update_combined_types`]
    #[serde(default)]
    pub combined_input_types: ValueType,
    /// Union of the output types, kept by [`FunctionLibrary::update_combined_types`]
    #[serde(default)]
    pub combined_output_types: ValueType,
}

impl MaterialFunction {
    /// Create an empty function
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FunctionId::new(),
            name: name.into(),
            description: String::new(),
            graph: ExpressionGraph::new(),
            combined_input_types: ValueType::empty(),
            combined_output_types: ValueType::empty(),
        }
    }

    /// Input nodes ordered by sort priority, ties kept in graph order
    pub fn function_inputs(&self) -> Vec<(NodeId, &FunctionInput)> {
        let mut inputs: Vec<_> = self
            .graph
            .nodes()
            .filter_map(|node| match &node.expression {
                ExpressionKind::FunctionInput(input) => Some((node.id, input)),
                _ => None,
            })
            .collect();
        inputs.sort_by_key(|(_, input)| input.sort_priority);
        inputs
    }

    /// Output nodes ordered by sort priority, ties kept in graph order
    pub fn function_outputs(&self) -> Vec<(NodeId, &FunctionOutput)> {
        let mut outputs: Vec<_> = self
            .graph
            .nodes()
            .filter_map(|node| match &node.expression {
                ExpressionKind::FunctionOutput(output) => Some((node.id, output)),
                _ => None,
            })
            .collect();
        outputs.sort_by_key(|(_, output)| output.sort_priority);
        outputs
    }

    /// Input with identity `id`, else the first named `name`
    pub fn find_input(&self, id: Uuid, name: &str) -> Option<(NodeId, &FunctionInput)> {
        let inputs = self.function_inputs();
        inputs
            .iter()
            .find(|(_, input)| input.id == id)
            .or_else(|| inputs.iter().find(|(_, input)| input.name == name))
            .copied()
    }

    /// Output with identity `id`, else the first named `name`
    pub fn find_output(&self, id: Uuid, name: &str) -> Option<(NodeId, &FunctionOutput)> {
        let outputs = self.function_outputs();
        outputs
            .iter()
            .find(|(_, output)| output.id == id)
            .or_else(|| outputs.iter().find(|(_, output)| output.name == name))
            .copied()
    }

    /// Make input names and output names unique by appending a counter.
    ///
    /// Returns how many nodes were renamed.
    pub fn validate_names(&mut self) -> usize {
        let mut input_names = HashSet::new();
        let mut output_names = HashSet::new();
        let mut renamed = 0;
        for node in self.graph.nodes_mut() {
            let (name, taken) = match &mut node.expression {
                ExpressionKind::FunctionInput(input) => (&mut input.name, &mut input_names),
                ExpressionKind::FunctionOutput(output) => (&mut output.name, &mut output_names),
                _ => continue,
            };
            if taken.contains(name.as_str()) {
                let mut suffix = 1;
                while taken.contains(&format!("{name}{suffix}")) {
                    suffix += 1;
                }
                *name = format!("{name}{suffix}");
                renamed += 1;
            }
            taken.insert(name.clone());
        }
        renamed
    }

    /// Compile one output on its own, with every input reading its preview
    pub fn compile_preview(
        &self,
        library: &FunctionLibrary,
        compiler: &mut dyn MaterialCompiler,
        output_index: usize,
    ) -> CodeResult {
        let mut ctx = CompileContext::new(compiler, library, &self.graph);
        let Some(&(node, _)) = self.function_outputs().get(output_index) else {
            return Err(ctx.compiler().error(&format!(
                "Function {} has no output {output_index}",
                self.name
            )));
        };
        ctx.compile_node(node, 0, None)
    }

    fn combined_types(&self, library: &FunctionLibrary) -> (ValueType, ValueType) {
        let cx = GraphContext::new(&self.graph, library);
        let inputs = self
            .function_inputs()
            .into_iter()
            .fold(ValueType::empty(), |types, (_, input)| {
                types | input.input_type.value_type()
            });
        let outputs = self
            .function_outputs()
            .into_iter()
            .fold(ValueType::empty(), |types, (_, output)| {
                types | output.output_type(&cx, 0)
            });
        (inputs, outputs)
    }

    fn call_targets(&self) -> impl Iterator<Item = FunctionId> + '_ {
        self.graph.nodes().filter_map(|node| match &node.expression {
            ExpressionKind::FunctionCall(call) => call.function,
            _ => None,
        })
    }
}

/// Error from function library operations
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    /// Function not in the library
    #[error("Function not found: {0}")]
    UnknownFunction(FunctionId),

    /// The node is missing or is not a call node
    #[error("Node {0} is not a function call")]
    NotACallNode(NodeId),

    /// Binding would let a function reach itself
    #[error("the call would make function '{0}' depend on itself")]
    Recursive(String),
}

/// Functions call nodes may reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionLibrary {
    functions: IndexMap<FunctionId, MaterialFunction>,
}

impl FunctionLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a function, returning its id
    pub fn insert(&mut self, function: MaterialFunction) -> FunctionId {
        let id = function.id;
        self.functions.insert(id, function);
        id
    }

    /// Function by id
    pub fn get(&self, id: FunctionId) -> Option<&MaterialFunction> {
        self.functions.get(&id)
    }

    /// Function by id, mutably. Call [`FunctionLibrary::refresh_all_calls`]
    /// after changing its inputs or outputs.
    pub fn get_mut(&mut self, id: FunctionId) -> Option<&mut MaterialFunction> {
        self.functions.get_mut(&id)
    }

    /// First function named `name`
    pub fn find_by_name(&self, name: &str) -> Option<&MaterialFunction> {
        self.functions.values().find(|function| function.name == name)
    }

    /// Remove a function; calls to it stop resolving
    pub fn remove(&mut self, id: FunctionId) -> Option<MaterialFunction> {
        self.functions.shift_remove(&id)
    }

    /// All functions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MaterialFunction> {
        self.functions.values()
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Whether `function` is `other` or reaches it through nested calls
    pub fn is_dependent(&self, function: FunctionId, other: FunctionId) -> bool {
        let mut pending = vec![function];
        let mut visited = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == other {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(function) = self.get(current) {
                pending.extend(function.call_targets());
            }
        }
        false
    }

    /// Point the call node `node` inside function `owner` at `target`.
    ///
    /// Rejected, leaving the node untouched, when `target` depends on `owner`.
    pub fn set_call_target(
        &mut self,
        owner: FunctionId,
        node: NodeId,
        target: Option<FunctionId>,
    ) -> Result<()> {
        let mut graph = self.take_graph(owner)?;
        let result = set_call_target(&mut graph, self, Some(owner), node, target);
        self.restore_graph(owner, graph);
        result
    }

    /// Re-match the bindings of the call node `node` inside function `owner`
    pub fn refresh_call_bindings(&mut self, owner: FunctionId, node: NodeId) -> Result<bool> {
        let mut graph = self.take_graph(owner)?;
        let result = refresh_call_bindings(&mut graph, self, node);
        self.restore_graph(owner, graph);
        result
    }

    /// Refresh every call node of every function, then the combined types.
    ///
    /// Returns how many call nodes changed.
    pub fn refresh_all_calls(&mut self) -> usize {
        let ids: Vec<FunctionId> = self.functions.keys().copied().collect();
        let mut changed = 0;
        // Each pass is idempotent; the bound only guards against a pass
        // that keeps reporting changes.
        for _ in 0..=ids.len() {
            let mut pass = 0;
            for &id in &ids {
                let Ok(mut graph) = self.take_graph(id) else {
                    continue;
                };
                pass += refresh_graph_calls(&mut graph, self);
                self.restore_graph(id, graph);
            }
            changed += pass;
            if pass == 0 {
                break;
            }
        }
        self.update_combined_types();
        changed
    }

    /// Recompute every function's combined input and output types
    pub fn update_combined_types(&mut self) {
        let types: Vec<(FunctionId, (ValueType, ValueType))> = self
            .functions
            .values()
            .map(|function| (function.id, function.combined_types(self)))
            .collect();
        for (id, (inputs, outputs)) in types {
            if let Some(function) = self.functions.get_mut(&id) {
                function.combined_input_types = inputs;
                function.combined_output_types = outputs;
            }
        }
    }

    fn take_graph(&mut self, id: FunctionId) -> Result<ExpressionGraph> {
        self.functions
            .get_mut(&id)
            .map(|function| std::mem::take(&mut function.graph))
            .ok_or(FunctionError::UnknownFunction(id))
    }

    fn restore_graph(&mut self, id: FunctionId, graph: ExpressionGraph) {
        if let Some(function) = self.functions.get_mut(&id) {
            function.graph = graph;
        }
    }
}

/// New bindings for a call node and where its old outputs moved to
struct Rebind {
    inputs: Vec<FunctionInputBinding>,
    outputs: Vec<FunctionOutputBinding>,
    /// Old output index to new output index
    output_map: Vec<Option<usize>>,
}

fn rebind(call: &FunctionCall, function: Option<&MaterialFunction>) -> Rebind {
    let Some(function) = function else {
        return Rebind {
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_map: vec![None; call.outputs.len()],
        };
    };

    let inputs = function
        .function_inputs()
        .into_iter()
        .map(|(_, input)| {
            let previous = call
                .inputs
                .iter()
                .find(|binding| binding.input_id == input.id)
                .or_else(|| call.inputs.iter().find(|binding| binding.name == input.name));
            FunctionInputBinding {
                input_id: input.id,
                name: input.name.clone(),
                slot: previous.map(|binding| binding.slot).unwrap_or_default(),
            }
        })
        .collect();

    let outputs: Vec<FunctionOutputBinding> = function
        .function_outputs()
        .into_iter()
        .map(|(_, output)| FunctionOutputBinding {
            output_id: output.id,
            name: output.name.clone(),
        })
        .collect();

    let output_map = call
        .outputs
        .iter()
        .map(|old| {
            outputs
                .iter()
                .position(|new| new.output_id == old.output_id)
                .or_else(|| outputs.iter().position(|new| new.name == old.name))
        })
        .collect();

    Rebind {
        inputs,
        outputs,
        output_map,
    }
}

/// Install new bindings on the call node and move consumer links along.
/// Returns whether anything changed.
fn apply_rebind(graph: &mut ExpressionGraph, node: NodeId, call: &FunctionCall, rebind: Rebind) -> bool {
    let dropped: Vec<&str> = call
        .inputs
        .iter()
        .filter(|old| old.slot.has_link())
        .filter(|old| !rebind.inputs.iter().any(|new| new.input_id == old.input_id || new.name == old.name))
        .map(|old| old.name.as_str())
        .collect();
    for name in dropped {
        warn!(call = %node, input = name, "Function input removed, dropping call site connection");
    }

    let mut changed = call.inputs != rebind.inputs || call.outputs != rebind.outputs;
    for (consumer, input_index) in graph.consumers_of(node) {
        let Some(slot) = graph
            .expression_mut(consumer)
            .and_then(|expression| expression.input_mut(input_index))
        else {
            continue;
        };
        let Some(connection) = slot.connection.as_mut() else {
            continue;
        };
        match rebind.output_map.get(connection.output_index).copied().flatten() {
            Some(new_index) if new_index == connection.output_index => {}
            Some(new_index) => {
                connection.output_index = new_index;
                changed = true;
            }
            None => {
                warn!(
                    call = %node,
                    consumer = %consumer,
                    output = connection.output_index,
                    "Function output removed, breaking connection"
                );
                slot.disconnect();
                changed = true;
            }
        }
    }

    if let Some(ExpressionKind::FunctionCall(target)) = graph.expression_mut(node) {
        target.inputs = rebind.inputs;
        target.outputs = rebind.outputs;
    }
    changed
}

fn call_node(graph: &ExpressionGraph, node: NodeId) -> Result<FunctionCall> {
    match graph.expression(node) {
        Some(ExpressionKind::FunctionCall(call)) => Ok(call.clone()),
        _ => Err(FunctionError::NotACallNode(node)),
    }
}

/// Point a call node at `target` and rebuild its bindings.
///
/// `owner` is the function whose body `graph` is, or `None` for a material.
/// A target that depends on the owner is rejected and the node is left as it was.
pub fn set_call_target(
    graph: &mut ExpressionGraph,
    library: &FunctionLibrary,
    owner: Option<FunctionId>,
    node: NodeId,
    target: Option<FunctionId>,
) -> Result<()> {
    let mut call = call_node(graph, node)?;
    let function = match target {
        Some(id) => Some(library.get(id).ok_or(FunctionError::UnknownFunction(id))?),
        None => None,
    };
    if let (Some(function), Some(owner)) = (function, owner) {
        if library.is_dependent(function.id, owner) {
            let owner_name = library
                .get(owner)
                .map_or_else(|| owner.to_string(), |owner| owner.name.clone());
            warn!(
                owner = %owner_name,
                target = %function.name,
                "Rejected recursive function reference"
            );
            return Err(FunctionError::Recursive(owner_name));
        }
    }

    let rebound = rebind(&call, function);
    call.function = target;
    apply_rebind(graph, node, &call, rebound);
    if let Some(ExpressionKind::FunctionCall(stored)) = graph.expression_mut(node) {
        stored.function = target;
    }
    Ok(())
}

/// Re-match a call node's bindings against its function's current inputs and outputs.
///
/// Returns whether anything changed.
pub fn refresh_call_bindings(
    graph: &mut ExpressionGraph,
    library: &FunctionLibrary,
    node: NodeId,
) -> Result<bool> {
    let call = call_node(graph, node)?;
    let function = call.function.and_then(|id| library.get(id));
    if call.function.is_some() && function.is_none() {
        // Keep the bindings of calls whose function is not loaded.
        return Ok(false);
    }
    let rebound = rebind(&call, function);
    Ok(apply_rebind(graph, node, &call, rebound))
}

/// Refresh every call node of a graph. Returns how many changed.
pub fn refresh_graph_calls(graph: &mut ExpressionGraph, library: &FunctionLibrary) -> usize {
    let calls: Vec<NodeId> = graph
        .nodes()
        .filter(|node| matches!(node.expression, ExpressionKind::FunctionCall(_)))
        .map(|node| node.id)
        .collect();
    calls
        .into_iter()
        .filter(|&node| refresh_call_bindings(graph, library, node).unwrap_or(false))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Constant, FunctionInputType, UnaryMath};
    use crate::port::InputSlot;
    use crate::translator::HlslTranslator;

    fn passthrough(name: &str) -> MaterialFunction {
        let mut function = MaterialFunction::new(name);
        let input = function
            .graph
            .add_node(FunctionInput::new("In", FunctionInputType::Scalar));
        function
            .graph
            .add_node(FunctionOutput::new("Result", InputSlot::from_output(input, 0)));
        function
    }

    #[test]
    fn test_inputs_sorted_by_priority() {
        let mut function = MaterialFunction::new("Sorted");
        function.graph.add_node(FunctionInput {
            sort_priority: 2,
            ..FunctionInput::new("Last", FunctionInputType::Scalar)
        });
        function
            .graph
            .add_node(FunctionInput::new("First", FunctionInputType::Scalar));
        let names: Vec<&str> = function
            .function_inputs()
            .into_iter()
            .map(|(_, input)| input.name.as_str())
            .collect();
        assert_eq!(names, ["First", "Last"]);
    }

    #[test]
    fn test_validate_names_appends_counter() {
        let mut function = MaterialFunction::new("Dupes");
        for _ in 0..3 {
            function.graph.add_node(FunctionInput::default());
        }
        function.graph.add_node(FunctionOutput::default());

        assert_eq!(function.validate_names(), 2);
        let names: Vec<String> = function
            .function_inputs()
            .into_iter()
            .map(|(_, input)| input.name.clone())
            .collect();
        assert_eq!(names, ["In", "In1", "In2"]);
        assert_eq!(function.function_outputs()[0].1.name, "Result");
    }

    #[test]
    fn test_is_dependent_follows_nested_calls() {
        let mut library = FunctionLibrary::new();
        let leaf = library.insert(passthrough("Leaf"));
        let mut middle = passthrough("Middle");
        middle
            .graph
            .add_node(FunctionCall::new(library.get(leaf).unwrap()));
        let middle = library.insert(middle);

        assert!(library.is_dependent(middle, leaf));
        assert!(library.is_dependent(leaf, leaf));
        assert!(!library.is_dependent(leaf, middle));
    }

    #[test]
    fn test_recursive_target_is_rejected() {
        let mut library = FunctionLibrary::new();
        let f = library.insert(passthrough("F"));
        let g = library.insert(passthrough("G"));

        let f_call = library.get_mut(f).unwrap().graph.add_node(FunctionCall::default());
        library.set_call_target(f, f_call, Some(g)).unwrap();

        let g_call = library.get_mut(g).unwrap().graph.add_node(FunctionCall::default());
        assert_eq!(
            library.set_call_target(g, g_call, Some(f)),
            Err(FunctionError::Recursive("G".to_string()))
        );
        let unchanged = library.get(g).unwrap().graph.expression(g_call);
        assert!(matches!(unchanged, Some(ExpressionKind::FunctionCall(call)) if call.function.is_none()));

        assert_eq!(
            library.set_call_target(f, f_call, Some(f)),
            Err(FunctionError::Recursive("F".to_string()))
        );
    }

    #[test]
    fn test_rename_preserves_connections() {
        let mut library = FunctionLibrary::new();
        let id = library.insert(passthrough("Pass"));

        let mut graph = ExpressionGraph::new();
        let value = graph.add_node(Constant::new(2.0));
        let call = graph.add_node(
            FunctionCall::new(library.get(id).unwrap()).with_input("In", InputSlot::from_output(value, 0)),
        );
        let consumer = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(call, 0)));

        let function = library.get_mut(id).unwrap();
        for node in function.graph.nodes_mut() {
            match &mut node.expression {
                ExpressionKind::FunctionInput(input) => input.name = "Value".to_string(),
                ExpressionKind::FunctionOutput(output) => output.name = "Out".to_string(),
                _ => {}
            }
        }

        assert_eq!(refresh_call_bindings(&mut graph, &library, call), Ok(true));
        let Some(ExpressionKind::FunctionCall(refreshed)) = graph.expression(call) else {
            panic!("call node expected");
        };
        assert_eq!(refreshed.inputs[0].name, "Value");
        assert_eq!(refreshed.inputs[0].slot, InputSlot::from_output(value, 0));
        assert_eq!(refreshed.outputs[0].name, "Out");
        assert!(graph.expression(consumer).unwrap().input(0).unwrap().has_link());
    }

    #[test]
    fn test_removed_output_breaks_consumer() {
        let mut library = FunctionLibrary::new();
        let mut function = passthrough("TwoOut");
        let input = function.function_inputs()[0].0;
        function.graph.add_node(FunctionOutput {
            sort_priority: 1,
            ..FunctionOutput::new("Extra", InputSlot::from_output(input, 0))
        });
        let id = library.insert(function);

        let mut graph = ExpressionGraph::new();
        let call = graph.add_node(FunctionCall::new(library.get(id).unwrap()));
        let reads_result = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(call, 0)));
        let reads_extra = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(call, 1)));

        let function = library.get_mut(id).unwrap();
        let result_node = function.function_outputs()[0].0;
        function.graph.remove_node(result_node);

        assert_eq!(refresh_call_bindings(&mut graph, &library, call), Ok(true));
        let extra = graph.expression(reads_extra).unwrap().input(0).unwrap();
        assert_eq!(extra.connection.map(|c| c.output_index), Some(0));
        assert!(!graph.expression(reads_result).unwrap().input(0).unwrap().has_link());
    }

    #[test]
    fn test_combined_types_and_preview() {
        let mut library = FunctionLibrary::new();
        let id = library.insert(passthrough("Pass"));
        library.update_combined_types();
        let function = library.get(id).unwrap();
        assert_eq!(function.combined_input_types, ValueType::FLOAT1);
        assert_eq!(function.combined_output_types, ValueType::FLOAT1);

        let mut translator = HlslTranslator::default();
        let preview = function.compile_preview(&library, &mut translator, 0).unwrap();
        assert_eq!(preview, translator.constant(0.0).unwrap());
        assert!(function.compile_preview(&library, &mut translator, 4).is_err());
    }
}
