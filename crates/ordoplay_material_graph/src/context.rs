// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile context threaded through every `Expression::compile` call.
//!
//! The context owns a stack of scopes, one per graph being compiled: the
//! material (or standalone function) at the bottom, then one per function
//! call being inlined. Entering and leaving a function is done through
//! closures, so the scope stack and the backend's function stack stay
//! balanced on every return path.

use crate::compiler::{CodeResult, ExpressionError, FunctionFrame, MaterialCompiler};
use crate::function::{FunctionId, FunctionLibrary, MaterialFunction};
use crate::graph::{ExpressionGraph, GraphContext};
use crate::node::{Expression, NodeId};
use crate::port::InputSlot;
use std::collections::HashMap;
use tracing::debug;

/// What a function input reads while its function is inlined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOverride {
    /// The call site's slot, compiled in the caller's scope
    CallSite(InputSlot),
    /// The call site left the input unconnected and no preview fallback applies
    Missing,
}

/// Function being inlined by the scope
struct CallFrame<'a> {
    function: &'a MaterialFunction,
    /// Keyed by the function input node inside the function graph
    inputs: HashMap<NodeId, InputOverride>,
}

/// Key of one compile in progress
type CompileKey = (NodeId, usize, Option<usize>);

struct StackEntry {
    key: CompileKey,
    caption: String,
}

struct Scope<'a> {
    graph: &'a ExpressionGraph,
    call: Option<CallFrame<'a>>,
    stack: Vec<StackEntry>,
}

impl<'a> Scope<'a> {
    fn new(graph: &'a ExpressionGraph, call: Option<CallFrame<'a>>) -> Self {
        Self {
            graph,
            call,
            stack: Vec::new(),
        }
    }
}

/// State of one compile: backend, function library and scope stack
pub struct CompileContext<'a> {
    compiler: &'a mut (dyn MaterialCompiler + 'a),
    functions: &'a FunctionLibrary,
    scopes: Vec<Scope<'a>>,
}

impl<'a> CompileContext<'a> {
    /// Create a context compiling nodes of `graph`
    pub fn new(
        compiler: &'a mut (dyn MaterialCompiler + 'a),
        functions: &'a FunctionLibrary,
        graph: &'a ExpressionGraph,
    ) -> Self {
        Self {
            compiler,
            functions,
            scopes: vec![Scope::new(graph, None)],
        }
    }

    /// The backend
    pub fn compiler(&mut self) -> &mut (dyn MaterialCompiler + 'a) {
        &mut *self.compiler
    }

    /// Functions call nodes may reference
    pub fn functions(&self) -> &'a FunctionLibrary {
        self.functions
    }

    fn scope(&self) -> &Scope<'a> {
        // The root scope is pushed in `new` and never popped.
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut Scope<'a> {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    /// Graph of the innermost scope
    pub fn graph(&self) -> &'a ExpressionGraph {
        self.scope().graph
    }

    /// Structural view of the innermost scope
    pub fn graph_context(&self) -> GraphContext<'a> {
        GraphContext::new(self.graph(), self.functions)
    }

    /// Whether the input reads an existing producer in the innermost scope
    pub fn is_connected(&self, slot: &InputSlot) -> bool {
        self.graph_context().is_connected(slot)
    }

    /// Whether the innermost scope is a function body inlined at a call site
    pub fn in_function_call(&self) -> bool {
        self.scope().call.is_some()
    }

    /// Number of function calls currently being inlined
    pub fn call_depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Node whose compile is in progress in the innermost scope
    pub fn current_node(&self) -> Option<NodeId> {
        self.scope().stack.last().map(|entry| entry.key.0)
    }

    /// Record a diagnostic against the node being compiled.
    ///
    /// The message is prefixed with the node's caption, as in `Abs> Missing Abs input`.
    pub fn error(&mut self, message: impl AsRef<str>) -> ExpressionError {
        let message = match self.scope().stack.last() {
            Some(entry) => format!("{}> {}", entry.caption, message.as_ref()),
            None => message.as_ref().to_string(),
        };
        self.compiler.error(&message)
    }

    /// Compile the producer an input reads, applying the input's channel mask
    pub fn compile_input(&mut self, slot: &InputSlot) -> CodeResult {
        self.compile_input_multiplexed(slot, None)
    }

    /// Compile an input, forwarding an attribute bus channel selector
    pub fn compile_input_multiplexed(
        &mut self,
        slot: &InputSlot,
        multiplex: Option<usize>,
    ) -> CodeResult {
        let cx = self.graph_context();
        let Some((producer, connection)) = cx.resolve(slot) else {
            return Err(self.error("Missing input connection"));
        };
        // An unmasked link reads whatever channels the producer output exposes
        let mask = if connection.mask.is_empty() {
            producer
                .expression
                .outputs(&cx)
                .get(connection.output_index)
                .map_or(connection.mask, |output| output.mask)
        } else {
            connection.mask
        };
        let code = self.compile_node(connection.node, connection.output_index, multiplex)?;
        self.compiler.component_mask(code, mask)
    }

    /// Compile one output of a node in the innermost scope
    pub fn compile_node(
        &mut self,
        node: NodeId,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        self.dispatch(node, output_index, multiplex, false)
    }

    /// Compile the preview value of one output of a node in the innermost scope
    pub fn compile_node_preview(
        &mut self,
        node: NodeId,
        output_index: usize,
        multiplex: Option<usize>,
    ) -> CodeResult {
        self.dispatch(node, output_index, multiplex, true)
    }

    fn dispatch(
        &mut self,
        node_id: NodeId,
        output_index: usize,
        multiplex: Option<usize>,
        preview: bool,
    ) -> CodeResult {
        let graph = self.graph();
        let Some(node) = graph.node(node_id) else {
            return Err(self.error(format!("Missing expression {node_id}")));
        };

        let key = (node_id, output_index, multiplex);
        let caption = node.caption(self.functions);
        if self.scope().stack.iter().any(|entry| entry.key == key) {
            return Err(self
                .compiler
                .error(&format!("{caption}> Reentrant expression")));
        }

        self.scope_mut().stack.push(StackEntry { key, caption });
        let result = if preview {
            node.expression.compile_preview(self, output_index, multiplex)
        } else {
            node.expression.compile(self, output_index, multiplex)
        };
        self.scope_mut().stack.pop();
        result
    }

    /// Run `f` inside `function`'s body, with its inputs bound to `inputs`.
    ///
    /// The backend sees a matching push/pop pair and the scope is removed
    /// when `f` returns, whatever it returns.
    pub(crate) fn in_function<R>(
        &mut self,
        function: &'a MaterialFunction,
        call_caption: String,
        inputs: HashMap<NodeId, InputOverride>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        debug!(
            function = %function.name,
            call = %call_caption,
            depth = self.call_depth() + 1,
            "Inlining material function"
        );
        self.compiler.push_function(FunctionFrame {
            function_name: function.name.clone(),
            call_caption,
        });
        self.scopes.push(Scope::new(
            &function.graph,
            Some(CallFrame { function, inputs }),
        ));

        let result = f(self);

        self.scopes.pop();
        self.compiler.pop_function();
        debug!(function = %function.name, "Finished inlining material function");
        result
    }

    /// Binding of the function input node currently being compiled
    pub(crate) fn current_input_override(&self) -> Option<InputOverride> {
        let node = self.current_node()?;
        let call = self.scope().call.as_ref()?;
        call.inputs.get(&node).copied()
    }

    /// Whether `function` is already being inlined somewhere up the scope stack
    pub(crate) fn is_inlining(&self, function: FunctionId) -> bool {
        self.scopes
            .iter()
            .filter_map(|scope| scope.call.as_ref())
            .any(|call| call.function.id == function)
    }

    /// Run `f` in the scope of the call site that inlined the innermost function.
    ///
    /// Returns `None` when the innermost scope is not an inlined function.
    pub(crate) fn in_caller_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Option<R> {
        if self.scopes.len() < 2 || !self.in_function_call() {
            return None;
        }
        let scope = self.scopes.pop()?;
        let frame = self.compiler.pop_function();

        let result = f(self);

        if let Some(frame) = frame {
            self.compiler.push_function(frame);
        }
        self.scopes.push(scope);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::nodes::{Arithmetic, Constant, UnaryMath, VectorParameter};
    use crate::translator::HlslTranslator;
    use crate::value_type::{ComponentMask, ValueType};

    #[test]
    fn test_error_is_prefixed_with_caption() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let abs = graph.add_node(UnaryMath::abs());

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        assert!(ctx.compile_node(abs, 0, None).is_err());
        drop(ctx);

        assert_eq!(translator.diagnostics(), ["Abs> Missing Abs input"]);
    }

    #[test]
    fn test_reentrant_expression_is_reported() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let one = graph.add_node(Constant::new(1.0));
        let add = graph.add_node(Arithmetic::add().with_b(InputSlot::from_output(one, 0)));
        *graph.expression_mut(add).unwrap().input_mut(0).unwrap() = InputSlot::from_output(add, 0);

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        assert!(ctx.compile_node(add, 0, None).is_err());
        drop(ctx);

        assert!(translator
            .diagnostics()
            .iter()
            .any(|d| d == "Add> Reentrant expression"));
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let functions = FunctionLibrary::new();
        let graph = ExpressionGraph::new();
        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);

        assert!(ctx.compile_node(NodeId(5), 0, None).is_err());
        assert_eq!(ctx.compiler().error_count(), 1);
        assert_eq!(ctx.call_depth(), 0);
    }

    #[test]
    fn test_unmasked_input_reads_the_output_channels() {
        let functions = FunctionLibrary::new();
        let mut graph = ExpressionGraph::new();
        let tint = graph.add_node(VectorParameter::new("Tint", [0.1, 0.2, 0.3, 0.4]));

        let mut translator = HlslTranslator::default();
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let full = ctx.compile_node(tint, 0, None).unwrap();
        let color = ctx.compile_input(&InputSlot::from_output(tint, 0)).unwrap();
        let green = ctx.compile_input(&InputSlot::from_output(tint, 2)).unwrap();
        let overridden = ctx
            .compile_input(&Connection::new(tint, 2).with_mask(ComponentMask::R | ComponentMask::A).into())
            .unwrap();
        drop(ctx);

        assert_eq!(translator.get_type(full), ValueType::FLOAT4);
        assert_eq!(translator.get_type(color), ValueType::FLOAT3);
        assert_eq!(translator.get_type(green), ValueType::FLOAT1);
        assert_eq!(green, translator.component_mask(full, ComponentMask::G).unwrap());
        assert_eq!(translator.get_type(overridden), ValueType::FLOAT2);
        assert!(translator.diagnostics().is_empty());
    }
}
