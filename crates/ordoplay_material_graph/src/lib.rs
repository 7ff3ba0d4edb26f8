// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material expression graph compiler for `OrdoPlay`.
//!
//! This crate is the front end of the material pipeline:
//! - Typed expression nodes wired into graphs
//! - Static branches resolved at compile time
//! - Quality and feature level switches
//! - The attribute bus carrying every shading channel through one link
//! - Material functions inlined at their call sites
//!
//! ## Architecture
//!
//! Nodes live in an [`ExpressionGraph`] arena and reference their producers
//! by `(node, output)` pairs. Compiling walks the graph from the material's
//! root inputs through a [`CompileContext`], and every node emits code through
//! the [`MaterialCompiler`] backend trait. [`HlslTranslator`] is the backend
//! shipped with the crate.

pub mod compiler;
pub mod connection;
pub mod context;
pub mod cycle;
pub mod function;
pub mod graph;
pub mod material;
pub mod node;
pub mod nodes;
pub mod port;
pub mod property;
pub mod registry;
pub mod settings;
pub mod translator;
pub mod value_type;

pub use compiler::{Code, CodeResult, ExpressionError, FeatureLevel, MaterialCompiler, QualityLevel};
pub use connection::Connection;
pub use context::CompileContext;
pub use cycle::contains_input_loop;
pub use function::{FunctionError, FunctionId, FunctionLibrary, MaterialFunction};
pub use graph::{ConnectionError, ExpressionGraph, GraphContext};
pub use material::{compile_material, Material, MaterialCompileOutput};
pub use node::{Expression, ExpressionKind, Node, NodeCategory, NodeId, NodeRegistry, NodeType};
pub use port::{InputSlot, OutputSlot};
pub use property::{MaterialProperty, MATERIAL_PROPERTY_COUNT};
pub use registry::create_material_registry;
pub use settings::{CompileSettings, LoadError};
pub use translator::{GeneratedMaterial, HlslTranslator};
pub use value_type::{ComponentMask, ValueType};
