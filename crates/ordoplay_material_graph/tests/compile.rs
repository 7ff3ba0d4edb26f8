// SPDX-License-Identifier: MIT OR Apache-2.0
//! End to end compiles against the reference translator.

use ordoplay_material_graph::compiler::QualityLevel;
use ordoplay_material_graph::nodes::{
    Arithmetic, BreakMaterialAttributes, Constant, FunctionCall, FunctionInput, FunctionInputType,
    FunctionOutput, MakeMaterialAttributes, QualitySwitch, StaticBool, StaticSwitch, TextureSample,
    UnaryMath, VectorParameter,
};
use ordoplay_material_graph::property::ATTRIBUTE_CHANNELS;
use ordoplay_material_graph::settings::{from_ron, to_ron};
use ordoplay_material_graph::{
    compile_material, contains_input_loop, CompileContext, CompileSettings, ComponentMask,
    ExpressionError, ExpressionGraph, ExpressionKind, FunctionError, FunctionLibrary, HlslTranslator,
    InputSlot, Material, MaterialCompiler, MaterialFunction, MaterialProperty, Node, NodeId, ValueType,
};

fn caption(graph: &ExpressionGraph, functions: &FunctionLibrary, node: NodeId) -> String {
    graph.node(node).map(|node: &Node| node.caption(functions)).unwrap_or_default()
}

fn abs_of() -> MaterialFunction {
    let mut function = MaterialFunction::new("AbsOf");
    let input = function
        .graph
        .add_node(FunctionInput::new("In", FunctionInputType::Scalar));
    let abs = function
        .graph
        .add_node(UnaryMath::abs().with_input(InputSlot::from_output(input, 0)));
    function
        .graph
        .add_node(FunctionOutput::new("Result", InputSlot::from_output(abs, 0)));
    function
}

#[test]
fn test_break_of_make_returns_each_channel() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let mut make = MakeMaterialAttributes::default();
    let mut values = Vec::new();
    for property in ATTRIBUTE_CHANNELS {
        let value = graph.add_node(Constant::new(property.index() as f32 + 0.5));
        make = make.with_channel(property, InputSlot::from_output(value, 0));
        values.push(value);
    }
    let make = graph.add_node(make);
    let split = graph.add_node(BreakMaterialAttributes::new(InputSlot::from_output(make, 0)));

    let mut translator = HlslTranslator::default();
    let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
    for (k, value) in values.into_iter().enumerate() {
        let through_bus = ctx.compile_node(split, k, None).unwrap();
        let direct = ctx.compile_node(value, 0, None).unwrap();
        assert_eq!(through_bus, direct, "channel {k}");
    }
    assert_eq!(ctx.compiler().error_count(), 0);
}

#[test]
fn test_add_uses_literal_for_unconnected_operand() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let two = graph.add_node(Constant::new(2.0));
    let add = graph.add_node(Arithmetic::add().with_a(InputSlot::from_output(two, 0)));
    assert_eq!(caption(&graph, &functions, add), "Add");

    let mut translator = HlslTranslator::default();
    let result = CompileContext::new(&mut translator, &functions, &graph)
        .compile_node(add, 0, None)
        .unwrap();

    let a = translator.constant(2.0).unwrap();
    let b = translator.constant(1.0).unwrap();
    assert_eq!(result, translator.add(a, b).unwrap());
    assert!(translator.diagnostics().is_empty());
}

#[test]
fn test_abs_without_input_reports_caption() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let abs = graph.add_node(UnaryMath::abs());

    let mut translator = HlslTranslator::default();
    let result = CompileContext::new(&mut translator, &functions, &graph).compile_node(abs, 0, None);
    assert_eq!(result, Err(ExpressionError));
    assert_eq!(translator.diagnostics(), ["Abs> Missing Abs input"]);
}

#[test]
fn test_static_switch_never_compiles_the_other_side() {
    let functions = FunctionLibrary::new();
    for condition in [true, false] {
        let mut graph = ExpressionGraph::new();
        let good = graph.add_node(Constant::new(5.0));
        let broken = graph.add_node(UnaryMath::abs());
        let value = graph.add_node(StaticBool::new(condition));
        let (a, b) = if condition { (good, broken) } else { (broken, good) };
        let switch = graph.add_node(
            StaticSwitch::new(InputSlot::from_output(a, 0), InputSlot::from_output(b, 0))
                .with_value(InputSlot::from_output(value, 0)),
        );

        let mut translator = HlslTranslator::default();
        let result = CompileContext::new(&mut translator, &functions, &graph)
            .compile_node(switch, 0, None)
            .unwrap();
        assert_eq!(result, translator.constant(5.0).unwrap());
        assert!(translator.diagnostics().is_empty());
    }
}

#[test]
fn test_quality_switch_levels() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let fallback = graph.add_node(Constant::new(1.0));
    let low = graph.add_node(Constant::new(0.25));
    let default_only = graph.add_node(QualitySwitch::new(InputSlot::from_output(fallback, 0)));
    let with_low = graph.add_node(
        QualitySwitch::new(InputSlot::from_output(fallback, 0))
            .with_level(QualityLevel::Low, InputSlot::from_output(low, 0)),
    );

    for level in QualityLevel::ALL {
        let settings = CompileSettings {
            quality_level: level,
            ..CompileSettings::default()
        };
        let mut translator = HlslTranslator::new(settings);
        let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
        let plain = ctx.compile_node(default_only, 0, None).unwrap();
        let switched = ctx.compile_node(with_low, 0, None).unwrap();

        let expected_fallback = translator.constant(1.0).unwrap();
        assert_eq!(plain, expected_fallback);
        let expected = match level {
            QualityLevel::Low => translator.constant(0.25).unwrap(),
            QualityLevel::High => expected_fallback,
        };
        assert_eq!(switched, expected, "{}", level.name());
    }
}

#[test]
fn test_loops_are_detected_and_diamonds_are_not() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let source = graph.add_node(Constant::new(1.0));
    let left = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(source, 0)));
    let right = graph.add_node(UnaryMath::floor().with_input(InputSlot::from_output(source, 0)));
    let join = graph.add_node(
        Arithmetic::add()
            .with_a(InputSlot::from_output(left, 0))
            .with_b(InputSlot::from_output(right, 0)),
    );
    assert!(!contains_input_loop(&graph, join));

    let first = graph.add_node(UnaryMath::abs());
    let second = graph.add_node(UnaryMath::abs().with_input(InputSlot::from_output(first, 0)));
    graph.connect(&functions, second, 0, first, 0).unwrap();
    assert!(contains_input_loop(&graph, first));
    assert!(contains_input_loop(&graph, second));

    let mut translator = HlslTranslator::default();
    let result = CompileContext::new(&mut translator, &functions, &graph).compile_node(first, 0, None);
    assert_eq!(result, Err(ExpressionError));
    assert_eq!(translator.diagnostics(), ["Abs> Reentrant expression"]);
}

#[test]
fn test_mutually_recursive_functions_are_rejected() {
    let mut library = FunctionLibrary::new();
    let f = library.insert(abs_of());
    let g = library.insert(MaterialFunction::new("G"));

    let f_call = library.get_mut(f).unwrap().graph.add_node(FunctionCall::default());
    library.set_call_target(f, f_call, Some(g)).unwrap();

    let g_call = library.get_mut(g).unwrap().graph.add_node(FunctionCall::default());
    let rejected = library.set_call_target(g, g_call, Some(f));
    assert!(matches!(rejected, Err(FunctionError::Recursive(_))));
    assert!(library.is_dependent(f, g));
    assert!(!library.is_dependent(g, f));
}

#[test]
fn test_material_inlines_function_calls() {
    let mut library = FunctionLibrary::new();
    let id = library.insert(abs_of());

    let mut material = Material::new("Inlined");
    let value = material.graph.add_node(Constant::new(-0.5));
    let call = material.graph.add_node(FunctionCall::default());
    material.set_call_target(&library, call, Some(id)).unwrap();
    let Some(ExpressionKind::FunctionCall(bound)) = material.graph.expression_mut(call) else {
        panic!("call node expected");
    };
    bound.inputs[0].slot = InputSlot::from_output(value, 0);
    material.set_property_input(MaterialProperty::Roughness, InputSlot::from_output(call, 0));

    let mut translator = HlslTranslator::default();
    let output = compile_material(&material, &library, &mut translator);
    assert!(output.succeeded(), "{:?}", translator.diagnostics());

    let roughness = output.channel(MaterialProperty::Roughness).unwrap().unwrap();
    let literal = translator.constant(-0.5).unwrap();
    assert_eq!(roughness, translator.abs(literal).unwrap());

    let generated = translator.finish(&output.compiled());
    assert!(generated.source.contains("abs(-0.5)"));
    assert!(generated.source.contains("Attributes.Roughness"));
}

#[test]
fn test_unbound_function_input_is_reported_inside_the_function() {
    let mut library = FunctionLibrary::new();
    let id = library.insert(abs_of());

    let mut material = Material::new("Unbound");
    let call = material
        .graph
        .add_node(FunctionCall::new(library.get(id).unwrap()));
    material.set_property_input(MaterialProperty::Metallic, InputSlot::from_output(call, 0));

    let mut translator = HlslTranslator::default();
    let output = compile_material(&material, &library, &mut translator);
    assert!(!output.succeeded());
    assert!(translator
        .diagnostics()
        .iter()
        .any(|message| message.contains("Missing function input 'In'")));
}

const CHANNELS: [(usize, ComponentMask); 4] = [
    (1, ComponentMask::R),
    (2, ComponentMask::G),
    (3, ComponentMask::B),
    (4, ComponentMask::A),
];

#[test]
fn test_channel_outputs_select_their_component() {
    let functions = FunctionLibrary::new();
    let mut graph = ExpressionGraph::new();
    let tint = graph.add_node(VectorParameter::new("Tint", [0.1, 0.2, 0.3, 0.4]));
    let sample = graph.add_node(TextureSample::new("Bricks"));

    let mut translator = HlslTranslator::default();
    let mut ctx = CompileContext::new(&mut translator, &functions, &graph);
    let full_tint = ctx.compile_node(tint, 0, None).unwrap();
    let full_sample = ctx.compile_node(sample, 5, None).unwrap();
    let mut reads = Vec::new();
    for (index, mask) in CHANNELS {
        let tint_channel = ctx.compile_input(&InputSlot::from_output(tint, index)).unwrap();
        let sample_channel = ctx.compile_input(&InputSlot::from_output(sample, index)).unwrap();
        reads.push((mask, tint_channel, sample_channel));
    }
    drop(ctx);

    for (mask, tint_channel, sample_channel) in reads {
        assert_eq!(translator.get_type(tint_channel), ValueType::FLOAT1);
        assert_eq!(translator.get_type(sample_channel), ValueType::FLOAT1);
        assert_eq!(tint_channel, translator.component_mask(full_tint, mask).unwrap());
        assert_eq!(sample_channel, translator.component_mask(full_sample, mask).unwrap());
    }
    assert!(translator.diagnostics().is_empty());
}

#[test]
fn test_loaded_material_reads_masked_outputs() {
    let mut material = Material::new("Masked");
    let tint = material
        .graph
        .add_node(VectorParameter::new("Tint", [0.1, 0.2, 0.3, 0.4]));
    let sample = material.graph.add_node(TextureSample::new("Bricks"));
    material.set_property_input(MaterialProperty::Metallic, InputSlot::from_output(tint, 2));
    material.set_property_input(MaterialProperty::Roughness, InputSlot::from_output(sample, 4));
    material.set_property_input(MaterialProperty::BaseColor, InputSlot::from_output(sample, 0));

    let loaded: Material = from_ron(&to_ron(&material).unwrap()).unwrap();
    let library = FunctionLibrary::new();
    let mut translator = HlslTranslator::default();
    let output = compile_material(&loaded, &library, &mut translator);
    assert!(output.succeeded(), "{:?}", translator.diagnostics());

    let metallic = output.channel(MaterialProperty::Metallic).unwrap().unwrap();
    let roughness = output.channel(MaterialProperty::Roughness).unwrap().unwrap();
    let base_color = output.channel(MaterialProperty::BaseColor).unwrap().unwrap();
    assert_eq!(translator.get_type(metallic), ValueType::FLOAT1);
    assert_eq!(translator.get_type(roughness), ValueType::FLOAT1);
    assert_eq!(translator.get_type(base_color), ValueType::FLOAT3);

    let source = translator.finish(&output.compiled()).source;
    assert!(source.contains(".g;"), "{source}");
    assert!(source.contains(".a;"), "{source}");
    assert!(source.contains(".rgb;"), "{source}");
}
