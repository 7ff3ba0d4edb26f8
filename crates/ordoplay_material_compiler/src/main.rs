// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ordoplay-matc`: compile material graphs without the editor.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ordoplay_material_graph::settings::load_ron;
use ordoplay_material_graph::{
    compile_material, create_material_registry, CompileSettings, FunctionLibrary, HlslTranslator,
    Material, MaterialCompiler,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ordoplay-matc")]
#[command(about = "Compile OrdoPlay material graphs", long_about = None)]
#[command(version)]
struct Cli {
    /// Log every function inlining step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a material and print the generated code
    Compile {
        /// Material document (RON)
        #[arg(value_name = "MATERIAL")]
        material: PathBuf,

        /// Function library the material calls into (RON)
        #[arg(short, long, value_name = "FILE")]
        library: Option<PathBuf>,

        /// Compile settings (RON)
        #[arg(short, long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Output file path (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Compile one output of a library function on its own
    Preview {
        /// Function library (RON)
        #[arg(value_name = "LIBRARY")]
        library: PathBuf,

        /// Name of the function
        #[arg(short, long)]
        function: String,

        /// Index of the function output
        #[arg(long, default_value = "0")]
        output_index: usize,

        /// Compile settings (RON)
        #[arg(short, long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },
    /// List every node kind
    ListNodes,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            material,
            library,
            settings,
            output,
        } => cmd_compile(&material, library.as_deref(), settings.as_deref(), output.as_deref()),
        Commands::Preview {
            library,
            function,
            output_index,
            settings,
        } => cmd_preview(&library, &function, output_index, settings.as_deref()),
        Commands::ListNodes => {
            cmd_list_nodes();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_settings(path: Option<&Path>) -> Result<CompileSettings> {
    match path {
        Some(path) => CompileSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(CompileSettings::default()),
    }
}

fn load_library(path: Option<&Path>) -> Result<FunctionLibrary> {
    let Some(path) = path else {
        return Ok(FunctionLibrary::new());
    };
    let mut library: FunctionLibrary = load_ron(path)
        .with_context(|| format!("Failed to load function library from {}", path.display()))?;
    let changed = library.refresh_all_calls();
    tracing::debug!(functions = library.len(), changed, "Loaded function library");
    Ok(library)
}

fn report(diagnostics: &[String]) -> Result<()> {
    for diagnostic in diagnostics {
        eprintln!("error: {diagnostic}");
    }
    if !diagnostics.is_empty() {
        anyhow::bail!("compilation failed with {} error(s)", diagnostics.len());
    }
    Ok(())
}

/// Compile a material document against its library.
fn cmd_compile(
    material_path: &Path,
    library_path: Option<&Path>,
    settings_path: Option<&Path>,
    output_path: Option<&Path>,
) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let library = load_library(library_path)?;
    let mut material = Material::load(material_path)
        .with_context(|| format!("Failed to load material from {}", material_path.display()))?;
    material.refresh_calls(&library);

    tracing::info!(
        material = %material.name,
        quality = settings.quality_level.name(),
        feature_level = settings.feature_level.name(),
        "Compiling material"
    );
    let mut translator = HlslTranslator::new(settings);
    let output = compile_material(&material, &library, &mut translator);
    let generated = translator.finish(&output.compiled());

    if let Some(output_path) = output_path {
        std::fs::write(output_path, &generated.source)
            .with_context(|| format!("Failed to write output to {}", output_path.display()))?;
        eprintln!("Wrote generated code to {}", output_path.display());
    } else {
        print!("{}", generated.source);
    }

    report(&generated.diagnostics)
}

/// Compile one function output standalone, with inputs reading their previews.
fn cmd_preview(
    library_path: &Path,
    function_name: &str,
    output_index: usize,
    settings_path: Option<&Path>,
) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let library = load_library(Some(library_path))?;
    let function = library
        .find_by_name(function_name)
        .with_context(|| format!("No function named '{function_name}' in {}", library_path.display()))?;

    let mut translator = HlslTranslator::new(settings);
    if let Ok(code) = function.compile_preview(&library, &mut translator, output_index) {
        print!("{}", translator.finish(&[]).source);
        println!(
            "{} {} = {}",
            translator.get_type(code).describe(),
            function.name,
            translator.expression_text(code)
        );
    }
    report(translator.diagnostics())
}

fn cmd_list_nodes() {
    let registry = create_material_registry();
    for node_type in registry.types() {
        println!(
            "{:<28} {:<28} {:<20} {}",
            node_type.id,
            node_type.name,
            format!("{:?}", node_type.category),
            node_type.description
        );
    }
}
