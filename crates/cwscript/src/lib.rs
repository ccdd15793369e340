/*! Compile CWScript contracts to CosmWasm source.
 *
 * Single import for the whole pipeline: the syntax tree, lowering and template synthesis, and
 * the renderers. `compile_json` takes a tree produced by a front-end as JSON and returns the
 * emitted source for every contract in it.
 */

pub use cwscript_codegen as codegen;
pub use cwscript_core as core;
pub use cwscript_emit as emit;

pub use cwscript_codegen::{compile, CodegenConfig, ContractAssembler, ContractUnit, FallbackMode};
pub use cwscript_core::{CodegenError, Node, Program, Renderer, TemplateBinding, TemplateName};
pub use cwscript_emit::{BindingDumpRenderer, CosmWasmRenderer, EmitterConfig, IndentStyle};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub codegen: CodegenConfig,
    pub emitter: EmitterConfig,
    /// Emit the raw template bindings as JSON instead of CosmWasm source.
    pub dump_bindings: bool,
}

impl CompileOptions {
    pub fn renderer(&self) -> Box<dyn Renderer> {
        if self.dump_bindings {
            Box::new(BindingDumpRenderer)
        } else {
            Box::new(CosmWasmRenderer::with_config(self.emitter.clone()))
        }
    }
}

pub fn parse_program(source: &str) -> Result<Program> {
    serde_json::from_str(source).context("input is not a valid CWScript syntax tree")
}

pub fn compile_program(program: &Program, options: &CompileOptions) -> Result<String> {
    let renderer = options.renderer();
    let output = ContractAssembler::new(renderer.as_ref())
        .with_config(options.codegen.clone())
        .compile(program)?;
    Ok(output)
}

pub fn compile_json(source: &str, options: &CompileOptions) -> Result<String> {
    let program = parse_program(source)?;
    compile_program(&program, options)
}
