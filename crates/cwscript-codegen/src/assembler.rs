use cwscript_core::{ContractDefn, Program, Renderer, Result};
use tracing::{debug, info};

use crate::config::CodegenConfig;
use crate::context::CodegenEnv;
use crate::protocol::Codegen;

/// Emitted source for one contract definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractUnit {
    pub name: String,
    pub code: String,
}

/// Runs the pipeline over every contract in a program.
///
/// Each contract gets a fresh `CodegenEnv`, so a failure in one leaves nothing
/// behind for the next and independent assemblers can run in parallel.
pub struct ContractAssembler<'r> {
    renderer: &'r dyn Renderer,
    config: CodegenConfig,
}

impl<'r> ContractAssembler<'r> {
    pub fn new(renderer: &'r dyn Renderer) -> Self {
        Self {
            renderer,
            config: CodegenConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CodegenConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    pub fn compile_contract(&self, defn: &ContractDefn) -> Result<ContractUnit> {
        let mut env = CodegenEnv::with_config(self.renderer, self.config.clone());
        let code = defn.generate_code(&mut env)?;
        debug_assert!(env.stack().is_empty());
        debug!(contract = %defn.name, bytes = code.len(), "contract emitted");
        Ok(ContractUnit {
            name: defn.name.to_string(),
            code,
        })
    }

    /// One result per contract, in tree order; a failure does not stop the rest.
    pub fn compile_each(&self, program: &Program) -> Vec<(String, Result<ContractUnit>)> {
        program
            .contracts()
            .into_iter()
            .map(|defn| (defn.name.to_string(), self.compile_contract(defn)))
            .collect()
    }

    /// Concatenated output of every contract. The first failure aborts.
    pub fn compile(&self, program: &Program) -> Result<String> {
        let contracts = program.contracts();
        info!(contracts = contracts.len(), "compiling program");

        let mut output = String::new();
        for defn in contracts {
            output.push_str(&self.compile_contract(defn)?.code);
        }
        Ok(output)
    }
}

/// Compile every contract in `program` with the default configuration.
pub fn compile(program: &Program, renderer: &dyn Renderer) -> Result<String> {
    ContractAssembler::new(renderer).compile(program)
}
