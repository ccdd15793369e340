/*! Lower CWScript syntax trees into host source through named templates.
 *
 * The tricky part of compiling a contract is telling state access apart from ordinary
 * expressions: `$state.balances[a][b]` is one map entry with two keys, not two nested
 * lookups, and `$msg.sender` is a read-only passthrough. This crate classifies those
 * shapes, checks each construct before emitting it, and hands the result to a renderer
 * as template bindings.
 */

pub mod assembler;
pub mod config;
pub mod context;
pub mod lowering;
pub mod protocol;
pub mod resolver;

pub use assembler::{compile, ContractAssembler, ContractUnit};
pub use config::{CodegenConfig, FallbackMode};
pub use context::{CodegenEnv, ContextStack, Frame, StateTable};
pub use lowering::{lower, lower_all, state_accesses, state_target, StateTarget};
pub use protocol::Codegen;
pub use resolver::{
    bind_assignment, bind_conditional, bind_contract, bind_function, select_template,
};

#[cfg(test)]
mod tests;
