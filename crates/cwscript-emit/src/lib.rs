/*! Renderers that turn template bindings into text.
 *
 * The code generator only decides *which* template applies and *what* goes into it. These
 * renderers decide what it looks like: CosmWasm contract source for shipping, or the raw
 * bindings as JSON when you need to see exactly what the generator decided.
 */

pub mod config;
pub mod cosmwasm;
pub mod dump;
pub mod emitter;

pub use config::{EmitterConfig, IndentStyle};
pub use cosmwasm::CosmWasmRenderer;
pub use dump::BindingDumpRenderer;
pub use emitter::{EmitContext, SourceWriter};
