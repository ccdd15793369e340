/*! Core types for compiling CWScript contracts.
 *
 * A contract arrives as a syntax tree from the front-end, is lowered into a handful of
 * intermediate shapes that tell state access apart from ordinary expressions, and leaves as
 * template bindings that a renderer turns into host source. This crate holds those shapes and
 * the seams between stages; the pipeline itself lives in `cwscript-codegen`.
 */

pub mod ast;
pub mod error;
pub mod ir;
pub mod naming;
pub mod template;
pub mod types;

pub use ast::{
    AssignStmt, ContractDefn, ExecDefn, Ident, IfClause, IfExpr, Literal, MapKey,
    MemberAccessExpr, Node, Param, Program, StateItemDefn, StateMapDefn, TableLookupExpr,
    MESSAGE_ROOT, STATE_ROOT,
};
pub use error::{CodegenError, GenerationError, Result, VerificationError};
pub use ir::{ItemRef, Lowered, MapRef};
pub use template::{BindingValue, Renderer, StateDecl, TemplateBinding, TemplateName};
pub use types::TypeExpr;
