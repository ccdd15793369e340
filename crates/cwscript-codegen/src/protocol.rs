//! Verify-then-generate protocol shared by every construct that emits code.
//!
//! `generate_code` is the only entry point. It pushes a frame, verifies, generates and
//! lets the scope guard pop the frame on every exit path. The per-construct `verify` and
//! `generate` steps live on a sealed trait so nothing outside this crate can call them
//! and bypass the context stack.

use cwscript_core::{
    ast::{AssignStmt, ContractDefn, ExecDefn, IfExpr, Node},
    naming::{screaming_snake_case, snake_case},
    types, Result, StateDecl, VerificationError,
};
use std::collections::hash_map::{Entry, HashMap};
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::context::{CodegenEnv, Frame, StateTable};
use crate::lowering::{state_accesses, state_target, StateTarget};
use crate::resolver;

mod sealed {
    use super::*;

    pub trait Emit {
        fn frame(&self) -> Frame;

        fn verify(&self, _env: &CodegenEnv<'_>) -> std::result::Result<(), VerificationError> {
            Ok(())
        }

        fn generate(&self, env: &mut CodegenEnv<'_>) -> Result<String>;
    }
}

pub trait Codegen: sealed::Emit {
    fn generate_code(&self, env: &mut CodegenEnv<'_>) -> Result<String> {
        let mut scope = env.enter(self.frame());
        trace!(context = %scope.trail(), "generate");
        if let Err(err) = self.verify(&scope) {
            return Err(scope.verification_error(err));
        }
        self.generate(&mut scope)
    }
}

impl Codegen for ContractDefn {}
impl Codegen for ExecDefn {}
impl Codegen for IfExpr {}
impl Codegen for AssignStmt {}

impl sealed::Emit for ContractDefn {
    fn frame(&self) -> Frame {
        Frame::new("contract", self.name.as_str())
    }

    fn verify(&self, _env: &CodegenEnv<'_>) -> std::result::Result<(), VerificationError> {
        let mut state = HashMap::new();
        let mut handlers = HashMap::new();
        for item in &self.body {
            match item {
                Node::StateItem(defn) => claim(
                    &mut state,
                    defn.name.as_str(),
                    screaming_snake_case(defn.name.as_str()),
                    VerificationError::DuplicateState,
                )?,
                Node::StateMap(defn) => claim(
                    &mut state,
                    defn.name.as_str(),
                    screaming_snake_case(defn.name.as_str()),
                    VerificationError::DuplicateState,
                )?,
                Node::Exec(defn) => claim(
                    &mut handlers,
                    defn.name.as_str(),
                    snake_case(defn.name.as_str()),
                    VerificationError::DuplicateHandler,
                )?,
                _ => {}
            }
        }
        Ok(())
    }

    fn generate(&self, env: &mut CodegenEnv<'_>) -> Result<String> {
        debug!(contract = %self.name, items = self.body.len(), "generating contract");
        let binding = resolver::bind_contract(self, env)?;
        env.render(&binding)
    }
}

impl sealed::Emit for ExecDefn {
    fn frame(&self) -> Frame {
        Frame::new("exec", self.name.as_str())
    }

    fn verify(&self, _env: &CodegenEnv<'_>) -> std::result::Result<(), VerificationError> {
        let mut seen = HashSet::new();
        match self.args.iter().find(|arg| !seen.insert(arg.name.as_str())) {
            Some(dup) => Err(VerificationError::DuplicateParam(dup.name.to_string())),
            None => Ok(()),
        }
    }

    fn generate(&self, env: &mut CodegenEnv<'_>) -> Result<String> {
        debug!(handler = %self.name, params = self.args.len(), "generating exec handler");
        let binding = resolver::bind_function(self, env)?;
        env.render(&binding)
    }
}

impl sealed::Emit for IfExpr {
    fn frame(&self) -> Frame {
        Frame::new("if", "")
    }

    fn verify(&self, env: &CodegenEnv<'_>) -> std::result::Result<(), VerificationError> {
        let Some(table) = env.state() else {
            return Ok(());
        };
        for clause in std::iter::once(&self.if_clause).chain(&self.else_if_clauses) {
            for access in state_accesses(&clause.cond) {
                check_access(&access, table)?;
            }
        }
        Ok(())
    }

    fn generate(&self, env: &mut CodegenEnv<'_>) -> Result<String> {
        let binding = resolver::bind_conditional(self, env)?;
        env.render(&binding)
    }
}

impl sealed::Emit for AssignStmt {
    fn frame(&self) -> Frame {
        Frame::new("assign", self.lhs.spelling())
    }

    fn verify(&self, env: &CodegenEnv<'_>) -> std::result::Result<(), VerificationError> {
        if self.lhs.is_message_access() {
            return Err(VerificationError::ReadOnlyTarget(self.lhs.spelling()));
        }

        let Some(table) = env.state() else {
            return Ok(());
        };
        let lhs = state_accesses(&self.lhs);
        let rhs = state_accesses(&self.rhs);
        for access in lhs.iter().chain(&rhs) {
            check_access(access, table)?;
        }

        let target = state_target(&self.lhs).and_then(|target| table.get(&target.key));
        let source = state_target(&self.rhs)
            .filter(|rhs| rhs.lookups == 0)
            .and_then(|rhs| table.get(&rhs.key));
        if let (Some(decl), Some(source)) = (target, source) {
            if !types::compatible(&decl.ty, &source.ty) {
                return Err(VerificationError::TypeMismatch {
                    target: self.lhs.spelling(),
                    expected: decl.ty.clone(),
                    found: source.ty.clone(),
                });
            }
        }
        Ok(())
    }

    fn generate(&self, env: &mut CodegenEnv<'_>) -> Result<String> {
        let binding = resolver::bind_assignment(self, env)?;
        env.render(&binding)
    }
}

/// Records `name` under the identifier it becomes in generated code. Two
/// declarations may not share one, whether spelled alike or not.
fn claim<'a>(
    seen: &mut HashMap<String, &'a str>,
    name: &'a str,
    host: String,
    duplicate: fn(String) -> VerificationError,
) -> std::result::Result<(), VerificationError> {
    match seen.entry(host) {
        Entry::Vacant(slot) => {
            slot.insert(name);
            Ok(())
        }
        Entry::Occupied(slot) if *slot.get() == name => Err(duplicate(name.to_string())),
        Entry::Occupied(slot) => Err(VerificationError::NameClash {
            first: slot.get().to_string(),
            second: name.to_string(),
            host: slot.key().clone(),
        }),
    }
}

/// The declaration `target` refers to, provided it is declared and used
/// with the declared shape and key count.
fn check_access<'t>(
    target: &StateTarget,
    table: &'t StateTable,
) -> std::result::Result<&'t StateDecl, VerificationError> {
    let decl = table
        .get(&target.key)
        .ok_or_else(|| VerificationError::UndeclaredState(target.key.clone()))?;

    match (decl.is_map(), target.lookups) {
        (false, 0) => Ok(decl),
        (false, _) => Err(VerificationError::ShapeMismatch {
            key: target.key.clone(),
            declared: "an item",
            used: "a map",
        }),
        (true, 0) => Err(VerificationError::ShapeMismatch {
            key: target.key.clone(),
            declared: "a map",
            used: "an item",
        }),
        (true, found) if found != decl.keys.len() => Err(VerificationError::KeyArity {
            key: target.key.clone(),
            expected: decl.keys.len(),
            found,
        }),
        (true, _) => Ok(decl),
    }
}
