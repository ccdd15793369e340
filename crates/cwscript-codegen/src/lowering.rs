use cwscript_core::{
    ast::{MemberAccessExpr, Node, TableLookupExpr},
    GenerationError, Lowered, MapRef, Result, MESSAGE_ROOT, STATE_ROOT,
};
use tracing::{trace, warn};

use crate::config::FallbackMode;
use crate::context::CodegenEnv;
use crate::protocol::Codegen;

/// Host binding that carries the message context (`info.sender`, `info.funds`).
pub const MESSAGE_ACCESSOR: &str = "info";

/// Lower one node. Constructs that emit code go through `generate_code`
/// and come back as rendered fragments.
pub fn lower(node: &Node, env: &mut CodegenEnv<'_>) -> Result<Lowered> {
    trace!(kind = node.kind(), depth = env.depth(), "lower");
    match node {
        Node::Contract(defn) => Ok(Lowered::fragment(defn.generate_code(env)?)),
        Node::Exec(defn) => Ok(Lowered::fragment(defn.generate_code(env)?)),
        Node::If(expr) => Ok(Lowered::fragment(expr.generate_code(env)?)),
        Node::Assign(stmt) => Ok(Lowered::fragment(stmt.generate_code(env)?)),
        Node::Lookup(expr) => lower_lookup(expr, env),
        Node::Member(expr) => lower_member(expr, env),
        Node::Ident(ident) => Ok(Lowered::fragment(ident.as_str())),
        Node::Literal(lit) => Ok(Lowered::fragment(lit.to_string())),
        Node::Binary(expr) => {
            let lhs = lower(&expr.lhs, env)?;
            let rhs = lower(&expr.rhs, env)?;
            Ok(Lowered::Op {
                op: expr.op.clone(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        }
        Node::StateItem(_)
        | Node::StateMap(_)
        | Node::FnCall(_)
        | Node::Emit(_)
        | Node::Return(_) => fallback(node, env),
    }
}

/// Lower a sequence, keeping source order. Nested contract definitions are
/// skipped; the assembler emits each of them as a unit of its own.
pub fn lower_all(nodes: &[Node], env: &mut CodegenEnv<'_>) -> Result<Vec<Lowered>> {
    nodes
        .iter()
        .filter(|node| !matches!(node, Node::Contract(_)))
        .map(|node| lower(node, env))
        .collect()
}

fn lower_lookup(expr: &TableLookupExpr, env: &mut CodegenEnv<'_>) -> Result<Lowered> {
    let base = lower(&expr.item, env)?;
    let key = lower(&expr.key, env)?;
    Ok(match base {
        Lowered::Item(item) => Lowered::Map(MapRef::promote(item, key)),
        Lowered::Map(mut map) => {
            map.push_key(key);
            Lowered::Map(map)
        }
        other => Lowered::Lookup {
            base: Box::new(other),
            key: Box::new(key),
        },
    })
}

fn lower_member(expr: &MemberAccessExpr, env: &mut CodegenEnv<'_>) -> Result<Lowered> {
    let base = lower(&expr.item, env)?;
    let member = expr.member.as_str();
    Ok(match base.as_fragment() {
        Some(STATE_ROOT) => Lowered::item(member),
        Some(MESSAGE_ROOT) => Lowered::fragment(format!("{}.{}", MESSAGE_ACCESSOR, member)),
        Some(text) => Lowered::fragment(format!("{}.{}", text, member)),
        None => Lowered::Member {
            base: Box::new(base),
            member: member.to_string(),
        },
    })
}

fn fallback(node: &Node, env: &CodegenEnv<'_>) -> Result<Lowered> {
    match env.config().fallback {
        FallbackMode::Strict => Err(env.generation_error(GenerationError::UnsupportedNode(
            node.describe(),
        ))),
        FallbackMode::Permissive => {
            warn!(node = %node.describe(), context = %env.trail(), "no lowering, emitting placeholder");
            Ok(Lowered::fragment(format!("// Omitted: {}", node.describe())))
        }
    }
}

/// The state slot an expression addresses, read off the syntax alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTarget {
    pub key: String,
    /// Number of `[...]` applied; zero means a plain item.
    pub lookups: usize,
}

/// Classifies `node` the same way `lower` does for state access
/// (`$state.x` is an item, each lookup on it adds a key) without lowering anything.
pub fn state_target(node: &Node) -> Option<StateTarget> {
    match node {
        Node::Member(expr) => match expr.item.as_ref() {
            Node::Ident(root) if root.as_str() == STATE_ROOT => Some(StateTarget {
                key: expr.member.to_string(),
                lookups: 0,
            }),
            _ => None,
        },
        Node::Lookup(expr) => state_target(&expr.item).map(|target| StateTarget {
            lookups: target.lookups + 1,
            ..target
        }),
        _ => None,
    }
}

/// Every state slot an expression touches, outermost first. Keys of a map
/// access are searched too, so `$state.m[$state.k]` yields `m` then `k`.
pub fn state_accesses(node: &Node) -> Vec<StateTarget> {
    let mut found = Vec::new();
    collect_accesses(node, &mut found);
    found
}

fn collect_accesses(node: &Node, found: &mut Vec<StateTarget>) {
    let Some(target) = state_target(node) else {
        for child in node.children() {
            collect_accesses(child, found);
        }
        return;
    };
    found.push(target);

    let mut keys = Vec::new();
    let mut cursor = node;
    while let Node::Lookup(expr) = cursor {
        keys.push(expr.key.as_ref());
        cursor = expr.item.as_ref();
    }
    for key in keys.into_iter().rev() {
        collect_accesses(key, found);
    }
}
