//! Syntax tree handed to the code generator by the front-end.
//!
//! Trees are immutable once built. They serialize to an adjacently tagged JSON form
//! (`{"kind": "assign", "node": {...}}`) so an external parser can feed the compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::TypeExpr;

/// Reserved identifier for persistent contract state.
pub const STATE_ROOT: &str = "$state";

/// Reserved identifier for the message context of the current invocation.
pub const MESSAGE_ROOT: &str = "$msg";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Node>,
}

impl Program {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }

    /// Every contract definition in pre-order, nested definitions included.
    pub fn contracts(&self) -> Vec<&ContractDefn> {
        let mut found = Vec::new();
        for item in &self.items {
            collect_contracts(item, &mut found);
        }
        found
    }
}

fn collect_contracts<'a>(node: &'a Node, found: &mut Vec<&'a ContractDefn>) {
    if let Node::Contract(defn) = node {
        found.push(defn);
    }
    for child in node.children() {
        collect_contracts(child, found);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node", rename_all = "kebab-case")]
pub enum Node {
    Contract(ContractDefn),
    StateItem(StateItemDefn),
    StateMap(StateMapDefn),
    Exec(ExecDefn),
    If(IfExpr),
    Assign(AssignStmt),
    Lookup(TableLookupExpr),
    Member(MemberAccessExpr),
    Ident(Ident),
    Literal(Literal),
    Binary(BinaryExpr),
    FnCall(FnCallExpr),
    Emit(EmitStmt),
    Return(ReturnStmt),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Contract(_) => "contract",
            Node::StateItem(_) => "state-item",
            Node::StateMap(_) => "state-map",
            Node::Exec(_) => "exec",
            Node::If(_) => "if",
            Node::Assign(_) => "assign",
            Node::Lookup(_) => "lookup",
            Node::Member(_) => "member",
            Node::Ident(_) => "ident",
            Node::Literal(_) => "literal",
            Node::Binary(_) => "binary",
            Node::FnCall(_) => "fn-call",
            Node::Emit(_) => "emit",
            Node::Return(_) => "return",
        }
    }

    /// Short human-readable label used in placeholders and diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Node::Contract(defn) => format!("contract {}", defn.name),
            Node::StateItem(defn) => format!("state-item {}", defn.name),
            Node::StateMap(defn) => format!("state-map {}", defn.name),
            Node::Exec(defn) => format!("exec {}", defn.name),
            Node::Ident(ident) => format!("ident {}", ident),
            Node::Literal(lit) => format!("literal {}", lit),
            Node::Member(_) | Node::Lookup(_) => format!("{} {}", self.kind(), self.spelling()),
            Node::FnCall(call) => match call.func.as_ref() {
                Node::Ident(name) => format!("fn-call {}", name),
                _ => "fn-call".to_string(),
            },
            other => other.kind().to_string(),
        }
    }

    /// Approximate source spelling of an expression, e.g. `$state.balances[owner]`.
    pub fn spelling(&self) -> String {
        match self {
            Node::Ident(ident) => ident.to_string(),
            Node::Literal(lit) => lit.to_string(),
            Node::Member(expr) => format!("{}.{}", expr.item.spelling(), expr.member),
            Node::Lookup(expr) => format!("{}[{}]", expr.item.spelling(), expr.key.spelling()),
            Node::Binary(expr) => {
                format!("{} {} {}", expr.lhs.spelling(), expr.op, expr.rhs.spelling())
            }
            other => other.describe(),
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Contract(defn) => defn.body.iter().collect(),
            Node::Exec(defn) => defn.body.iter().collect(),
            Node::If(expr) => {
                let mut out = Vec::new();
                for clause in std::iter::once(&expr.if_clause).chain(&expr.else_if_clauses) {
                    out.push(clause.cond.as_ref());
                    out.extend(clause.body.iter());
                }
                if let Some(body) = &expr.else_body {
                    out.extend(body.iter());
                }
                out
            }
            Node::Assign(stmt) => vec![stmt.lhs.as_ref(), stmt.rhs.as_ref()],
            Node::Lookup(expr) => vec![expr.item.as_ref(), expr.key.as_ref()],
            Node::Member(expr) => vec![expr.item.as_ref()],
            Node::Binary(expr) => vec![expr.lhs.as_ref(), expr.rhs.as_ref()],
            Node::FnCall(call) => std::iter::once(call.func.as_ref())
                .chain(call.args.iter())
                .collect(),
            Node::Emit(stmt) => vec![stmt.expr.as_ref()],
            Node::Return(stmt) => stmt.expr.iter().map(|e| e.as_ref()).collect(),
            Node::StateItem(_) | Node::StateMap(_) | Node::Ident(_) | Node::Literal(_) => {
                Vec::new()
            }
        }
    }

    pub fn ident(name: &str) -> Self {
        Node::Ident(Ident::new(name))
    }

    pub fn int(value: impl Into<String>) -> Self {
        Node::Literal(Literal::Int(value.into()))
    }

    pub fn member(item: Node, member: &str) -> Self {
        Node::Member(MemberAccessExpr {
            item: Box::new(item),
            member: Ident::new(member),
        })
    }

    pub fn lookup(item: Node, key: Node) -> Self {
        Node::Lookup(TableLookupExpr {
            item: Box::new(item),
            key: Box::new(key),
        })
    }

    pub fn assign(lhs: Node, rhs: Node) -> Self {
        Node::Assign(AssignStmt {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn binary(op: &str, lhs: Node, rhs: Node) -> Self {
        Node::Binary(BinaryExpr {
            op: op.to_string(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// `$state.<name>`
    pub fn state(name: &str) -> Self {
        Node::member(Node::ident(STATE_ROOT), name)
    }

    /// `$msg.<name>`
    pub fn msg(name: &str) -> Self {
        Node::member(Node::ident(MESSAGE_ROOT), name)
    }

    /// True for anything reached through `$msg` (`$msg.sender`, `$msg.funds[0]`,
    /// `$msg.sender.inner`). The message context can be read but never assigned.
    pub fn is_message_access(&self) -> bool {
        match self {
            Node::Member(expr) => match expr.item.as_ref() {
                Node::Ident(root) => root.as_str() == MESSAGE_ROOT,
                item => item.is_message_access(),
            },
            Node::Lookup(expr) => expr.item.is_message_access(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDefn {
    pub name: Ident,
    #[serde(default)]
    pub body: Vec<Node>,
}

impl ContractDefn {
    pub fn new(name: &str, body: Vec<Node>) -> Self {
        Self {
            name: Ident::new(name),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateItemDefn {
    pub name: Ident,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMapDefn {
    pub name: Ident,
    pub keys: Vec<MapKey>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapKey {
    #[serde(default)]
    pub name: Option<Ident>,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecDefn {
    pub name: Ident,
    #[serde(default)]
    pub args: Vec<Param>,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
}

impl Param {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: Ident::new(name),
            ty: TypeExpr::new(ty),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    pub if_clause: IfClause,
    #[serde(default)]
    pub else_if_clauses: Vec<IfClause>,
    /// `None` when the source has no `else`; `Some(vec![])` for an empty one.
    #[serde(default)]
    pub else_body: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfClause {
    pub cond: Box<Node>,
    #[serde(default)]
    pub body: Vec<Node>,
}

impl IfClause {
    pub fn new(cond: Node, body: Vec<Node>) -> Self {
        Self {
            cond: Box::new(cond),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableLookupExpr {
    pub item: Box<Node>,
    pub key: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccessExpr {
    pub item: Box<Node>,
    pub member: Ident,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(String),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(digits) => f.write_str(digits),
            Literal::Str(text) => write!(f, "{:?}", text),
            Literal::Bool(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: String,
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnCallExpr {
    pub func: Box<Node>,
    #[serde(default)]
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitStmt {
    pub expr: Box<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    #[serde(default)]
    pub expr: Option<Box<Node>>,
}
