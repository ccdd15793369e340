//! Maps lowered constructs to a template name plus named bindings.

use cwscript_core::{
    ast::{AssignStmt, ContractDefn, ExecDefn, IfClause, IfExpr, Node},
    BindingValue, Lowered, Result, StateDecl, TemplateBinding, TemplateName,
};

use crate::context::{CodegenEnv, StateTable};
use crate::lowering::{lower, lower_all};

/// Which assignment template a lowered left-hand side calls for.
pub fn select_template(lhs: &Lowered) -> TemplateName {
    match lhs {
        Lowered::Item(_) => TemplateName::SetStateItem,
        Lowered::Map(_) => TemplateName::SetStateMap,
        _ => TemplateName::SetVariable,
    }
}

pub fn bind_function(defn: &ExecDefn, env: &mut CodegenEnv<'_>) -> Result<TemplateBinding> {
    let args = defn
        .args
        .iter()
        .map(|param| {
            BindingValue::pair(
                BindingValue::Text(param.name.to_string()),
                BindingValue::Type(param.ty.clone()),
            )
        })
        .collect();
    let body = lower_all(&defn.body, env)?;

    Ok(TemplateBinding::new(TemplateName::Function)
        .with("name", BindingValue::Text(defn.name.to_string()))
        .with("args", BindingValue::List(args))
        .with("body", BindingValue::values(body)))
}

pub fn bind_conditional(expr: &IfExpr, env: &mut CodegenEnv<'_>) -> Result<TemplateBinding> {
    let if_clause = bind_clause(&expr.if_clause, env)?;
    let else_if_clauses = expr
        .else_if_clauses
        .iter()
        .map(|clause| bind_clause(clause, env))
        .collect::<Result<Vec<_>>>()?;
    let else_body = match &expr.else_body {
        Some(body) => BindingValue::values(lower_all(body, env)?),
        None => BindingValue::Absent,
    };

    Ok(TemplateBinding::new(TemplateName::Conditional)
        .with("if_clause", if_clause)
        .with("else_if_clauses", BindingValue::List(else_if_clauses))
        .with("else_body", else_body))
}

fn bind_clause(clause: &IfClause, env: &mut CodegenEnv<'_>) -> Result<BindingValue> {
    let cond = lower(&clause.cond, env)?;
    let body = lower_all(&clause.body, env)?;
    Ok(BindingValue::pair(
        BindingValue::Value(cond),
        BindingValue::values(body),
    ))
}

pub fn bind_assignment(stmt: &AssignStmt, env: &mut CodegenEnv<'_>) -> Result<TemplateBinding> {
    let lhs = lower(&stmt.lhs, env)?;
    let rhs = lower(&stmt.rhs, env)?;
    let lhs_is_ident = matches!(stmt.lhs.as_ref(), Node::Ident(_));
    let rhs_is_item = rhs.is_item();

    Ok(TemplateBinding::new(select_template(&lhs))
        .with("lhs", BindingValue::Value(lhs))
        .with("rhs", BindingValue::Value(rhs))
        .with("lhs_is_ident", BindingValue::Flag(lhs_is_ident))
        .with("rhs_is_item", BindingValue::Flag(rhs_is_item)))
}

/// State declarations of a contract, in source order.
pub fn state_decls(defn: &ContractDefn) -> Vec<StateDecl> {
    defn.body
        .iter()
        .filter_map(|item| match item {
            Node::StateItem(item) => Some(StateDecl {
                name: item.name.to_string(),
                keys: Vec::new(),
                ty: item.ty.clone(),
            }),
            Node::StateMap(map) => Some(StateDecl {
                name: map.name.to_string(),
                keys: map.keys.iter().map(|key| key.ty.clone()).collect(),
                ty: map.ty.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Binds a whole contract. Its state is installed in `env` while the body is
/// lowered; nested contracts are left to the assembler, which emits them as
/// units of their own.
pub fn bind_contract(defn: &ContractDefn, env: &mut CodegenEnv<'_>) -> Result<TemplateBinding> {
    let decls = state_decls(defn);
    let outer = env.replace_state(Some(StateTable::new(decls.iter().cloned())));

    let body = defn
        .body
        .iter()
        .filter(|item| {
            !matches!(
                item,
                Node::StateItem(_) | Node::StateMap(_) | Node::Contract(_)
            )
        })
        .map(|item| lower(item, env))
        .collect::<Result<Vec<_>>>();
    env.replace_state(outer);

    Ok(TemplateBinding::new(TemplateName::Contract)
        .with("name", BindingValue::Text(defn.name.to_string()))
        .with(
            "state",
            BindingValue::List(decls.into_iter().map(BindingValue::State).collect()),
        )
        .with("body", BindingValue::values(body?)))
}
