//! Renders template bindings as CosmWasm contract source.
//!
//! State items become `cw_storage_plus` constants named after the key in
//! SCREAMING_SNAKE case, reads go through `deps.storage`, and the message context is
//! whatever the lowering forwarded (`info.sender`).

use cwscript_core::{
    BindingValue, GenerationError, Lowered, Renderer, StateDecl, TemplateBinding, TemplateName,
    TypeExpr,
};

use crate::config::EmitterConfig;
use crate::emitter::{screaming_snake_case, snake_case, EmitContext, SourceWriter};

type RenderResult<T> = Result<T, GenerationError>;

#[derive(Debug, Clone, Default)]
pub struct CosmWasmRenderer {
    config: EmitterConfig,
}

impl CosmWasmRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    fn writer(&self) -> SourceWriter {
        SourceWriter::new(EmitContext::with_style(self.config.indent_style))
    }

    /// Host expression for a lowered value.
    pub fn expr(&self, value: &Lowered) -> String {
        match value {
            Lowered::Item(item) => load_item(&item.key),
            Lowered::Map(map) => format!(
                "{}.load(deps.storage, {})?",
                screaming_snake_case(&map.base_key),
                self.map_key(&map.keys)
            ),
            Lowered::Fragment { text } => text.clone(),
            Lowered::Lookup { base, key } => format!("{}[{}]", self.expr(base), self.expr(key)),
            Lowered::Member { base, member } => format!("{}.{}", self.expr(base), member),
            Lowered::Op { op, lhs, rhs } => {
                format!("{} {} {}", self.operand(lhs), op, self.operand(rhs))
            }
        }
    }

    fn operand(&self, value: &Lowered) -> String {
        match value {
            Lowered::Op { .. } => format!("({})", self.expr(value)),
            other => self.expr(other),
        }
    }

    fn map_key(&self, keys: &[Lowered]) -> String {
        match keys {
            [single] => format!("&{}", self.expr(single)),
            many => format!(
                "({})",
                many.iter()
                    .map(|key| format!("&{}", self.expr(key)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    /// Right-hand side of an assignment. Item references are dereferenced
    /// through a storage load; anything else is used as written.
    fn assigned_value(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let rhs = binding.value("rhs")?;
        Ok(match (binding.flag("rhs_is_item")?, rhs) {
            (true, Lowered::Item(item)) => load_item(&item.key),
            (_, other) => self.expr(other),
        })
    }

    fn statements(
        &self,
        out: &mut SourceWriter,
        items: &[BindingValue],
        binding: &TemplateBinding,
        key: &str,
    ) -> RenderResult<()> {
        for item in items {
            match item {
                BindingValue::Value(Lowered::Fragment { text }) => out.embed(text),
                BindingValue::Value(other) => out.line(&format!("{};", self.expr(other))),
                other => return Err(binding.mismatch(key, "value", other)),
            }
        }
        Ok(())
    }

    fn render_contract(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let name = binding.text("name")?;
        let state = binding.list("state")?;
        let body = binding.list("body")?;

        let mut out = self.writer();
        if self.config.emit_header {
            out.line(&format!(
                "// Generated by cwscript from contract `{}`. Do not edit.",
                name
            ));
        }
        out.block(&format!("pub mod {}", snake_case(name)), |out| {
            out.line("use cosmwasm_std::*;");
            out.line("use cw_storage_plus::{Item, Map};");
            out.blank();
            out.line("use crate::error::ContractError;");

            if !state.is_empty() {
                out.blank();
                for decl in state {
                    match decl {
                        BindingValue::State(decl) => out.line(&state_const(decl)),
                        other => return Err(binding.mismatch("state", "state declaration", other)),
                    }
                }
            }

            for item in body {
                out.blank();
                self.statements(out, std::slice::from_ref(item), binding, "body")?;
            }
            Ok(())
        })?;
        Ok(out.finish())
    }

    fn render_function(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let name = binding.text("name")?;
        let mut params = vec![
            "deps: DepsMut".to_string(),
            "env: Env".to_string(),
            "info: MessageInfo".to_string(),
        ];
        for arg in binding.list("args")? {
            match arg {
                BindingValue::Pair(arg_name, arg_ty) => match (arg_name.as_ref(), arg_ty.as_ref()) {
                    (BindingValue::Text(arg_name), BindingValue::Type(arg_ty)) => {
                        params.push(format!("{}: {}", arg_name, host_type(arg_ty)))
                    }
                    _ => return Err(binding.mismatch("args", "(name, type)", arg)),
                },
                other => return Err(binding.mismatch("args", "(name, type)", other)),
            }
        }
        let body = binding.list("body")?;

        let mut out = self.writer();
        out.block(
            &format!(
                "pub fn exec_{}({}) -> Result<Response, ContractError>",
                snake_case(name),
                params.join(", ")
            ),
            |out| {
                self.statements(out, body, binding, "body")?;
                out.line(&format!(
                    "Ok(Response::new().add_attribute(\"action\", \"{}\"))",
                    name
                ));
                Ok(())
            },
        )?;
        Ok(out.finish())
    }

    fn clause<'b>(
        &self,
        binding: &'b TemplateBinding,
        key: &str,
        clause: &'b BindingValue,
    ) -> RenderResult<(&'b Lowered, &'b [BindingValue])> {
        match clause {
            BindingValue::Pair(cond, body) => match (cond.as_ref(), body.as_ref()) {
                (BindingValue::Value(cond), BindingValue::List(body)) => Ok((cond, body)),
                _ => Err(binding.mismatch(key, "(condition, body)", clause)),
            },
            other => Err(binding.mismatch(key, "(condition, body)", other)),
        }
    }

    fn render_conditional(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let mut out = self.writer();

        let (cond, body) = self.clause(binding, "if_clause", binding.get("if_clause")?)?;
        out.line(&format!("if {} {{", self.expr(cond)));
        out.indent();
        self.statements(&mut out, body, binding, "if_clause")?;
        out.dedent();

        for clause in binding.list("else_if_clauses")? {
            let (cond, body) = self.clause(binding, "else_if_clauses", clause)?;
            out.line(&format!("}} else if {} {{", self.expr(cond)));
            out.indent();
            self.statements(&mut out, body, binding, "else_if_clauses")?;
            out.dedent();
        }

        match binding.get("else_body")? {
            BindingValue::Absent => {}
            BindingValue::List(body) => {
                out.line("} else {");
                out.indent();
                self.statements(&mut out, body, binding, "else_body")?;
                out.dedent();
            }
            other => return Err(binding.mismatch("else_body", "list or absent", other)),
        }
        out.line("}");
        Ok(out.finish())
    }

    fn render_set_state_item(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let key = match binding.value("lhs")? {
            Lowered::Item(item) => &item.key,
            _ => return Err(binding.mismatch("lhs", "state item", binding.get("lhs")?)),
        };
        Ok(format!(
            "{}.save(deps.storage, &{})?;\n",
            screaming_snake_case(key),
            self.assigned_value(binding)?
        ))
    }

    fn render_set_state_map(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let map = match binding.value("lhs")? {
            Lowered::Map(map) => map,
            _ => return Err(binding.mismatch("lhs", "state map", binding.get("lhs")?)),
        };
        Ok(format!(
            "{}.save(deps.storage, {}, &{})?;\n",
            screaming_snake_case(&map.base_key),
            self.map_key(&map.keys),
            self.assigned_value(binding)?
        ))
    }

    fn render_set_variable(&self, binding: &TemplateBinding) -> RenderResult<String> {
        let lhs = self.expr(binding.value("lhs")?);
        let value = self.assigned_value(binding)?;
        Ok(if binding.flag("lhs_is_ident")? {
            format!("let {} = {};\n", lhs, value)
        } else {
            format!("{} = {};\n", lhs, value)
        })
    }
}

impl Renderer for CosmWasmRenderer {
    fn render(&self, binding: &TemplateBinding) -> RenderResult<String> {
        match binding.template {
            TemplateName::Contract => self.render_contract(binding),
            TemplateName::Function => self.render_function(binding),
            TemplateName::Conditional => self.render_conditional(binding),
            TemplateName::SetStateItem => self.render_set_state_item(binding),
            TemplateName::SetStateMap => self.render_set_state_map(binding),
            TemplateName::SetVariable => self.render_set_variable(binding),
        }
    }
}

fn load_item(key: &str) -> String {
    format!("{}.load(deps.storage)?", screaming_snake_case(key))
}

fn host_type(ty: &TypeExpr) -> String {
    if ty.is_optional() {
        format!("Option<{}>", ty.base())
    } else {
        ty.base().to_string()
    }
}

fn state_const(decl: &StateDecl) -> String {
    let name = screaming_snake_case(&decl.name);
    let value = host_type(&decl.ty);
    match decl.keys.as_slice() {
        [] => format!(
            "pub const {}: Item<{}> = Item::new(\"{}\");",
            name, value, decl.name
        ),
        [single] => format!(
            "pub const {}: Map<&{}, {}> = Map::new(\"{}\");",
            name,
            host_type(single),
            value,
            decl.name
        ),
        many => format!(
            "pub const {}: Map<({}), {}> = Map::new(\"{}\");",
            name,
            many.iter()
                .map(|key| format!("&{}", host_type(key)))
                .collect::<Vec<_>>()
                .join(", "),
            value,
            decl.name
        ),
    }
}
