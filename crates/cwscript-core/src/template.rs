//! Template bindings: the unit handed from the code generator to a renderer.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

use crate::error::GenerationError;
use crate::ir::Lowered;
use crate::types::TypeExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateName {
    Contract,
    Function,
    Conditional,
    SetStateItem,
    SetStateMap,
    SetVariable,
}

impl TemplateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Contract => "contract",
            TemplateName::Function => "function",
            TemplateName::Conditional => "conditional",
            TemplateName::SetStateItem => "set-state-item",
            TemplateName::SetStateMap => "set-state-map",
            TemplateName::SetVariable => "set-variable",
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state declaration as seen by the contract template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDecl {
    pub name: String,
    /// Empty for a plain item.
    pub keys: Vec<TypeExpr>,
    pub ty: TypeExpr,
}

impl StateDecl {
    pub fn is_map(&self) -> bool {
        !self.keys.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BindingValue {
    Text(String),
    Flag(bool),
    Value(Lowered),
    Type(TypeExpr),
    State(StateDecl),
    Pair(Box<BindingValue>, Box<BindingValue>),
    List(Vec<BindingValue>),
    /// An optional part that the source left out.
    Absent,
}

impl BindingValue {
    pub fn pair(first: BindingValue, second: BindingValue) -> Self {
        BindingValue::Pair(Box::new(first), Box::new(second))
    }

    pub fn values(items: Vec<Lowered>) -> Self {
        BindingValue::List(items.into_iter().map(BindingValue::Value).collect())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, BindingValue::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateBinding {
    pub template: TemplateName,
    pub bindings: IndexMap<String, BindingValue>,
}

impl TemplateBinding {
    pub fn new(template: TemplateName) -> Self {
        Self {
            template,
            bindings: IndexMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: BindingValue) -> Self {
        self.bindings.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Result<&BindingValue, GenerationError> {
        self.bindings
            .get(key)
            .ok_or_else(|| GenerationError::MissingBinding {
                template: self.template.to_string(),
                key: key.to_string(),
            })
    }

    pub fn text(&self, key: &str) -> Result<&str, GenerationError> {
        match self.get(key)? {
            BindingValue::Text(text) => Ok(text),
            other => Err(self.mismatch(key, "text", other)),
        }
    }

    pub fn flag(&self, key: &str) -> Result<bool, GenerationError> {
        match self.get(key)? {
            BindingValue::Flag(flag) => Ok(*flag),
            other => Err(self.mismatch(key, "flag", other)),
        }
    }

    pub fn value(&self, key: &str) -> Result<&Lowered, GenerationError> {
        match self.get(key)? {
            BindingValue::Value(value) => Ok(value),
            other => Err(self.mismatch(key, "value", other)),
        }
    }

    pub fn list(&self, key: &str) -> Result<&[BindingValue], GenerationError> {
        match self.get(key)? {
            BindingValue::List(items) => Ok(items),
            other => Err(self.mismatch(key, "list", other)),
        }
    }

    pub fn mismatch(&self, key: &str, expected: &str, found: &BindingValue) -> GenerationError {
        GenerationError::BindingShape {
            template: self.template.to_string(),
            key: key.to_string(),
            expected: expected.to_string(),
            found: format!("{:?}", found),
        }
    }
}

/// Turns a template binding into host-language source text.
///
/// Implementations must be stateless with respect to a single render call so one
/// renderer can be shared across independent compilations.
pub trait Renderer: Send + Sync {
    fn render(&self, binding: &TemplateBinding) -> Result<String, GenerationError>;
}

impl<R: Renderer + ?Sized> Renderer for &R {
    fn render(&self, binding: &TemplateBinding) -> Result<String, GenerationError> {
        (**self).render(binding)
    }
}
