use cwscript_core::{
    CodegenError, GenerationError, Renderer, Result, StateDecl, TemplateBinding,
    VerificationError,
};
use indexmap::IndexMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::config::CodegenConfig;

/// One entry on the context stack: the construct currently being generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: &'static str,
    pub label: String,
}

impl Frame {
    pub fn new(kind: &'static str, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            f.write_str(self.kind)
        } else {
            write!(f, "{} {}", self.kind, self.label)
        }
    }
}

#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `contract Token > exec transfer > assign $state.total`
    pub fn trail(&self) -> String {
        if self.frames.is_empty() {
            return "<top level>".to_string();
        }
        self.frames
            .iter()
            .map(|frame| frame.to_string())
            .collect::<Vec<_>>()
            .join(" > ")
    }

    fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }
}

/// State declared by the contract being compiled.
#[derive(Debug, Default, Clone)]
pub struct StateTable {
    decls: IndexMap<String, StateDecl>,
}

impl StateTable {
    pub fn new(decls: impl IntoIterator<Item = StateDecl>) -> Self {
        Self {
            decls: decls
                .into_iter()
                .map(|decl| (decl.name.clone(), decl))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StateDecl> {
        self.decls.get(key)
    }
}

/// Everything one compilation needs: the renderer, the context stack and the
/// enclosing contract's state. Not shared between compilations.
pub struct CodegenEnv<'r> {
    renderer: &'r dyn Renderer,
    config: CodegenConfig,
    stack: ContextStack,
    state: Option<StateTable>,
}

impl<'r> CodegenEnv<'r> {
    pub fn new(renderer: &'r dyn Renderer) -> Self {
        Self::with_config(renderer, CodegenConfig::default())
    }

    pub fn with_config(renderer: &'r dyn Renderer, config: CodegenConfig) -> Self {
        Self {
            renderer,
            config,
            stack: ContextStack::new(),
            state: None,
        }
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    pub fn stack(&self) -> &ContextStack {
        &self.stack
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn trail(&self) -> String {
        self.stack.trail()
    }

    /// `None` outside of a contract, where state declarations are unknown.
    pub fn state(&self) -> Option<&StateTable> {
        self.state.as_ref()
    }

    pub(crate) fn replace_state(&mut self, state: Option<StateTable>) -> Option<StateTable> {
        std::mem::replace(&mut self.state, state)
    }

    /// Push `frame` for as long as the returned guard lives.
    pub(crate) fn enter(&mut self, frame: Frame) -> Scope<'_, 'r> {
        self.stack.push(frame);
        Scope { env: self }
    }

    pub fn render(&self, binding: &TemplateBinding) -> Result<String> {
        self.renderer
            .render(binding)
            .map_err(|err| self.generation_error(err))
    }

    pub fn verification_error(&self, source: VerificationError) -> CodegenError {
        CodegenError::Verification {
            context: self.trail(),
            source,
        }
    }

    pub fn generation_error(&self, source: GenerationError) -> CodegenError {
        CodegenError::Generation {
            context: self.trail(),
            source,
        }
    }
}

/// Pops its frame on drop, so every exit path (including `?`) leaves the
/// stack as deep as it was before `enter`.
pub(crate) struct Scope<'e, 'r> {
    env: &'e mut CodegenEnv<'r>,
}

impl<'e, 'r> Deref for Scope<'e, 'r> {
    type Target = CodegenEnv<'r>;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl<'e, 'r> DerefMut for Scope<'e, 'r> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

impl Drop for Scope<'_, '_> {
    fn drop(&mut self) {
        self.env.stack.pop();
    }
}
