use thiserror::Error;

use crate::types::TypeExpr;

/// A semantic defect found before any text is emitted for a construct.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("cannot assign {found} to `{target}` of type {expected}")]
    TypeMismatch {
        target: String,
        expected: TypeExpr,
        found: TypeExpr,
    },

    #[error("state `{0}` is not declared in this contract")]
    UndeclaredState(String),

    #[error("state `{key}` is declared as {declared} but used as {used}")]
    ShapeMismatch {
        key: String,
        declared: &'static str,
        used: &'static str,
    },

    #[error("state map `{key}` takes {expected} key(s), got {found}")]
    KeyArity {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("`{0}` is read-only and cannot be assigned")]
    ReadOnlyTarget(String),

    #[error("state `{0}` is declared more than once")]
    DuplicateState(String),

    #[error("handler `{0}` is declared more than once")]
    DuplicateHandler(String),

    #[error("`{second}` and `{first}` both become `{host}` in generated code")]
    NameClash {
        first: String,
        second: String,
        host: String,
    },

    #[error("parameter `{0}` is declared more than once")]
    DuplicateParam(String),
}

/// A construct passed verification but could not be turned into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("no lowering for {0}")]
    UnsupportedNode(String),

    #[error("template `{template}` is missing binding `{key}`")]
    MissingBinding { template: String, key: String },

    #[error("template `{template}` expected {expected} for `{key}`, found {found}")]
    BindingShape {
        template: String,
        key: String,
        expected: String,
        found: String,
    },

    #[error("render failed: {0}")]
    Render(String),
}

/// Either error kind, tagged with the context trail active when it was raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("verification failed in {context}: {source}")]
    Verification {
        context: String,
        #[source]
        source: VerificationError,
    },

    #[error("generation failed in {context}: {source}")]
    Generation {
        context: String,
        #[source]
        source: GenerationError,
    },
}

impl CodegenError {
    pub fn is_verification(&self) -> bool {
        matches!(self, CodegenError::Verification { .. })
    }

    pub fn context(&self) -> &str {
        match self {
            CodegenError::Verification { context, .. } | CodegenError::Generation { context, .. } => {
                context
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CodegenError>;
