use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared type as written in source, e.g. `Uint128`, `Addr`, `i32`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeExpr(pub String);

impl TypeExpr {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Trailing `?` marks an optional value.
    pub fn is_optional(&self) -> bool {
        self.0.ends_with('?')
    }

    pub fn base(&self) -> &str {
        self.0.trim_end_matches('?')
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type compatibility between a declared slot and an assigned value.
///
/// No type lattice exists yet, so every pair is accepted. Callers still route
/// through here so that tightening the rule is a single change.
pub fn compatible(_expected: &TypeExpr, _found: &TypeExpr) -> bool {
    true
}
