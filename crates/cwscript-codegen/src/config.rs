use serde::{Deserialize, Serialize};

/// What to do with a node kind that has no lowering rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Emit a `// Omitted: ...` placeholder and carry on.
    #[default]
    Permissive,
    /// Fail with `GenerationError::UnsupportedNode`.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub fallback: FallbackMode,
}

impl CodegenConfig {
    pub fn strict() -> Self {
        Self {
            fallback: FallbackMode::Strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.fallback == FallbackMode::Strict
    }
}
