//! Intermediate values produced while lowering a syntax tree.
//!
//! Only two shapes are structured: a single state item and a multi-key state map entry.
//! Everything else is an opaque fragment that is forwarded to the renderer untouched.
//! None of these values outlive the traversal that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub key: String,
}

impl ItemRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// A state map entry. `keys` is never empty: a map reference only comes into
/// existence when the first lookup is applied to an item reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRef {
    pub base_key: String,
    pub keys: Vec<Lowered>,
}

impl MapRef {
    /// Promote an item reference on its first lookup.
    pub fn promote(item: ItemRef, first_key: Lowered) -> Self {
        Self {
            base_key: item.key,
            keys: vec![first_key],
        }
    }

    /// Chained lookups accumulate keys instead of nesting.
    pub fn push_key(&mut self, key: Lowered) {
        self.keys.push(key);
    }

    pub fn key_texts(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lowered {
    Item(ItemRef),
    Map(MapRef),
    /// Rendered text, a forwarded identifier, or a literal.
    Fragment { text: String },
    /// `base[key]` on something that is not contract state.
    Lookup {
        base: Box<Lowered>,
        key: Box<Lowered>,
    },
    /// `base.member` where `base` is structured and must be kept intact.
    Member { base: Box<Lowered>, member: String },
    Op {
        op: String,
        lhs: Box<Lowered>,
        rhs: Box<Lowered>,
    },
}

impl Lowered {
    pub fn fragment(text: impl Into<String>) -> Self {
        Lowered::Fragment { text: text.into() }
    }

    pub fn item(key: impl Into<String>) -> Self {
        Lowered::Item(ItemRef::new(key))
    }

    pub fn map(base_key: impl Into<String>, keys: Vec<Lowered>) -> Self {
        Lowered::Map(MapRef {
            base_key: base_key.into(),
            keys,
        })
    }

    pub fn as_fragment(&self) -> Option<&str> {
        match self {
            Lowered::Fragment { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self, Lowered::Item(_))
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Lowered::Item(_) | Lowered::Map(_))
    }
}

/// Source-level spelling, used for diagnostics and for the textual view of map keys.
impl fmt::Display for Lowered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lowered::Item(item) => write!(f, "$state.{}", item.key),
            Lowered::Map(map) => {
                write!(f, "$state.{}", map.base_key)?;
                for key in &map.keys {
                    write!(f, "[{}]", key)?;
                }
                Ok(())
            }
            Lowered::Fragment { text } => f.write_str(text),
            Lowered::Lookup { base, key } => write!(f, "{}[{}]", base, key),
            Lowered::Member { base, member } => write!(f, "{}.{}", base, member),
            Lowered::Op { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
        }
    }
}
