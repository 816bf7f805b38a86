//! Row values and result shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How rows are returned to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Positional values in column order.
    #[default]
    Array,
    /// Column name to value.
    Object,
}

/// One dataset row in the requested [`Shape`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Row {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl Row {
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            Self::Object(_) => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            Self::Array(_) => None,
        }
    }

    /// Value by column name (object rows only, exact case).
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(column))
    }

    /// Number of values held.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Array(values) => values.len(),
            Self::Object(map) => map.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
