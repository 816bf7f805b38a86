//! Row filters.
//!
//! A [`Filter`] is the declarative wire form:
//!
//! ```json
//! {
//!   "conditions": [
//!     {"variable": "AGE", "operator": "gt", "value": 80},
//!     {"variable": "SEX", "operator": "eq", "value": "M"}
//!   ],
//!   "connectors": ["and"],
//!   "options": {"caseInsensitive": false}
//! }
//! ```
//!
//! [`CompiledFilter::compile`] resolves it once against the dataset's columns
//! (column index, comparison class, parsed operands, built regexes) and
//! [`CompiledFilter::evaluate`] then runs per row.
//!
//! Conditions fold strictly left to right: condition `i` joins the running
//! result through `connectors[i - 1]`, with no precedence between `and` and
//! `or`. A filter whose connectors are all `and` stops at the first false; one
//! whose connectors are all `or` stops at the first true.

mod compile;
mod evaluate;

pub use compile::CompiledFilter;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Boolean connector between two consecutive conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    And,
    Or,
}

/// One `variable operator value` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub variable: String,
    /// Kept as text so that unknown operators surface as
    /// [`DatasetError::UnknownOperator`](crate::DatasetError::UnknownOperator).
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(variable: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            variable: variable.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Declarative filter over column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FilterOptions>,
}

impl Filter {
    /// A filter with a single condition.
    #[must_use]
    pub fn new(condition: FilterCondition) -> Self {
        Self {
            conditions: vec![condition],
            connectors: Vec::new(),
            options: None,
        }
    }

    /// Append a condition joined by `and`.
    #[must_use]
    pub fn and(self, condition: FilterCondition) -> Self {
        self.push(Connector::And, condition)
    }

    /// Append a condition joined by `or`.
    #[must_use]
    pub fn or(self, condition: FilterCondition) -> Self {
        self.push(Connector::Or, condition)
    }

    #[must_use]
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.options = Some(FilterOptions {
            case_insensitive: yes,
        });
        self
    }

    #[must_use]
    pub fn is_case_insensitive(&self) -> bool {
        self.options.is_some_and(|o| o.case_insensitive)
    }

    fn push(mut self, connector: Connector, condition: FilterCondition) -> Self {
        self.connectors.push(connector);
        self.conditions.push(condition);
        self
    }
}

/// Comparison operators understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    NotIn,
    Lt,
    Le,
    Gt,
    Ge,
    Starts,
    Ends,
    Contains,
    NotContains,
    Regex,
}

impl Operator {
    /// Parse the wire spelling; `None` for anything unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "in" => Self::In,
            "notin" => Self::NotIn,
            "lt" => Self::Lt,
            "le" => Self::Le,
            "gt" => Self::Gt,
            "ge" => Self::Ge,
            "starts" => Self::Starts,
            "ends" => Self::Ends,
            "contains" => Self::Contains,
            "notcontains" => Self::NotContains,
            "regex" => Self::Regex,
            _ => return None,
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::In => "in",
            Self::NotIn => "notin",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Starts => "starts",
            Self::Ends => "ends",
            Self::Contains => "contains",
            Self::NotContains => "notcontains",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_wire_shape() {
        let f: Filter = serde_json::from_value(json!({
            "conditions": [
                {"variable": "AGE", "operator": "gt", "value": 80},
                {"variable": "SEX", "operator": "eq", "value": "M"}
            ],
            "connectors": ["and"],
            "options": {"caseInsensitive": true}
        }))
        .unwrap();
        assert_eq!(
            f,
            Filter::new(FilterCondition::new("AGE", "gt", 80))
                .and(FilterCondition::new("SEX", "eq", "M"))
                .case_insensitive(true)
        );
        assert!(f.is_case_insensitive());
    }

    #[test]
    fn operator_spellings() {
        for op in ["eq", "ne", "in", "notin", "lt", "le", "gt", "ge", "starts", "ends", "contains", "notcontains", "regex"] {
            assert_eq!(Operator::parse(op).map(Operator::as_str), Some(op));
        }
        assert_eq!(Operator::parse("between"), None);
    }
}
