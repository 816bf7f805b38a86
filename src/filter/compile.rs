use super::{Connector, Filter, FilterCondition, Operator};
use crate::error::DatasetError;
use crate::metadata::{DatasetMetadata, ValueClass};
use anyhow::Result;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::borrow::Cow;

/// A value normalized into its column's comparison class.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Scalar<'a> {
    Null,
    Text(Cow<'a, str>),
    Number(f64),
    Bool(bool),
}

impl Scalar<'_> {
    pub(super) fn into_owned(self) -> Scalar<'static> {
        match self {
            Scalar::Null => Scalar::Null,
            Scalar::Text(s) => Scalar::Text(Cow::Owned(s.into_owned())),
            Scalar::Number(n) => Scalar::Number(n),
            Scalar::Bool(b) => Scalar::Bool(b),
        }
    }
}

/// Normalize `value` for comparison within `class`. Text is lowercased when
/// `case_insensitive` is set; numeric strings (decimal columns) become numbers.
pub(super) fn coerce(value: &Value, class: ValueClass, case_insensitive: bool) -> Scalar<'_> {
    match (value, class) {
        (Value::Null, _) => Scalar::Null,
        (Value::String(s), ValueClass::Text) if case_insensitive => {
            Scalar::Text(Cow::Owned(s.to_lowercase()))
        }
        (Value::String(s), ValueClass::Number) => match s.trim().parse::<f64>() {
            Ok(n) => Scalar::Number(n),
            Err(_) => Scalar::Text(Cow::Borrowed(s)),
        },
        (Value::String(s), _) => Scalar::Text(Cow::Borrowed(s)),
        (Value::Number(n), ValueClass::Text) => Scalar::Text(Cow::Owned(n.to_string())),
        (Value::Number(n), _) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
        (Value::Bool(b), ValueClass::Text) => Scalar::Text(Cow::Owned(b.to_string())),
        (Value::Bool(b), _) => Scalar::Bool(*b),
        (other, _) => Scalar::Text(Cow::Owned(other.to_string())),
    }
}

#[derive(Debug, Clone)]
pub(super) enum Test {
    Equals { operand: Scalar<'static>, negate: bool },
    Member { set: Vec<Scalar<'static>>, negate: bool },
    Order { op: Operator, operand: Scalar<'static> },
    Text { op: Operator, needle: String },
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub(super) struct Condition {
    pub(super) index: usize,
    pub(super) class: ValueClass,
    pub(super) test: Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Chain {
    AllAnd,
    AllOr,
    Mixed,
}

/// A [`Filter`] resolved against one dataset's columns.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub(super) conditions: Vec<Condition>,
    pub(super) connectors: Vec<Connector>,
    pub(super) chain: Chain,
    pub(super) case_insensitive: bool,
}

impl CompiledFilter {
    /// Resolve every condition against `metadata`.
    ///
    /// # Errors
    /// [`DatasetError::ConnectorCount`], [`DatasetError::UnknownColumn`],
    /// [`DatasetError::UnsupportedKind`], [`DatasetError::UnknownOperator`] or
    /// [`DatasetError::InvalidOperand`], for the first offending condition.
    pub fn compile(filter: &Filter, metadata: &DatasetMetadata) -> Result<Self> {
        let n = filter.conditions.len();
        if n == 0 || filter.connectors.len() + 1 != n {
            return Err(DatasetError::ConnectorCount {
                conditions: n,
                connectors: filter.connectors.len(),
            }
            .into());
        }
        let case_insensitive = filter.is_case_insensitive();
        let conditions = filter
            .conditions
            .iter()
            .map(|c| compile_condition(c, metadata, case_insensitive))
            .collect::<Result<Vec<_>>>()?;

        let chain = if filter.connectors.iter().all(|c| *c == Connector::And) {
            Chain::AllAnd
        } else if filter.connectors.iter().all(|c| *c == Connector::Or) {
            Chain::AllOr
        } else {
            Chain::Mixed
        };

        Ok(Self {
            conditions,
            connectors: filter.connectors.clone(),
            chain,
            case_insensitive,
        })
    }

    /// Number of conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Column index each condition reads, in condition order.
    pub fn column_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.conditions.iter().map(|c| c.index)
    }
}

fn compile_condition(
    cond: &FilterCondition,
    metadata: &DatasetMetadata,
    case_insensitive: bool,
) -> Result<Condition> {
    let index = metadata
        .column_index(&cond.variable)
        .ok_or_else(|| DatasetError::UnknownColumn(cond.variable.clone()))?;
    let column = &metadata.columns[index];
    let class = column
        .data_type
        .class()
        .ok_or_else(|| DatasetError::UnsupportedKind {
            variable: column.name.clone(),
            data_type: column.data_type.to_string(),
        })?;

    let unknown = || DatasetError::UnknownOperator {
        variable: cond.variable.clone(),
        operator: cond.operator.clone(),
    };
    let invalid = |reason: String| DatasetError::InvalidOperand {
        variable: cond.variable.clone(),
        operator: cond.operator.clone(),
        reason,
    };
    let op = Operator::parse(&cond.operator).ok_or_else(unknown)?;

    let test = match (op, class) {
        (Operator::Eq | Operator::Ne, _) => Test::Equals {
            operand: coerce(&cond.value, class, case_insensitive).into_owned(),
            negate: op == Operator::Ne,
        },
        (Operator::In | Operator::NotIn, ValueClass::Text | ValueClass::Number) => {
            let Value::Array(items) = &cond.value else {
                return Err(invalid("expected a list of values".into()).into());
            };
            Test::Member {
                set: items
                    .iter()
                    .map(|v| coerce(v, class, case_insensitive).into_owned())
                    .collect(),
                negate: op == Operator::NotIn,
            }
        }
        (Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge, ValueClass::Number) => {
            match coerce(&cond.value, class, false) {
                Scalar::Number(n) => Test::Order {
                    op,
                    operand: Scalar::Number(n),
                },
                _ => return Err(invalid("expected a number".into()).into()),
            }
        }
        (Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge, ValueClass::Text)
            if column.data_type.is_temporal() =>
        {
            let Value::String(s) = &cond.value else {
                return Err(invalid("expected an ISO 8601 string".into()).into());
            };
            Test::Order {
                op,
                operand: Scalar::Text(Cow::Owned(s.clone())),
            }
        }
        (
            Operator::Starts | Operator::Ends | Operator::Contains | Operator::NotContains,
            ValueClass::Text,
        ) => match coerce(&cond.value, class, case_insensitive) {
            Scalar::Text(needle) => Test::Text {
                op,
                needle: needle.into_owned(),
            },
            _ => return Err(invalid("expected text".into()).into()),
        },
        (Operator::Regex, ValueClass::Text) => {
            let Value::String(pattern) = &cond.value else {
                return Err(invalid("expected a pattern string".into()).into());
            };
            let re = RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| invalid(e.to_string()))?;
            Test::Regex(re)
        }
        _ => return Err(unknown().into()),
    };

    Ok(Condition { index, class, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCondition;
    use serde_json::json;

    fn metadata() -> DatasetMetadata {
        serde_json::from_value(json!({
            "datasetJSONCreationDateTime": "2024-01-01T00:00:00",
            "datasetJSONVersion": "1.1.0",
            "records": 0,
            "name": "DM",
            "label": "Demographics",
            "columns": [
                {"itemOID": "IT.SEX", "name": "SEX", "label": "Sex", "dataType": "string"},
                {"itemOID": "IT.AGE", "name": "AGE", "label": "Age", "dataType": "integer"},
                {"itemOID": "IT.FL", "name": "SAFFL", "label": "Safety", "dataType": "boolean"},
                {"itemOID": "IT.GEO", "name": "GEO", "label": "Shape", "dataType": "geometry"}
            ]
        }))
        .unwrap()
    }

    fn compile_err(filter: Filter) -> DatasetError {
        CompiledFilter::compile(&filter, &metadata())
            .unwrap_err()
            .downcast::<DatasetError>()
            .unwrap()
    }

    #[test]
    fn resolves_columns_case_insensitively() -> Result<()> {
        let f = Filter::new(FilterCondition::new("age", "gt", 80))
            .or(FilterCondition::new("Sex", "eq", "M"));
        let compiled = CompiledFilter::compile(&f, &metadata())?;
        assert_eq!(compiled.column_indices().collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(compiled.chain, Chain::AllOr);
        Ok(())
    }

    #[test]
    fn connector_count_must_match() {
        let mut f = Filter::new(FilterCondition::new("AGE", "gt", 80));
        f.connectors.push(Connector::And);
        assert_eq!(
            compile_err(f),
            DatasetError::ConnectorCount {
                conditions: 1,
                connectors: 1
            }
        );
        assert!(matches!(
            compile_err(Filter::default()),
            DatasetError::ConnectorCount { conditions: 0, .. }
        ));
    }

    #[test]
    fn rejects_unknown_columns_operators_and_kinds() {
        assert_eq!(
            compile_err(Filter::new(FilterCondition::new("RACE", "eq", "X"))),
            DatasetError::UnknownColumn("RACE".into())
        );
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("AGE", "between", 1))),
            DatasetError::UnknownOperator { .. }
        ));
        // Text operators are not defined for numbers, ordering not for booleans.
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("AGE", "contains", "1"))),
            DatasetError::UnknownOperator { .. }
        ));
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("SAFFL", "gt", true))),
            DatasetError::UnknownOperator { .. }
        ));
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("GEO", "eq", "x"))),
            DatasetError::UnsupportedKind { .. }
        ));
    }

    #[test]
    fn rejects_malformed_operands() {
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("SEX", "in", "M"))),
            DatasetError::InvalidOperand { .. }
        ));
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("SEX", "regex", "(unclosed"))),
            DatasetError::InvalidOperand { .. }
        ));
        assert!(matches!(
            compile_err(Filter::new(FilterCondition::new("AGE", "lt", "old"))),
            DatasetError::InvalidOperand { .. }
        ));
    }
}
