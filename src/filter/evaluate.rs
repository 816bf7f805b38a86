use super::compile::{Chain, CompiledFilter, Condition, Scalar, Test, coerce};
use super::{Connector, Operator};
use serde_json::Value;

impl CompiledFilter {
    /// Whether `row` (positional values in column order) passes the filter.
    ///
    /// Missing trailing values are treated as null.
    #[must_use]
    pub fn evaluate(&self, row: &[Value]) -> bool {
        let mut result = false;
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                match self.chain {
                    Chain::AllAnd if !result => return false,
                    Chain::AllOr if result => return true,
                    _ => {}
                }
            }
            let value = row.get(cond.index).unwrap_or(&Value::Null);
            let hit = cond.matches(value, self.case_insensitive);
            result = match i.checked_sub(1).map(|c| self.connectors[c]) {
                None => hit,
                Some(Connector::And) => result && hit,
                Some(Connector::Or) => result || hit,
            };
        }
        result
    }
}

impl Condition {
    fn matches(&self, value: &Value, case_insensitive: bool) -> bool {
        let actual = coerce(value, self.class, case_insensitive);
        match &self.test {
            Test::Equals { operand, negate } => (actual == *operand) != *negate,
            Test::Member { set, negate } => set.iter().any(|s| *s == actual) != *negate,
            Test::Order { op, operand } => match (&actual, operand) {
                (Scalar::Number(a), Scalar::Number(b)) => ordered(*op, a.partial_cmp(b)),
                (Scalar::Text(a), Scalar::Text(b)) => ordered(*op, Some((**a).cmp(&**b))),
                _ => false,
            },
            Test::Text { op, needle } => {
                let Scalar::Text(s) = &actual else {
                    return false;
                };
                match op {
                    Operator::Starts => s.starts_with(needle.as_str()),
                    Operator::Ends => s.ends_with(needle.as_str()),
                    Operator::Contains => s.contains(needle.as_str()),
                    Operator::NotContains => !s.contains(needle.as_str()),
                    _ => false,
                }
            }
            Test::Regex(re) => match &actual {
                Scalar::Text(s) => re.is_match(s),
                _ => false,
            },
        }
    }
}

fn ordered(op: Operator, ord: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::{Equal, Greater, Less};
    match (op, ord) {
        (_, None) => false,
        (Operator::Lt, Some(o)) => o == Less,
        (Operator::Le, Some(o)) => o != Greater,
        (Operator::Gt, Some(o)) => o == Greater,
        (Operator::Ge, Some(o)) => o != Less,
        (_, Some(o)) => o == Equal,
    }
}
