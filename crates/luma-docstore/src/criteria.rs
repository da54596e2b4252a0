//! WHERE clause → single-field predicate
//!
//! The document store filters on one field only, by equality or membership.
//! Anything richer is reported as [`DocStoreError::UnsupportedCriteria`].

use serde_json::Value;

use crate::cursor::ParamCursor;
use crate::statement::{Criterion, Operand, Operator};
use crate::{DocStoreError, Result};

/// Normalized single-field constraint
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Predicate {
    /// No filter, read the whole collection
    #[default]
    Empty,
    Eq { field: String, value: Value },
    In { field: String, values: Vec<Value> },
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        matches!(self, Predicate::Empty)
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::Empty => None,
            Predicate::Eq { field, .. } | Predicate::In { field, .. } => Some(field),
        }
    }

    /// Number of distinct fields constrained (0 or 1).
    pub fn len(&self) -> usize {
        usize::from(!self.is_empty())
    }

    /// Values bound to `field`, a scalar yields a single-element list.
    pub fn values_for(&self, field: &str) -> Option<Vec<Value>> {
        match self {
            Predicate::Eq { field: f, value } if f == field => Some(vec![value.clone()]),
            Predicate::In { field: f, values } if f == field => Some(values.clone()),
            _ => None,
        }
    }

    /// Field/value pairs as they would be written into a record.
    pub fn into_fields(self) -> Vec<(String, Value)> {
        match self {
            Predicate::Empty => vec![],
            Predicate::Eq { field, value } => vec![(field, value)],
            Predicate::In { field, values } => vec![(field, Value::Array(values))],
        }
    }
}

/// Extract a predicate from `criteria`, consuming bind parameters from `params`.
///
/// Scalar vs list is decided by the number of placeholders in the value slot,
/// not by the operator: `id = ?` binds a scalar, `id IN (?, ?)` and even
/// `id = (?, ?)` bind a list, `id IN (?)` binds a scalar.
pub fn extract(criteria: &[Criterion], params: &mut ParamCursor<'_>) -> Result<Predicate> {
    let criterion = match criteria {
        [] => return Ok(Predicate::Empty),
        [single] => single,
        [first, rest @ ..] => {
            let field = column_of(first);
            let distinct = rest.iter().any(|c| column_of(c) != field);
            let reason = if distinct {
                "criteria on more than one field"
            } else {
                "criteria on one key is supported"
            };
            return Err(DocStoreError::UnsupportedCriteria(format!(
                "{}: {}",
                reason,
                criteria.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
            )));
        }
    };

    if !matches!(criterion.operator, Operator::Eq | Operator::In) {
        return Err(DocStoreError::UnsupportedCriteria(format!(
            "unsupported operator: {}",
            criterion.operator
        )));
    }

    let (field, expr) = match (&criterion.left, &criterion.right) {
        (Operand::Column(name), value) => (name.clone(), value),
        (value, Operand::Column(name)) => (name.clone(), value),
        _ => {
            return Err(DocStoreError::UnsupportedCriteria(format!(
                "no column operand in {}",
                criterion
            )))
        }
    };

    let predicate = match expr.placeholder_count() {
        0 => match expr {
            Operand::List(items) => Predicate::In {
                field,
                values: items.iter().map(constant_value).collect(),
            },
            other => Predicate::Eq { field, value: constant_value(other) },
        },
        1 => Predicate::Eq { field, value: bind(criterion, params)? },
        n => {
            let mut values = Vec::with_capacity(n);
            for _ in 0..n {
                values.push(bind(criterion, params)?);
            }
            Predicate::In { field, values }
        }
    };
    Ok(predicate)
}

fn column_of(criterion: &Criterion) -> Option<&str> {
    criterion.left.as_column().or_else(|| criterion.right.as_column())
}

fn bind(criterion: &Criterion, params: &mut ParamCursor<'_>) -> Result<Value> {
    if !params.has_next() {
        return Err(DocStoreError::MissingBindParameter(criterion.to_string()));
    }
    params.next_value()
}

/// Constant written directly in the value slot, surrounding quotes removed.
fn constant_value(operand: &Operand) -> Value {
    match operand {
        Operand::List(items) => Value::Array(items.iter().map(constant_value).collect()),
        other => Value::String(strip_quotes(&other.to_string()).to_string()),
    }
}

pub(crate) fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches(|c| c == '\'' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StatementParser;
    use serde_json::json;

    fn predicate(sql: &str, params: &[Value]) -> Result<Predicate> {
        let stmt = StatementParser::parse(sql).unwrap();
        let mut cursor = ParamCursor::new(params);
        extract(stmt.criteria(), &mut cursor)
    }

    #[test]
    fn test_no_criteria_is_empty() {
        let p = predicate("SELECT id FROM users", &[]).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.len(), 0);
    }

    #[test]
    fn test_single_placeholder_binds_scalar() {
        let p = predicate("SELECT id FROM users WHERE id = ?", &[json!(2)]).unwrap();
        assert_eq!(p, Predicate::Eq { field: "id".to_string(), value: json!(2) });
    }

    #[test]
    fn test_in_with_single_placeholder_is_scalar() {
        let p = predicate("SELECT id FROM users WHERE id IN (?)", &[json!(4)]).unwrap();
        assert_eq!(p, Predicate::Eq { field: "id".to_string(), value: json!(4) });
    }

    #[test]
    fn test_multiple_placeholders_bind_list() {
        let p = predicate("SELECT id FROM users WHERE id IN(?, ?)", &[json!(1), json!(2)]).unwrap();
        assert_eq!(p, Predicate::In { field: "id".to_string(), values: vec![json!(1), json!(2)] });
    }

    #[test]
    fn test_equality_with_list_still_binds_list() {
        let p = predicate("SELECT id FROM users WHERE id = (?, ?)", &[json!("a"), json!("b")]).unwrap();
        assert_eq!(p.values_for("id"), Some(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn test_literal_constants_are_unquoted() {
        let p = predicate("SELECT id FROM users WHERE id = 2", &[]).unwrap();
        assert_eq!(p, Predicate::Eq { field: "id".to_string(), value: json!("2") });

        let p = predicate("SELECT id FROM users WHERE id = '2'", &[]).unwrap();
        assert_eq!(p, Predicate::Eq { field: "id".to_string(), value: json!("2") });

        let p = predicate("SELECT id FROM users WHERE id IN ('a', 'b')", &[]).unwrap();
        assert_eq!(p.values_for("id"), Some(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn test_column_on_right_hand_side() {
        let p = predicate("SELECT id FROM users WHERE ? = id", &[json!(9)]).unwrap();
        assert_eq!(p.field(), Some("id"));
        assert_eq!(p.values_for("id"), Some(vec![json!(9)]));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = predicate("SELECT id FROM users WHERE id != 0", &[json!(0), json!(4)]).unwrap_err();
        assert!(matches!(err, DocStoreError::UnsupportedCriteria(_)));
        assert!(err.to_string().contains("!="));
    }

    #[test]
    fn test_multiple_fields_rejected() {
        let err = predicate(
            "SELECT id FROM users WHERE id = ? AND name = ?",
            &[json!(1), json!("x")],
        )
        .unwrap_err();
        match err {
            DocStoreError::UnsupportedCriteria(msg) => assert!(msg.contains("more than one field")),
            other => panic!("Expected unsupported criteria, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_bind_parameter_reports_term() {
        let err = predicate("SELECT id FROM users WHERE id IN (?, ?)", &[json!(1)]).unwrap_err();
        match err {
            DocStoreError::MissingBindParameter(term) => assert_eq!(term, "id IN (?, ?)"),
            other => panic!("Expected missing bind param, got {:?}", other),
        }
    }

    #[test]
    fn test_into_fields() {
        let p = Predicate::In { field: "id".to_string(), values: vec![json!(1), json!(2)] };
        assert_eq!(p.into_fields(), vec![("id".to_string(), json!([1, 2]))]);
    }
}
