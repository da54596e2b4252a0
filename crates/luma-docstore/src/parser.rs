//! DML/query statement parser
//!
//! SQL text is parsed with `sqlparser`'s generic dialect, where `?` is a
//! positional placeholder, and the AST is narrowed to what the document store
//! can serve: single-row `INSERT ... VALUES`, `UPDATE ... SET`, `DELETE FROM`
//! and plain `SELECT` from one collection. WHERE clauses are flattened into a
//! list of simple comparisons joined by AND/OR.

use std::ops::ControlFlow;

use sqlparser::ast::{
    self, visit_relations, BinaryOperator, Expr as SqlExpr, Ident, ObjectName, SelectItem, SetExpr,
    UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::statement::{
    ColumnValue, Criterion, DeleteStatement, InsertStatement, Operand, Operator, SelectColumn,
    SelectStatement, Statement, UpdateStatement,
};
use crate::{DocStoreError, Result};

pub struct StatementParser;

impl StatementParser {
    /// Parse raw SQL text; syntax errors carry the offending text.
    pub fn parse(sql: &str) -> Result<Statement> {
        let dialect = GenericDialect {};
        let mut ast = Parser::parse_sql(&dialect, sql).map_err(|e| failure(sql, e.to_string()))?;
        if ast.len() != 1 {
            return Err(failure(sql, format!("expected one statement, found {}", ast.len())));
        }
        translate(sql, ast.remove(0))
    }
}

fn failure(sql: &str, reason: impl Into<String>) -> DocStoreError {
    DocStoreError::ParseFailure {
        sql: sql.to_string(),
        reason: reason.into(),
    }
}

fn translate(sql: &str, statement: ast::Statement) -> Result<Statement> {
    let table = target_collection(&statement);
    let require_table = || table.clone().ok_or_else(|| failure(sql, "missing target collection"));

    match statement {
        ast::Statement::Insert { columns, source, .. } => {
            let query = source.ok_or_else(|| failure(sql, "INSERT without VALUES"))?;
            let row = match *query.body {
                SetExpr::Values(values) => {
                    let mut rows = values.rows.into_iter();
                    match (rows.next(), rows.next()) {
                        (Some(row), None) => row,
                        _ => return Err(failure(sql, "exactly one VALUES row is supported")),
                    }
                }
                _ => return Err(failure(sql, "INSERT source must be VALUES")),
            };
            if columns.len() != row.len() {
                return Err(failure(sql, "column and value counts differ"));
            }
            let values = columns
                .into_iter()
                .zip(row)
                .map(|(column, expr)| {
                    Ok(ColumnValue {
                        name: column.value,
                        value: operand(expr)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Statement::Insert(InsertStatement { table: require_table()?, values }))
        }
        ast::Statement::Update { assignments, selection, .. } => {
            let assignments = assignments
                .into_iter()
                .map(|assignment| {
                    Ok(ColumnValue {
                        name: dotted(&assignment.id),
                        value: operand(assignment.value)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Statement::Update(UpdateStatement {
                table: require_table()?,
                assignments,
                criteria: where_clause(selection)?,
            }))
        }
        ast::Statement::Delete { selection, .. } => Ok(Statement::Delete(DeleteStatement {
            table: require_table()?,
            criteria: where_clause(selection)?,
        })),
        ast::Statement::Query(query) => match *query.body {
            SetExpr::Select(select) => {
                let columns = select
                    .projection
                    .into_iter()
                    .map(select_column)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Statement::Select(SelectStatement {
                    table: require_table()?,
                    columns,
                    criteria: where_clause(select.selection)?,
                }))
            }
            other => Err(DocStoreError::UnsupportedStatement(other.to_string())),
        },
        other => Err(DocStoreError::UnsupportedStatement(other.to_string())),
    }
}

/// First relation the statement touches: the INSERT/UPDATE/DELETE target or
/// the first FROM table of a query.
fn target_collection(statement: &ast::Statement) -> Option<String> {
    let mut found = None;
    let _ = visit_relations(statement, |relation: &ObjectName| {
        found = Some(dotted(&relation.0));
        ControlFlow::Break(())
    });
    found
}

fn dotted(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn select_column(item: SelectItem) -> Result<SelectColumn> {
    match item {
        SelectItem::UnnamedExpr(expr) => Ok(SelectColumn::new(column_name(expr)?)),
        SelectItem::ExprWithAlias { expr, alias } => {
            Ok(SelectColumn::aliased(column_name(expr)?, alias.value))
        }
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
            Ok(SelectColumn::new(SelectColumn::WILDCARD))
        }
    }
}

fn column_name(expr: SqlExpr) -> Result<String> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(ident.value),
        SqlExpr::CompoundIdentifier(idents) => Ok(dotted(&idents)),
        other => Err(DocStoreError::UnsupportedStatement(format!(
            "only plain columns can be selected: {}",
            other
        ))),
    }
}

fn where_clause(selection: Option<SqlExpr>) -> Result<Vec<Criterion>> {
    let mut criteria = Vec::new();
    if let Some(expr) = selection {
        flatten(expr, &mut criteria)?;
    }
    Ok(criteria)
}

fn flatten(expr: SqlExpr, criteria: &mut Vec<Criterion>) -> Result<()> {
    match expr {
        SqlExpr::BinaryOp {
            left,
            op: BinaryOperator::And | BinaryOperator::Or,
            right,
        } => {
            flatten(*left, criteria)?;
            flatten(*right, criteria)
        }
        SqlExpr::Nested(inner) => flatten(*inner, criteria),
        other => {
            criteria.push(criterion(other)?);
            Ok(())
        }
    }
}

fn criterion(expr: SqlExpr) -> Result<Criterion> {
    match expr {
        SqlExpr::BinaryOp { left, op, right } => {
            let operator = match op {
                BinaryOperator::Eq => Operator::Eq,
                BinaryOperator::NotEq => Operator::NotEq,
                BinaryOperator::Lt => Operator::Lt,
                BinaryOperator::LtEq => Operator::LtEq,
                BinaryOperator::Gt => Operator::Gt,
                BinaryOperator::GtEq => Operator::GtEq,
                other => {
                    return Err(DocStoreError::UnsupportedCriteria(format!(
                        "unsupported operator: {}",
                        other
                    )))
                }
            };
            Ok(Criterion {
                left: operand(*left)?,
                operator,
                right: operand(*right)?,
            })
        }
        SqlExpr::InList { expr, list, negated } => Ok(Criterion {
            left: operand(*expr)?,
            operator: if negated { Operator::NotIn } else { Operator::In },
            right: operand_list(list)?,
        }),
        SqlExpr::Like {
            negated: false,
            expr,
            pattern,
            ..
        } => Ok(Criterion {
            left: operand(*expr)?,
            operator: Operator::Like,
            right: operand(*pattern)?,
        }),
        other => Err(DocStoreError::UnsupportedCriteria(other.to_string())),
    }
}

fn operand_list(items: Vec<SqlExpr>) -> Result<Operand> {
    items
        .into_iter()
        .map(operand)
        .collect::<Result<Vec<_>>>()
        .map(Operand::List)
}

fn operand(expr: SqlExpr) -> Result<Operand> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(Operand::Column(ident.value)),
        SqlExpr::CompoundIdentifier(idents) => Ok(Operand::Column(dotted(&idents))),
        SqlExpr::Value(SqlValue::Placeholder(_)) => Ok(Operand::Placeholder),
        // rendered back as SQL text: quotes kept, embedded quotes doubled
        SqlExpr::Value(value) => Ok(Operand::Literal(value.to_string())),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match *expr {
            SqlExpr::Value(SqlValue::Number(n, _)) => Ok(Operand::Literal(format!("-{}", n))),
            other => Err(DocStoreError::UnsupportedCriteria(format!("-{}", other))),
        },
        SqlExpr::Tuple(items) => operand_list(items),
        SqlExpr::Nested(inner) => operand(*inner),
        other => Err(DocStoreError::UnsupportedCriteria(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Operand {
        Operand::Column(name.to_string())
    }

    #[test]
    fn test_parse_insert() {
        let stmt = StatementParser::parse("INSERT INTO users(id, name) VALUES(?, ?)").unwrap();
        match stmt {
            Statement::Insert(insert) => {
                assert_eq!(insert.table, "users");
                assert_eq!(insert.values.len(), 2);
                assert_eq!(insert.values[0].name, "id");
                assert_eq!(insert.values[1].value, Operand::Placeholder);
            }
            other => panic!("Expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_insert_with_literals() {
        let stmt = StatementParser::parse(
            "insert into users (id, name, active, score) values (7, 'O''Brien', TRUE, -2);",
        )
        .unwrap();
        let Statement::Insert(insert) = stmt else { panic!("Expected insert") };
        assert_eq!(insert.values[0].value, Operand::Literal("7".to_string()));
        assert_eq!(insert.values[1].value, Operand::Literal("'O''Brien'".to_string()));
        assert_eq!(insert.values[2].value, Operand::Literal("true".to_string()));
        assert_eq!(insert.values[3].value, Operand::Literal("-2".to_string()));
    }

    #[test]
    fn test_parse_insert_count_mismatch() {
        let err = StatementParser::parse("INSERT INTO users(id, name) VALUES(?)").unwrap_err();
        match err {
            DocStoreError::ParseFailure { sql, reason } => {
                assert!(sql.contains("INSERT INTO users"));
                assert_eq!(reason, "column and value counts differ");
            }
            other => panic!("Expected parse failure, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_insert_multiple_rows() {
        let err = StatementParser::parse("INSERT INTO users(id) VALUES(?), (?)").unwrap_err();
        assert!(matches!(err, DocStoreError::ParseFailure { .. }));
    }

    #[test]
    fn test_parse_select_with_in_list() {
        let stmt = StatementParser::parse("SELECT id, name FROM users WHERE id IN(?, ?)").unwrap();
        let Statement::Select(select) = stmt else { panic!("Expected select") };
        assert_eq!(select.table, "users");
        assert_eq!(select.columns, vec![SelectColumn::new("id"), SelectColumn::new("name")]);
        assert_eq!(select.criteria.len(), 1);
        assert_eq!(select.criteria[0].left, column("id"));
        assert_eq!(select.criteria[0].operator, Operator::In);
        assert_eq!(
            select.criteria[0].right,
            Operand::List(vec![Operand::Placeholder, Operand::Placeholder])
        );
    }

    #[test]
    fn test_parse_equality_with_tuple() {
        let stmt = StatementParser::parse("SELECT id FROM users WHERE id = (?, ?)").unwrap();
        assert_eq!(
            stmt.criteria()[0].right,
            Operand::List(vec![Operand::Placeholder, Operand::Placeholder])
        );
    }

    #[test]
    fn test_parse_select_aliases_and_wildcard() {
        let stmt = StatementParser::parse("SELECT id AS user_id, name label, * FROM users").unwrap();
        let Statement::Select(select) = stmt else { panic!("Expected select") };
        assert_eq!(select.columns[0], SelectColumn::aliased("id", "user_id"));
        assert_eq!(select.columns[1], SelectColumn::aliased("name", "label"));
        assert!(select.columns[2].is_wildcard());
        assert!(select.criteria.is_empty());
    }

    #[test]
    fn test_parse_select_operators() {
        let stmt = StatementParser::parse("SELECT id FROM users WHERE id != 0").unwrap();
        assert_eq!(stmt.criteria()[0].operator, Operator::NotEq);

        let stmt = StatementParser::parse("SELECT id FROM users WHERE id NOT IN (1, 2)").unwrap();
        assert_eq!(stmt.criteria()[0].operator, Operator::NotIn);

        let stmt = StatementParser::parse("SELECT id FROM users WHERE id = ? AND name = ?").unwrap();
        assert_eq!(stmt.criteria().len(), 2);
        assert_eq!(stmt.placeholder_count(), 2);

        let stmt = StatementParser::parse("SELECT id FROM users WHERE (id = ? OR id = ?) AND name = ?")
            .unwrap();
        assert_eq!(stmt.criteria().len(), 3);
    }

    #[test]
    fn test_parse_unsupported_criteria_shape() {
        let err = StatementParser::parse("SELECT id FROM users WHERE id IS NULL").unwrap_err();
        assert!(matches!(err, DocStoreError::UnsupportedCriteria(_)));
    }

    #[test]
    fn test_parse_update_and_delete() {
        let stmt =
            StatementParser::parse("UPDATE users SET name = ?, address.city = 'Lagos' WHERE id = ?")
                .unwrap();
        let Statement::Update(update) = stmt else { panic!("Expected update") };
        assert_eq!(update.table, "users");
        assert_eq!(update.assignments[1].name, "address.city");
        assert_eq!(update.assignments[1].value, Operand::Literal("'Lagos'".to_string()));
        assert_eq!(update.criteria[0].right, Operand::Placeholder);

        let stmt = StatementParser::parse("DELETE FROM \"users/5\"").unwrap();
        let Statement::Delete(delete) = stmt else { panic!("Expected delete") };
        assert_eq!(delete.table, "users/5");
        assert!(delete.criteria.is_empty());
    }

    #[test]
    fn test_parse_placeholder_on_left() {
        let stmt = StatementParser::parse("DELETE FROM users WHERE ? = id").unwrap();
        assert_eq!(stmt.table(), "users");
        assert_eq!(stmt.criteria()[0].left, Operand::Placeholder);
        assert_eq!(stmt.criteria()[0].right, column("id"));
    }

    #[test]
    fn test_parse_failure_is_wrapped() {
        let err = StatementParser::parse("UPSERT users").unwrap_err();
        assert!(matches!(err, DocStoreError::ParseFailure { .. }));
        assert!(err.to_string().contains("UPSERT users"));

        assert!(StatementParser::parse("SELECT id FROM users WHERE").is_err());
        assert!(matches!(
            StatementParser::parse("SELECT 1; SELECT 2"),
            Err(DocStoreError::ParseFailure { .. })
        ));
    }

    #[test]
    fn test_unsupported_statement_kind() {
        let err = StatementParser::parse("DROP TABLE users").unwrap_err();
        assert!(matches!(err, DocStoreError::UnsupportedStatement(_)));
    }
}
