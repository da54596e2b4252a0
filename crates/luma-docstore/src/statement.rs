//! Parsed statement model
//!
//! Statements are produced by [`crate::parser::StatementParser`] and consumed
//! by the [`crate::manager::Manager`] dispatcher.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    Select(SelectStatement),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::Select(_) => "SELECT",
        }
    }

    /// Target collection
    pub fn table(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
            Statement::Select(s) => &s.table,
        }
    }

    pub fn criteria(&self) -> &[Criterion] {
        match self {
            Statement::Insert(_) => &[],
            Statement::Update(s) => &s.criteria,
            Statement::Delete(s) => &s.criteria,
            Statement::Select(s) => &s.criteria,
        }
    }

    /// Number of `?` placeholders across the whole statement.
    pub fn placeholder_count(&self) -> usize {
        let values = match self {
            Statement::Insert(s) => s.values.iter().map(|c| c.value.placeholder_count()).sum(),
            Statement::Update(s) => s.assignments.iter().map(|c| c.value.placeholder_count()).sum(),
            Statement::Delete(_) | Statement::Select(_) => 0,
        };
        let criteria: usize = self
            .criteria()
            .iter()
            .map(|c| c.left.placeholder_count() + c.right.placeholder_count())
            .sum();
        values + criteria
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub values: Vec<ColumnValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<ColumnValue>,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table: String,
    pub columns: Vec<SelectColumn>,
    pub criteria: Vec<Criterion>,
}

/// Column paired with the value slot it receives on INSERT/UPDATE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValue {
    pub name: String,
    pub value: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub name: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    pub const WILDCARD: &'static str = "*";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), alias: None }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { name: name.into(), alias: Some(alias.into()) }
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == Self::WILDCARD
    }

    /// Name the column is reported under
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Simple binary comparison from a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub left: Operand,
    pub operator: Operator,
    pub right: Operand,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Like,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Placeholder,
    /// Constant exactly as written, quotes included
    Literal(String),
    List(Vec<Operand>),
}

impl Operand {
    pub fn placeholder_count(&self) -> usize {
        match self {
            Operand::Placeholder => 1,
            Operand::List(items) => items.iter().map(Operand::placeholder_count).sum(),
            Operand::Column(_) | Operand::Literal(_) => 0,
        }
    }

    pub fn as_column(&self) -> Option<&str> {
        match self {
            Operand::Column(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => f.write_str(name),
            Operand::Placeholder => f.write_str("?"),
            Operand::Literal(raw) => f.write_str(raw),
            Operand::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}
