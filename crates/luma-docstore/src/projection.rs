//! Record building for writes and alias projection for reads

use serde_json::{Number, Value};

use crate::cursor::ParamCursor;
use crate::statement::{ColumnValue, Operand, SelectColumn};
use crate::{DocStoreError, Record, Result};

/// Build `{column -> value}` for INSERT/UPDATE, one parameter per placeholder
/// in declared column order.
pub fn column_value_map(columns: &[ColumnValue], params: &mut ParamCursor<'_>) -> Result<Record> {
    let mut record = Record::new();
    for column in columns {
        let value = operand_value(&column.name, &column.value, params)?;
        record.insert(column.name.clone(), value);
    }
    Ok(record)
}

fn operand_value(column: &str, operand: &Operand, params: &mut ParamCursor<'_>) -> Result<Value> {
    match operand {
        Operand::Placeholder => {
            if !params.has_next() {
                return Err(DocStoreError::MissingBindParameter(format!("{} = ?", column)));
            }
            params.next_value()
        }
        Operand::Literal(raw) => Ok(literal_value(raw)),
        Operand::Column(name) => Ok(Value::String(name.clone())),
        Operand::List(items) => items
            .iter()
            .map(|item| operand_value(column, item, params))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
    }
}

/// Type an inline SQL constant.
pub fn literal_value(raw: &str) -> Value {
    if let Some(quote) = raw.chars().next().filter(|c| *c == '\'' || *c == '"') {
        let inner = raw
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
            .unwrap_or(raw);
        return Value::String(inner.replace(&format!("{0}{0}", quote), &quote.to_string()));
    }
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Rename aliased fields in place and return the output column names in
/// declared order. A wildcard expands to every field of the record.
pub fn apply_aliases(columns: &[SelectColumn], record: &mut Record) -> Vec<String> {
    let mut names = Vec::with_capacity(columns.len());
    for column in columns {
        if column.is_wildcard() {
            names.extend(record.keys().cloned());
            continue;
        }
        if let Some(alias) = &column.alias {
            if let Some(value) = record.remove(&column.name) {
                record.insert(alias.clone(), value);
            }
        }
        names.push(column.output_name().to_string());
    }
    names
}
