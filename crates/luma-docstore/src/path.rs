//! Nested field paths for partial document updates

use std::fmt;

use serde_json::Value;

/// Column name split into nested field segments: `address.city` addresses
/// `city` inside the `address` map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub const SEPARATOR: char = '.';
    /// Separator used by the store's own path syntax
    pub const STORE_SEPARATOR: char = '/';

    pub fn parse(column: &str) -> Self {
        Self(column.split(Self::SEPARATOR).map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_nested(&self) -> bool {
        self.0.len() > 1
    }

    /// Top-level field the path starts from
    pub fn root(&self) -> &str {
        &self.0[0]
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", Self::STORE_SEPARATOR)?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub value: Value,
}

impl FieldUpdate {
    pub fn new(column: &str, value: Value) -> Self {
        Self { path: FieldPath::parse(column), value }
    }
}
