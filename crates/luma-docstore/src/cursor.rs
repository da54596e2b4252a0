//! Sequential bind-parameter cursor

use serde_json::Value;

use crate::{DocStoreError, Result};

/// Single-pass reader over a flat positional parameter list.
///
/// Every `?` placeholder consumes exactly one value, in left-to-right order
/// of appearance within the statement.
#[derive(Debug)]
pub struct ParamCursor<'a> {
    params: &'a [Value],
    position: usize,
}

impl<'a> ParamCursor<'a> {
    pub fn new(params: &'a [Value]) -> Self {
        Self { params, position: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.position < self.params.len()
    }

    /// Take the next parameter, failing once the list is exhausted.
    pub fn next_value(&mut self) -> Result<Value> {
        let value = self
            .params
            .get(self.position)
            .cloned()
            .ok_or(DocStoreError::ExhaustedCursor)?;
        self.position += 1;
        Ok(value)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.params.len() - self.position
    }
}
