//! Store metadata: key names, collections and sampled column types

use std::collections::HashSet;
use std::fmt;

use futures::StreamExt;
use serde_json::Value;
use tracing::debug;

use crate::manager::Manager;
use crate::Result;

/// Documents sampled when inferring columns
pub const MAX_RECORD_COLUMN_SCAN: usize = 20;

/// Coarse type of a document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Null,
    Boolean,
    Int,
    Float,
    String,
    List,
    Map,
}

impl DataType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => DataType::Null,
            Value::Bool(_) => DataType::Boolean,
            Value::Number(n) if n.is_f64() => DataType::Float,
            Value::Number(_) => DataType::Int,
            Value::String(_) => DataType::String,
            Value::Array(_) => DataType::List,
            Value::Object(_) => DataType::Map,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Null => "null",
            DataType::Boolean => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::List => "list",
            DataType::Map => "map",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Dialect;

impl Dialect {
    pub fn key_name(&self, manager: &Manager, collection: &str) -> String {
        manager.key_resolver().resolve(collection).to_string()
    }

    /// Infer columns from the first documents of a collection. The first
    /// value seen for a field decides its type; an empty document ends the
    /// sample early.
    pub async fn columns(&self, manager: &Manager, collection: &str) -> Result<Vec<ColumnInfo>> {
        let store = manager.pool().acquire().await?;
        let mut documents = store.documents(collection, Some(MAX_RECORD_COLUMN_SCAN));
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        let mut sampled = 0;

        while let Some(document) = documents.next().await {
            let document = document?;
            if document.fields.is_empty() {
                break;
            }
            sampled += 1;
            for (name, value) in &document.fields {
                if seen.insert(name.clone()) {
                    columns.push(ColumnInfo {
                        name: name.clone(),
                        data_type: DataType::of(value),
                    });
                }
            }
            if sampled >= MAX_RECORD_COLUMN_SCAN {
                break;
            }
        }
        debug!("inferred {} columns of {} from {} documents", columns.len(), collection, sampled);
        Ok(columns)
    }

    pub async fn drop_collection(&self, manager: &Manager, collection: &str) -> Result<()> {
        let store = manager.pool().acquire().await?;
        store.delete_path(collection).await?;
        Ok(())
    }

    pub async fn collections(&self, manager: &Manager) -> Result<Vec<String>> {
        let store = manager.pool().acquire().await?;
        Ok(store.collections().await?)
    }

    pub fn datastores(&self, manager: &Manager) -> Vec<String> {
        vec![self.current_datastore(manager)]
    }

    pub fn current_datastore(&self, manager: &Manager) -> String {
        manager.config().database_url.clone()
    }

    /// Writes go document by document.
    pub fn can_persist_batch(&self) -> bool {
        false
    }
}
