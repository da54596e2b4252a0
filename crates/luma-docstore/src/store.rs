//! Document store collaborator

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::path::FieldUpdate;
use crate::{Record, StoreError};

/// Stream of documents in store-native order
pub type DocumentStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Record,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Record) -> Self {
        Self { id: id.into(), fields }
    }
}

/// Minimal surface of a schemaless document database: documents are
/// addressed by `collection/id` and can only be filtered by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `StoreError::NotFound` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    /// Iterate a collection, optionally stopping after `limit` documents.
    fn documents<'a>(&'a self, collection: &'a str, limit: Option<usize>) -> DocumentStream<'a>;

    /// Create or overwrite a whole document.
    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), StoreError>;

    /// Apply field-level updates to an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Delete whatever lives at a raw slash-separated path.
    async fn delete_path(&self, path: &str) -> Result<(), StoreError>;

    async fn collections(&self) -> Result<Vec<String>, StoreError>;
}

/// Render a key value as a document id.
pub fn document_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
