//! In-memory document store
//!
//! Reference [`DocumentStore`] backed by a `DashMap` of collections. Documents
//! inside a collection are kept ordered by id, which is the order scans
//! return them in. A store built with [`MemoryStore::with_journal`] records
//! every call so callers can see exactly which operations a statement turned
//! into.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;

use crate::path::FieldUpdate;
use crate::store::{Document, DocumentStore, DocumentStream};
use crate::{Record, StoreError};

/// Operation as seen by the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Get { collection: String, id: String },
    Scan { collection: String, limit: Option<usize> },
    Set { collection: String, id: String },
    Update { collection: String, id: String, paths: Vec<String> },
    Delete { collection: String, id: String },
    DeletePath { path: String },
    Collections,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Record>>,
    journal: Option<Mutex<Vec<StoreOp>>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that keeps a journal of every operation it serves.
    pub fn with_journal() -> Self {
        Self {
            journal: Some(Mutex::new(Vec::new())),
            ..Self::default()
        }
    }

    /// Seed a document without going through the journal.
    pub fn insert_document(&self, collection: &str, id: &str, fields: Record) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Record> {
        self.collections.get(collection).and_then(|c| c.get(id).cloned())
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    /// Make every operation addressing `id` fail with `StoreError::Unavailable`.
    pub fn fail_on(&self, id: &str) {
        self.failing.lock().insert(id.to_string());
    }

    /// Recorded operations, empty unless built with [`MemoryStore::with_journal`].
    pub fn journal(&self) -> Vec<StoreOp> {
        self.journal
            .as_ref()
            .map(|journal| journal.lock().clone())
            .unwrap_or_default()
    }

    pub fn clear_journal(&self) {
        if let Some(journal) = &self.journal {
            journal.lock().clear();
        }
    }

    fn record(&self, op: StoreOp) {
        if let Some(journal) = &self.journal {
            journal.lock().push(op);
        }
    }

    /// First document of `collection` whose id sorts after `after`.
    fn next_document(&self, collection: &str, after: Option<&str>) -> Option<(String, Record)> {
        let docs = self.collections.get(collection)?;
        let mut range = match after {
            Some(id) => docs.range::<str, _>((Bound::Excluded(id), Bound::Unbounded)),
            None => docs.range::<str, _>(..),
        };
        let next = range.next().map(|(id, fields)| (id.clone(), fields.clone()));
        next
    }

    fn check(&self, id: &str) -> Result<(), StoreError> {
        if self.failing.lock().contains(id) {
            return Err(StoreError::Unavailable(format!("injected failure for {}", id)));
        }
        Ok(())
    }
}

fn apply_update(record: &mut Record, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            record.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = record
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Record::new()));
            if !entry.is_object() {
                *entry = Value::Object(Record::new());
            }
            if let Value::Object(child) = entry {
                apply_update(child, rest, value);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.record(StoreOp::Get { collection: collection.to_string(), id: id.to_string() });
        self.check(id)?;
        self.document(collection, id)
            .map(|fields| Document::new(id, fields))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", collection, id)))
    }

    fn documents<'a>(&'a self, collection: &'a str, limit: Option<usize>) -> DocumentStream<'a> {
        self.record(StoreOp::Scan { collection: collection.to_string(), limit });
        // one document is copied per poll, resuming after the last id served
        let start: (Option<String>, usize) = (None, limit.unwrap_or(usize::MAX));
        futures::stream::unfold(start, move |(after, remaining)| async move {
            if remaining == 0 {
                return None;
            }
            let (id, fields) = self.next_document(collection, after.as_deref())?;
            let item = self.check(&id).map(|()| Document::new(id.clone(), fields));
            Some((item, (Some(id), remaining - 1)))
        })
        .boxed()
    }

    async fn set(&self, collection: &str, id: &str, fields: Record) -> Result<(), StoreError> {
        self.record(StoreOp::Set { collection: collection.to_string(), id: id.to_string() });
        self.check(id)?;
        self.insert_document(collection, id, fields);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), StoreError> {
        self.record(StoreOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            paths: updates.iter().map(|u| u.path.to_string()).collect(),
        });
        self.check(id)?;
        let not_found = || StoreError::NotFound(format!("{}/{}", collection, id));
        let mut docs = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let record = docs.get_mut(id).ok_or_else(not_found)?;
        for update in updates {
            apply_update(record, update.path.segments(), update.value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.record(StoreOp::Delete { collection: collection.to_string(), id: id.to_string() });
        self.check(id)?;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn delete_path(&self, path: &str) -> Result<(), StoreError> {
        self.record(StoreOp::DeletePath { path: path.to_string() });
        self.check(path)?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        let normalized = segments.join("/");
        let prefix = format!("{}/", normalized);

        if segments.len() % 2 == 0 {
            // collection/id pairs address a document
            if let Some((id, parent)) = segments.split_last() {
                if let Some(mut docs) = self.collections.get_mut(&parent.join("/")) {
                    docs.remove(*id);
                }
            }
            self.collections.retain(|name, _| !name.starts_with(&prefix));
        } else {
            self.collections
                .retain(|name, _| name != &normalized && !name.starts_with(&prefix));
        }
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<String>, StoreError> {
        self.record(StoreOp::Collections);
        let mut names: Vec<String> = self
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| !name.contains('/'))
            .collect();
        names.sort();
        Ok(names)
    }
}
