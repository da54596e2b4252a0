//! Statement execution against a pooled document store
//!
//! [`Manager`] is the entry point: it parses SQL, binds parameters, resolves
//! the key column of the target collection and turns the statement into
//! per-document store calls.
//!
//! | Statement | Store calls |
//! |-----------|-------------|
//! | `INSERT`  | one `set` of the whole record at `collection/key` |
//! | `UPDATE`  | one `update` with a path per assigned column |
//! | `DELETE`  | one `delete` per key value, or `delete_path(collection)` without criteria |
//! | `SELECT`  | one `get` per key value, or a collection scan without criteria |

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::{KeyResolver, StoreConfig};
use crate::criteria::{self, Predicate};
use crate::cursor::ParamCursor;
use crate::parser::StatementParser;
use crate::path::FieldUpdate;
use crate::pool::StorePool;
use crate::projection::{apply_aliases, column_value_map};
use crate::statement::{DeleteStatement, InsertStatement, SelectColumn, SelectStatement, Statement, UpdateStatement};
use crate::store::{document_id, Document, DocumentStore};
use crate::{DocStoreError, Record, Result};

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Documents carry caller-chosen ids, there is no generated key.
    pub last_insert_id: i64,
}

impl ExecResult {
    pub fn affected(rows: u64) -> Self {
        Self { rows_affected: rows, last_insert_id: 0 }
    }
}

/// One projected document handed to a row handler
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    record: Record,
}

impl Row {
    pub fn new(columns: Vec<String>, record: Record) -> Self {
        Self { columns, record }
    }

    /// Output column names in SELECT order, aliases applied
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.record.get(column)
    }

    /// Values in column order, `Null` for fields the document lacks.
    pub fn values(&self) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| self.record.get(c).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.record.clone()))?)
    }
}

pub struct Manager {
    pool: StorePool,
    config: StoreConfig,
    keys: KeyResolver,
}

impl Manager {
    pub fn new(pool: StorePool, config: StoreConfig) -> Self {
        let keys = config.key_resolver();
        Self { pool, config, keys }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn pool(&self) -> &StorePool {
        &self.pool
    }

    pub fn key_resolver(&self) -> &KeyResolver {
        &self.keys
    }

    /// Run an INSERT, UPDATE or DELETE.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        debug!("[{}]: {}, {:?}", self.config.database_name(), sql, params);
        let statement = StatementParser::parse(sql)?;
        self.execute_statement(&statement, params).await
    }

    pub async fn execute_statement(&self, statement: &Statement, params: &[Value]) -> Result<ExecResult> {
        let store = self.pool.acquire().await?;
        let mut cursor = ParamCursor::new(params);
        match statement {
            Statement::Insert(insert) => self.insert(&*store, insert, &mut cursor).await,
            Statement::Update(update) => self.update(&*store, update, &mut cursor).await,
            Statement::Delete(delete) => self.delete(&*store, delete, &mut cursor).await,
            Statement::Select(select) => Err(DocStoreError::UnsupportedStatement(format!(
                "SELECT from {} needs a row handler",
                select.table
            ))),
        }
    }

    async fn insert(
        &self,
        store: &dyn DocumentStore,
        statement: &InsertStatement,
        params: &mut ParamCursor<'_>,
    ) -> Result<ExecResult> {
        let record = column_value_map(&statement.values, params)?;
        let key = self.keys.resolve(&statement.table);
        let id = key_id(&record, key)?;
        store.set(&statement.table, &id, record).await?;
        Ok(ExecResult::affected(1))
    }

    async fn update(
        &self,
        store: &dyn DocumentStore,
        statement: &UpdateStatement,
        params: &mut ParamCursor<'_>,
    ) -> Result<ExecResult> {
        let mut record = column_value_map(&statement.assignments, params)?;
        let predicate = criteria::extract(&statement.criteria, params)?;
        let key = self.keys.resolve(&statement.table);
        let id = match &predicate {
            Predicate::Eq { field, value } if field == key => document_id(value),
            Predicate::In { field, .. } if field == key => {
                return Err(DocStoreError::UnsupportedCriteria(format!(
                    "update of {} needs a single {} value",
                    statement.table, key
                )))
            }
            _ => return Err(DocStoreError::MissingKeyValue(key.to_string())),
        };

        // criteria fields double as assignments
        for (field, value) in predicate.into_fields() {
            if field != key {
                record.insert(field, value);
            }
        }

        let updates: Vec<FieldUpdate> = record
            .into_iter()
            .map(|(column, value)| FieldUpdate::new(&column, value))
            .collect();
        if updates.is_empty() {
            debug!("nothing to update in {}/{}", statement.table, id);
            return Ok(ExecResult::affected(1));
        }
        store.update(&statement.table, &id, updates).await?;
        Ok(ExecResult::affected(1))
    }

    async fn delete(
        &self,
        store: &dyn DocumentStore,
        statement: &DeleteStatement,
        params: &mut ParamCursor<'_>,
    ) -> Result<ExecResult> {
        let predicate = criteria::extract(&statement.criteria, params)?;
        if predicate.is_empty() {
            debug!("deleting path {}", statement.table);
            store.delete_path(&statement.table).await?;
            return Ok(ExecResult::affected(0));
        }

        let key = self.keys.resolve(&statement.table);
        let ids = predicate
            .values_for(key)
            .ok_or_else(|| DocStoreError::MissingKeyValue(key.to_string()))?;
        let mut affected = 0;
        for value in &ids {
            let id = document_id(value);
            match store.delete(&statement.table, &id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => warn!("{}/{} was already gone", statement.table, id),
                Err(e) => return Err(e.into()),
            }
            affected += 1;
        }
        Ok(ExecResult::affected(affected))
    }

    /// Stream the rows of a SELECT into `handler` until it returns `false`,
    /// fails, the token is cancelled or the documents run out.
    pub async fn read_with_handler<F>(
        &self,
        sql: &str,
        params: &[Value],
        cancel: &CancellationToken,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(Row) -> Result<bool> + Send,
    {
        debug!("[{}]: {}, {:?}", self.config.database_name(), sql, params);
        match StatementParser::parse(sql)? {
            Statement::Select(select) => self.read_statement(&select, params, cancel, handler).await,
            other => Err(DocStoreError::UnsupportedStatement(format!(
                "{} does not return rows",
                other.kind()
            ))),
        }
    }

    pub async fn read_statement<F>(
        &self,
        statement: &SelectStatement,
        params: &[Value],
        cancel: &CancellationToken,
        mut handler: F,
    ) -> Result<()>
    where
        F: FnMut(Row) -> Result<bool> + Send,
    {
        let mut cursor = ParamCursor::new(params);
        let predicate = criteria::extract(&statement.criteria, &mut cursor)?;
        let key = self.keys.resolve(&statement.table);
        let store = self.pool.acquire().await?;

        match predicate.field() {
            None => {
                debug!("scanning {}", statement.table);
                let mut documents = store.documents(&statement.table, None);
                while let Some(document) = documents.next().await {
                    if cancel.is_cancelled() {
                        return Err(DocStoreError::Cancelled);
                    }
                    if !emit(&statement.columns, document?, &mut handler)? {
                        break;
                    }
                }
                Ok(())
            }
            Some(field) if field == key => {
                let ids = predicate.values_for(key).unwrap_or_default();
                debug!("reading {} ids from {}", ids.len(), statement.table);
                for value in &ids {
                    if cancel.is_cancelled() {
                        return Err(DocStoreError::Cancelled);
                    }
                    let id = document_id(value);
                    let document = match store.get(&statement.table, &id).await {
                        Ok(document) => document,
                        Err(e) if e.is_not_found() => {
                            warn!("skipping missing {}/{}", statement.table, id);
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    };
                    if !emit(&statement.columns, document, &mut handler)? {
                        break;
                    }
                }
                Ok(())
            }
            Some(field) => Err(DocStoreError::UnsupportedCriteria(format!(
                "{} is not the key of {}, only {} can be filtered",
                field, statement.table, key
            ))),
        }
    }

    /// Collect every row of a SELECT.
    pub async fn read_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.read_with_handler(sql, params, &CancellationToken::new(), |row| {
            rows.push(row);
            Ok(true)
        })
        .await?;
        Ok(rows)
    }

    /// Upsert records by key: existing documents are updated, missing ones
    /// inserted. Returns `(inserted, updated)`; the first failure aborts the
    /// batch without undoing earlier writes.
    pub async fn persist_all(&self, collection: &str, records: Vec<Record>) -> Result<(usize, usize)> {
        let store = self.pool.acquire().await?;
        let key = self.keys.resolve(collection);
        let (mut inserted, mut updated) = (0, 0);

        for record in records {
            let id = key_id(&record, key)?;
            match store.get(collection, &id).await {
                Ok(_) => {
                    let updates: Vec<FieldUpdate> = record
                        .into_iter()
                        .filter(|(column, _)| column != key)
                        .map(|(column, value)| FieldUpdate::new(&column, value))
                        .collect();
                    if !updates.is_empty() {
                        store.update(collection, &id, updates).await?;
                    }
                    updated += 1;
                }
                Err(e) if e.is_not_found() => {
                    store.set(collection, &id, record).await?;
                    inserted += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!("persisted {}: {} inserted, {} updated", collection, inserted, updated);
        Ok((inserted, updated))
    }
}

/// Document id taken from the key column; absent and NULL keys are both missing.
fn key_id(record: &Record, key: &str) -> Result<String> {
    record
        .get(key)
        .filter(|value| !value.is_null())
        .map(document_id)
        .ok_or_else(|| DocStoreError::MissingKeyValue(key.to_string()))
}

fn emit<F>(columns: &[SelectColumn], document: Document, handler: &mut F) -> Result<bool>
where
    F: FnMut(Row) -> Result<bool>,
{
    let mut record = document.fields;
    let names = apply_aliases(columns, &mut record);
    let more = handler(Row::new(names, record))?;
    if !more {
        trace!("row handler stopped after {}", document.id);
    }
    Ok(more)
}
