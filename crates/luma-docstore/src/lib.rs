//! LumaDB document-store SQL adapter
//!
//! Executes parsed INSERT/UPDATE/DELETE/SELECT statements with positional
//! bind parameters against a schemaless document store that only offers
//! get-by-id, collection scans and per-document set/update/delete.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use luma_docstore::{Manager, MemoryStore, StoreConfig, StorePool};
//!
//! let pool = StorePool::new(Arc::new(MemoryStore::new()), 1);
//! let manager = Manager::new(pool, StoreConfig::default());
//! manager.execute("INSERT INTO users(id, name) VALUES(?, ?)", &[json!(1), json!("Name 1")]).await?;
//! let rows = manager.read_all("SELECT id, name FROM users WHERE id = ?", &[json!(1)]).await?;
//! ```

pub mod config;
pub mod criteria;
pub mod cursor;
pub mod dialect;
pub mod manager;
pub mod memory;
pub mod parser;
pub mod path;
pub mod pool;
pub mod projection;
pub mod statement;
pub mod store;

pub use config::{CollectionConfig, KeyResolver, StoreConfig};
pub use criteria::Predicate;
pub use cursor::ParamCursor;
pub use dialect::{ColumnInfo, DataType, Dialect};
pub use manager::{ExecResult, Manager, Row};
pub use memory::{MemoryStore, StoreOp};
pub use parser::StatementParser;
pub use path::{FieldPath, FieldUpdate};
pub use pool::{PooledStore, StorePool};
pub use statement::Statement;
pub use store::{Document, DocumentStore, DocumentStream};

use thiserror::Error;

/// A document's field set.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Errors reported by the document store collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Core error type for statement translation and execution
#[derive(Error, Debug)]
pub enum DocStoreError {
    #[error("unsupported criteria: {0}")]
    UnsupportedCriteria(String),
    #[error("missing bind param: {0}")]
    MissingBindParameter(String),
    #[error("missing value for {0}")]
    MissingKeyValue(String),
    #[error("failed to parse {sql}: {reason}")]
    ParseFailure { sql: String, reason: String },
    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),
    #[error("parameter cursor exhausted")]
    ExhaustedCursor,
    #[error("operation cancelled")]
    Cancelled,
    #[error("connection pool closed")]
    PoolClosed,
    #[error("row handler failed: {0}")]
    Handler(String),
    #[error("failed to decode row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, DocStoreError>;
