use std::sync::Arc;

use luma_docstore::{Manager, MemoryStore, Record, StoreConfig, StorePool};
use serde_json::Value;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config() -> StoreConfig {
    StoreConfig::from_toml(
        r#"
        database_url = "https://abstractdb-154a9.firebaseio.com/abstractdb"
        project_id = "abstractdb-154a9"

        [collections.orders]
        key_column = "order_id"
        "#,
    )
    .unwrap()
}

pub fn manager() -> (Manager, Arc<MemoryStore>) {
    init_tracing();
    let store = Arc::new(MemoryStore::with_journal());
    let pool = StorePool::new(store.clone(), 2);
    (Manager::new(pool, config()), store)
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {}", other),
    }
}
