use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

pub const DEFAULT_KEY_COLUMN: &str = "id";
pub const DEFAULT_MAX_POOL_SIZE: usize = 1;

const KEY_COLUMN_PARAM: &str = "keyColumn";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
    pub project_id: String,
    pub max_pool_size: usize,
    /// Store-wide key column
    pub key_column: String,
    pub collections: HashMap<String, CollectionConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CollectionConfig {
    pub key_column: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            project_id: String::new(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            collections: HashMap::new(),
        }
    }
}

impl StoreConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: StoreConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from flat driver parameters: `databaseURL`, `projectID`,
    /// `maxPoolSize`, `keyColumn` and per-collection `<collection>.keyColumn`.
    /// Connection-only keys such as `credentials` are ignored.
    pub fn from_parameters(params: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let mut config = StoreConfig::default();
        for (key, value) in params {
            match key.as_str() {
                "databaseURL" => config.database_url = value.clone(),
                "projectID" => config.project_id = value.clone(),
                "maxPoolSize" => {
                    config.max_pool_size = value
                        .parse()
                        .with_context(|| format!("invalid maxPoolSize: {}", value))?;
                }
                KEY_COLUMN_PARAM => config.key_column = value.clone(),
                other => {
                    if let Some(collection) = other.strip_suffix(KEY_COLUMN_PARAM).and_then(|s| s.strip_suffix('.')) {
                        config
                            .collections
                            .entry(collection.to_string())
                            .or_default()
                            .key_column = Some(value.clone());
                    }
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            bail!("databaseURL was empty");
        }
        if self.project_id.is_empty() {
            bail!("projectID was empty");
        }
        if self.key_column.is_empty() {
            bail!("keyColumn was empty");
        }
        Ok(())
    }

    /// Database name, the last segment of the database URL.
    pub fn database_name(&self) -> &str {
        self.database_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }

    /// Pool size with the zero default normalised to one handle.
    pub fn pool_size(&self) -> usize {
        self.max_pool_size.max(1)
    }

    pub fn key_resolver(&self) -> KeyResolver {
        let mut resolver = KeyResolver::new(&self.key_column);
        for (collection, conf) in &self.collections {
            if let Some(key) = conf.key_column.as_deref().filter(|k| !k.is_empty()) {
                resolver = resolver.with_override(collection, key);
            }
        }
        resolver
    }
}

/// Maps a collection to the column used as its document id.
#[derive(Debug, Clone)]
pub struct KeyResolver {
    default_key: String,
    overrides: HashMap<String, String>,
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_COLUMN)
    }
}

impl KeyResolver {
    pub fn new(default_key: &str) -> Self {
        Self {
            default_key: default_key.to_string(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, collection: &str, key: &str) -> Self {
        self.overrides.insert(collection.to_string(), key.to_string());
        self
    }

    pub fn resolve(&self, collection: &str) -> &str {
        self.overrides
            .get(collection)
            .map(String::as_str)
            .unwrap_or(&self.default_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolver_defaults_to_id() {
        let resolver = KeyResolver::default();
        assert_eq!(resolver.resolve("users"), "id");
    }

    #[test]
    fn test_resolver_override() {
        let resolver = KeyResolver::new("uid").with_override("orders", "order_id");
        assert_eq!(resolver.resolve("orders"), "order_id");
        assert_eq!(resolver.resolve("users"), "uid");
    }

    #[test]
    fn test_from_toml() {
        let config = StoreConfig::from_toml(
            r#"
            database_url = "https://abstractdb-154a9.firebaseio.com/abstractdb"
            project_id = "abstractdb-154a9"
            max_pool_size = 4

            [collections.orders]
            key_column = "order_id"
            "#,
        )
        .unwrap();

        assert_eq!(config.key_column, "id");
        assert_eq!(config.pool_size(), 4);
        assert_eq!(config.database_name(), "abstractdb");
        assert_eq!(config.key_resolver().resolve("orders"), "order_id");
        assert_eq!(config.key_resolver().resolve("users"), "id");
    }

    #[test]
    fn test_from_parameters() {
        let params: HashMap<String, String> = [
            ("databaseURL", "https://example.firebaseio.com"),
            ("projectID", "example"),
            ("keyColumn", "uid"),
            ("users.keyColumn", "email"),
            ("maxPoolSize", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = StoreConfig::from_parameters(&params).unwrap();
        let resolver = config.key_resolver();
        assert_eq!(resolver.resolve("users"), "email");
        assert_eq!(resolver.resolve("orders"), "uid");
        assert_eq!(config.pool_size(), 1);
    }

    #[test]
    fn test_connection_only_settings_are_ignored() {
        let params: HashMap<String, String> = [
            ("databaseURL", "https://example.firebaseio.com"),
            ("projectID", "example"),
            ("storageBucket", "example.appspot.com"),
            ("credentials", "/etc/example/service-account.json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = StoreConfig::from_parameters(&params).unwrap();
        assert_eq!(config.key_column, "id");
        assert!(config.collections.is_empty());

        let config = StoreConfig::from_toml(
            r#"
            database_url = "https://example.firebaseio.com"
            project_id = "example"
            storage_bucket = "example.appspot.com"
            credentials = "/etc/example/service-account.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.project_id, "example");
    }

    #[test]
    fn test_validation_requires_database_url_and_project() {
        let err = StoreConfig::from_toml("project_id = \"p\"").unwrap_err();
        assert!(err.to_string().contains("databaseURL was empty"));

        let err = StoreConfig::from_toml("database_url = \"https://x.firebaseio.com\"").unwrap_err();
        assert!(err.to_string().contains("projectID was empty"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_url = \"https://x.firebaseio.com/db\"").unwrap();
        writeln!(file, "project_id = \"x\"").unwrap();
        writeln!(file, "key_column = \"uid\"").unwrap();

        let config = StoreConfig::load(file.path()).unwrap();
        assert_eq!(config.key_resolver().resolve("anything"), "uid");
    }
}
