//! Store configuration resolved from the environment.

use mongodb::{Client, Database};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Connection string used when `MEMVAULT_MONGO_URI` is not set.
pub const DEFAULT_MONGO_URI: &str = "mongodb://127.0.0.1:27017";

/// Database name used when `MEMVAULT_MONGO_DB` is not set.
pub const DEFAULT_DATABASE: &str = "memvault";

/// Connection settings for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// MongoDB connection string.
    #[serde(default = "default_uri")]
    pub uri: String,
    /// Database holding the collections.
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_uri() -> String {
    DEFAULT_MONGO_URI.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
        }
    }
}

impl StoreConfig {
    /// Resolve the configuration from `MEMVAULT_MONGO_URI` and
    /// `MEMVAULT_MONGO_DB`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let uri =
            std::env::var("MEMVAULT_MONGO_URI").unwrap_or_else(|_| DEFAULT_MONGO_URI.to_string());
        let database =
            std::env::var("MEMVAULT_MONGO_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        // The URI can carry credentials and is never logged.
        debug!("Store config resolved: database={database}");
        Self { uri, database }
    }

    /// Connect to the store and hand back the configured database.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection string cannot be parsed or the
    /// client cannot be constructed.
    pub async fn connect(&self) -> Result<Database, mongodb::error::Error> {
        let client = Client::with_uri_str(&self.uri).await?;
        Ok(client.database(&self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.uri, DEFAULT_MONGO_URI);
        assert_eq!(config.database, DEFAULT_DATABASE);
    }

    #[test]
    fn test_from_env_defaults_and_overrides() {
        std::env::remove_var("MEMVAULT_MONGO_URI");
        std::env::remove_var("MEMVAULT_MONGO_DB");
        let config = StoreConfig::from_env();
        assert_eq!(config.uri, DEFAULT_MONGO_URI);
        assert_eq!(config.database, DEFAULT_DATABASE);

        std::env::set_var("MEMVAULT_MONGO_URI", "mongodb://db.internal:27017");
        std::env::set_var("MEMVAULT_MONGO_DB", "memvault_test");
        let config = StoreConfig::from_env();
        assert_eq!(config.uri, "mongodb://db.internal:27017");
        assert_eq!(config.database, "memvault_test");

        std::env::remove_var("MEMVAULT_MONGO_URI");
        std::env::remove_var("MEMVAULT_MONGO_DB");
    }

    #[test]
    fn test_store_config_deserializes_with_defaults() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.uri, DEFAULT_MONGO_URI);
        assert_eq!(config.database, DEFAULT_DATABASE);

        let config: StoreConfig =
            serde_json::from_str(r#"{"uri":"mongodb://localhost:27017","database":"other"}"#)
                .unwrap();
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "other");
    }
}
