//! Persistence for request-log records.

use async_trait::async_trait;
use mongodb::{Collection, Database};
use thiserror::Error;
use tracing::debug;

use super::document::MemoryRequestLog;

/// Collection holding captured memories requests.
pub const REQUEST_LOG_COLLECTION: &str = "memory_request_logs";

/// Errors from request-log persistence.
#[derive(Error, Debug)]
pub enum RequestLogError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Sink for captured request logs.
///
/// The listener only needs to append; keeping the trait this small lets
/// tests drive it with an in-memory implementation.
#[async_trait]
pub trait MemoryRequestLogStore: Send + Sync {
    /// Persist one record.
    async fn save(&self, log: &MemoryRequestLog) -> Result<(), RequestLogError>;
}

/// Mongo-backed request-log store.
#[derive(Clone)]
pub struct MongoMemoryRequestLogStore {
    collection: Collection<MemoryRequestLog>,
}

impl MongoMemoryRequestLogStore {
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(REQUEST_LOG_COLLECTION),
        }
    }
}

#[async_trait]
impl MemoryRequestLogStore for MongoMemoryRequestLogStore {
    async fn save(&self, log: &MemoryRequestLog) -> Result<(), RequestLogError> {
        let result = self.collection.insert_one(log).await?;
        debug!("Saved request log: inserted_id={}", result.inserted_id);
        Ok(())
    }
}
