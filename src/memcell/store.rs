//! Mongo-backed storage for memory cells.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database, IndexModel};
use thiserror::Error;
use tracing::debug;

use crate::document::{apply_soft_delete_filter, SoftDeleteCollection, DELETED_AT_FIELD};

use super::document::{MemCell, MEMCELL_COLLECTION};

#[derive(Debug, Error)]
pub enum MemCellError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("Invalid event id: {id}")]
    InvalidEventId {
        id: String,
        #[source]
        source: bson::oid::Error,
    },
}

/// Soft-delete operations over the memcell collection.
///
/// Kept narrow so the deletion service can be driven by an in-memory
/// implementation in tests.
#[async_trait]
pub trait MemCellStore: Send + Sync {
    /// Soft delete the single live cell whose id hex is `event_id`.
    ///
    /// Returns `false` when no live cell matches. An id that is not valid
    /// `ObjectId` hex is an error.
    async fn soft_delete_by_event_id(
        &self,
        event_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<bool, MemCellError>;

    /// Soft delete every live cell matching `filter`, returning the count.
    async fn soft_delete_by_filter(
        &self,
        filter: Document,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError>;

    /// Restore every deleted cell matching `filter`, returning the count.
    async fn restore_by_filter(&self, filter: Document) -> Result<u64, MemCellError>;

    /// Count the live cells matching `filter`.
    async fn count_live(&self, filter: Document) -> Result<u64, MemCellError>;

    /// Soft delete every live cell belonging to `user_id`.
    async fn soft_delete_by_user_id(
        &self,
        user_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        self.soft_delete_by_filter(doc! { "user_id": user_id }, deleted_by)
            .await
    }

    /// Soft delete every live cell in `group_id`.
    async fn soft_delete_by_group_id(
        &self,
        group_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        self.soft_delete_by_filter(doc! { "group_id": group_id }, deleted_by)
            .await
    }
}

/// [`MemCellStore`] backed by the `memcells` collection.
#[derive(Clone)]
pub struct MongoMemCellStore {
    collection: Collection<MemCell>,
}

impl MongoMemCellStore {
    #[must_use]
    pub fn new(database: &Database) -> Self {
        Self {
            collection: database.collection(MEMCELL_COLLECTION),
        }
    }

    /// The underlying typed collection, for callers needing the raw driver.
    #[must_use]
    pub fn collection(&self) -> &Collection<MemCell> {
        &self.collection
    }

    /// Create the unique live index and the per-field lookup indexes.
    pub async fn ensure_indexes(&self) -> Result<(), MemCellError> {
        let indexes = vec![
            MemCell::unique_live_index(),
            IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
            IndexModel::builder().keys(doc! { "group_id": 1 }).build(),
        ];
        self.collection.create_indexes(indexes).await?;
        Ok(())
    }

    /// Insert a new cell, returning the id the store assigned.
    pub async fn insert(&self, cell: &MemCell) -> Result<Bson, MemCellError> {
        let result = self.collection.insert_one(cell).await?;
        debug!("Inserted memcell: id={}", result.inserted_id);
        Ok(result.inserted_id)
    }

    /// Look up a cell by its event id. With `include_deleted`, deleted
    /// generations are visible too.
    pub async fn find_by_event_id(
        &self,
        event_id: &str,
        include_deleted: bool,
    ) -> Result<Option<MemCell>, MemCellError> {
        let id = parse_event_id(event_id)?;
        let filter = doc! { "_id": id };
        let cell = if include_deleted {
            self.collection.hard_find_one(filter, None).await?
        } else {
            self.collection.find_one_active(filter, None).await?
        };
        Ok(cell)
    }

    /// Live cells of a group, oldest first.
    pub async fn live_in_group(&self, group_id: &str) -> Result<Vec<MemCell>, MemCellError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();
        let cells = self
            .collection
            .find_active(doc! { "group_id": group_id }, Some(options))
            .await?;
        Ok(cells)
    }

    /// Every generation a group ever had, deleted ones included, oldest
    /// first.
    pub async fn history_in_group(&self, group_id: &str) -> Result<Vec<MemCell>, MemCellError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": 1 })
            .build();
        let cells = self
            .collection
            .hard_find(doc! { "group_id": group_id }, Some(options))
            .await?;
        Ok(cells)
    }

    /// Restore the cell whose id hex is `event_id`.
    ///
    /// Returns `false` when the cell is missing or not deleted.
    pub async fn restore_by_event_id(&self, event_id: &str) -> Result<bool, MemCellError> {
        let id = parse_event_id(event_id)?;
        let Some(mut cell) = self.collection.hard_find_one(doc! { "_id": id }, None).await? else {
            return Ok(false);
        };
        let restored = self.collection.restore_doc(&mut cell).await?;
        Ok(restored)
    }

    /// Physically remove cells soft-deleted before `cutoff`, returning the
    /// count. Live cells have a null `deleted_at` and never match the date
    /// comparison.
    pub async fn purge_deleted_before(&self, cutoff: bson::DateTime) -> Result<u64, MemCellError> {
        let result = self
            .collection
            .hard_delete_many(doc! { DELETED_AT_FIELD: { "$lt": cutoff } })
            .await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl MemCellStore for MongoMemCellStore {
    async fn soft_delete_by_event_id(
        &self,
        event_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<bool, MemCellError> {
        let id = parse_event_id(event_id)?;
        let Some(mut cell) = self
            .collection
            .find_one_active(doc! { "_id": id }, None)
            .await?
        else {
            return Ok(false);
        };
        let deleted = self.collection.soft_delete_doc(&mut cell, deleted_by).await?;
        Ok(deleted)
    }

    async fn soft_delete_by_filter(
        &self,
        filter: Document,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        let result = self.collection.soft_delete_many(filter, deleted_by).await?;
        Ok(result.modified_count)
    }

    async fn restore_by_filter(&self, filter: Document) -> Result<u64, MemCellError> {
        let result = self.collection.restore_many(filter).await?;
        Ok(result.modified_count)
    }

    async fn count_live(&self, filter: Document) -> Result<u64, MemCellError> {
        let count = self
            .collection
            .count_documents(apply_soft_delete_filter(filter, false))
            .await?;
        Ok(count)
    }
}

fn parse_event_id(event_id: &str) -> Result<ObjectId, MemCellError> {
    ObjectId::parse_str(event_id).map_err(|source| MemCellError::InvalidEventId {
        id: event_id.to_string(),
        source,
    })
}
