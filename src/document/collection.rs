//! Soft-delete aware operations over a typed collection.

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::Error;
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::results::{DeleteResult, UpdateResult};
use mongodb::Collection;
use serde::de::DeserializeOwned;

use crate::datetime::now_with_timezone;

use super::soft_delete::{
    apply_soft_delete_filter, bulk_deleted_id, deleted_id_for, deleted_only_filter,
    restore_update, soft_delete_update, SoftDeletable, SoftDeleteMark, LIVE_DELETED_ID,
};

/// Query and update operations honoring the soft-delete convention.
///
/// `find_one_active` / `find_active` see live documents only. The `hard_`
/// variants see everything and delete physically, mirroring the naming of
/// the soft operations. Callers that need the raw driver surface can always
/// fall back to the collection itself with
/// [`apply_soft_delete_filter`](super::apply_soft_delete_filter).
#[async_trait]
pub trait SoftDeleteCollection<T> {
    /// Find one live document.
    async fn find_one_active(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>, Error>;

    /// Find live documents.
    async fn find_active(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, Error>;

    /// Find one document, including soft-deleted ones.
    async fn hard_find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>, Error>;

    /// Find documents, including soft-deleted ones.
    async fn hard_find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, Error>;

    /// Soft delete one document, stamping the audit fields in the store and
    /// mirroring them into `document`.
    ///
    /// Returns `false` without touching anything when the document is
    /// already deleted; repeating a delete must not overwrite the original
    /// audit trail.
    async fn soft_delete_doc(&self, document: &mut T, deleted_by: Option<&str>)
        -> Result<bool, Error>;

    /// Clear the soft-delete fields of one deleted document.
    ///
    /// Returns `false` without touching anything when the document is not
    /// deleted.
    async fn restore_doc(&self, document: &mut T) -> Result<bool, Error>;

    /// Physically delete one document. Irreversible.
    async fn hard_delete_doc(&self, document: &T) -> Result<DeleteResult, Error>;

    /// Soft delete every live document matching `filter`.
    ///
    /// Already-deleted documents are never re-stamped. All documents stamped
    /// by one call share a timestamp-derived `deleted_id`.
    async fn soft_delete_many(
        &self,
        filter: Document,
        deleted_by: Option<&str>,
    ) -> Result<UpdateResult, Error>;

    /// Restore every deleted document matching `filter`.
    ///
    /// The filter is constrained to deleted documents, so live ones are
    /// never modified.
    async fn restore_many(&self, filter: Document) -> Result<UpdateResult, Error>;

    /// Physically delete every document matching `filter`. Irreversible.
    async fn hard_delete_many(&self, filter: Document) -> Result<DeleteResult, Error>;
}

#[async_trait]
impl<T> SoftDeleteCollection<T> for Collection<T>
where
    T: SoftDeletable + DeserializeOwned + Send + Sync,
{
    async fn find_one_active(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>, Error> {
        self.find_one(apply_soft_delete_filter(filter, false))
            .with_options(options)
            .await
    }

    async fn find_active(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, Error> {
        self.find(apply_soft_delete_filter(filter, false))
            .with_options(options)
            .await?
            .try_collect()
            .await
    }

    async fn hard_find_one(
        &self,
        filter: Document,
        options: Option<FindOneOptions>,
    ) -> Result<Option<T>, Error> {
        self.find_one(filter).with_options(options).await
    }

    async fn hard_find(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, Error> {
        self.find(filter)
            .with_options(options)
            .await?
            .try_collect()
            .await
    }

    async fn soft_delete_doc(
        &self,
        document: &mut T,
        deleted_by: Option<&str>,
    ) -> Result<bool, Error> {
        if document.is_deleted() {
            return Ok(false);
        }
        let now = now_with_timezone();
        let deleted_at = bson::DateTime::from_chrono(now);
        let deleted_id = document
            .object_id()
            .map_or(LIVE_DELETED_ID, |id| deleted_id_for(&id));
        self.update_one(
            doc! { "_id": document.object_id() },
            soft_delete_update(deleted_at, deleted_by, deleted_id),
        )
        .await?;
        document.set_soft_delete_mark(SoftDeleteMark {
            deleted_at: Some(deleted_at),
            deleted_by: deleted_by.map(str::to_string),
            deleted_id,
        });
        Ok(true)
    }

    async fn restore_doc(&self, document: &mut T) -> Result<bool, Error> {
        if !document.is_deleted() {
            return Ok(false);
        }
        self.update_one(doc! { "_id": document.object_id() }, restore_update())
            .await?;
        document.set_soft_delete_mark(SoftDeleteMark::live());
        Ok(true)
    }

    async fn hard_delete_doc(&self, document: &T) -> Result<DeleteResult, Error> {
        self.delete_one(doc! { "_id": document.object_id() }).await
    }

    async fn soft_delete_many(
        &self,
        filter: Document,
        deleted_by: Option<&str>,
    ) -> Result<UpdateResult, Error> {
        let now = now_with_timezone();
        let update =
            soft_delete_update(bson::DateTime::from_chrono(now), deleted_by, bulk_deleted_id(&now));
        self.update_many(apply_soft_delete_filter(filter, false), update)
            .await
    }

    async fn restore_many(&self, filter: Document) -> Result<UpdateResult, Error> {
        self.update_many(deleted_only_filter(filter), restore_update())
            .await
    }

    async fn hard_delete_many(&self, filter: Document) -> Result<DeleteResult, Error> {
        self.delete_many(filter).await
    }
}
