//! Soft-delete fields, filters, and the deleted-id discriminator.

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, TimeZone};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Field storing the deletion timestamp. Null means live.
pub const DELETED_AT_FIELD: &str = "deleted_at";

/// Field storing who performed the deletion.
pub const DELETED_BY_FIELD: &str = "deleted_by";

/// Discriminator field backing the live-unique index trick.
pub const DELETED_ID_FIELD: &str = "deleted_id";

/// `deleted_id` value shared by every live document.
pub const LIVE_DELETED_ID: i64 = 0;

/// The three soft-delete bookkeeping values of a document.
///
/// A live document carries `(None, None, 0)`. A deleted one carries the
/// deletion instant, the optional deleter, and a non-zero discriminator.
/// The field names double as the wire names, so a document type can embed
/// the mark `#[serde(flatten)]`ed instead of declaring the fields itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct SoftDeleteMark {
    pub deleted_at: Option<bson::DateTime>,
    pub deleted_by: Option<String>,
    #[serde(default)]
    pub deleted_id: i64,
}

impl SoftDeleteMark {
    /// The state of a document that has never been deleted.
    #[must_use]
    pub fn live() -> Self {
        Self::default()
    }

    /// True when the mark records a deletion.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Documents carrying the soft-delete bookkeeping fields.
///
/// Implementors declare `deleted_at`, `deleted_by`, and `deleted_id` on the
/// document itself and move them through the mark accessors, which lets
/// [`SoftDeleteCollection`](super::SoftDeleteCollection) stamp and clear the
/// fields without knowing the document type.
pub trait SoftDeletable {
    /// Store id of the document, once one has been assigned.
    fn object_id(&self) -> Option<ObjectId>;

    /// Current soft-delete state.
    fn soft_delete_mark(&self) -> SoftDeleteMark;

    /// Overwrite the soft-delete state, mirroring a store update.
    fn set_soft_delete_mark(&mut self, mark: SoftDeleteMark);

    /// True when the document has been soft deleted.
    fn is_deleted(&self) -> bool {
        self.soft_delete_mark().is_deleted()
    }
}

/// Derive the `deleted_id` discriminator for a single-document delete.
///
/// The first eight bytes of the SHA-256 of the id's hex form, with the sign
/// bit cleared. Stable across processes, so re-running a deletion after a
/// restart produces the same discriminator.
#[must_use]
pub fn deleted_id_for(id: &ObjectId) -> i64 {
    let digest = Sha256::digest(id.to_hex().as_bytes());
    let head = digest.first_chunk::<8>().copied().unwrap_or_default();
    i64::from_be_bytes(head) & i64::MAX
}

/// Derive the `deleted_id` discriminator for a bulk delete.
///
/// A single update statement cannot hash each matched document's id, so
/// every document stamped by one bulk delete shares the microsecond
/// timestamp of the deletion instant.
#[must_use]
pub fn bulk_deleted_id<T: TimeZone>(deleted_at: &DateTime<T>) -> i64 {
    deleted_at.timestamp_micros()
}

/// The bare live-only filter.
///
/// `{}` when deleted documents are included, otherwise `{deleted_at: null}`.
#[must_use]
pub fn soft_delete_filter(include_deleted: bool) -> Document {
    if include_deleted {
        Document::new()
    } else {
        doc! { DELETED_AT_FIELD: Bson::Null }
    }
}

/// Append the live-only clause to a filter.
///
/// An explicit `deleted_at` clause written by the caller always wins; the
/// implicit clause is only added when the field is unconstrained and
/// `include_deleted` is false.
#[must_use]
pub fn apply_soft_delete_filter(mut filter: Document, include_deleted: bool) -> Document {
    if !include_deleted && !filter.contains_key(DELETED_AT_FIELD) {
        filter.insert(DELETED_AT_FIELD, Bson::Null);
    }
    filter
}

/// Constrain a filter to deleted documents only.
///
/// Keeps any `deleted_at` clause the caller already wrote.
#[must_use]
pub fn deleted_only_filter(mut filter: Document) -> Document {
    if !filter.contains_key(DELETED_AT_FIELD) {
        filter.insert(DELETED_AT_FIELD, doc! { "$ne": Bson::Null });
    }
    filter
}

/// `$set` update stamping the three soft-delete fields.
#[must_use]
pub fn soft_delete_update(
    deleted_at: bson::DateTime,
    deleted_by: Option<&str>,
    deleted_id: i64,
) -> Document {
    doc! {
        "$set": {
            DELETED_AT_FIELD: deleted_at,
            DELETED_BY_FIELD: deleted_by,
            DELETED_ID_FIELD: deleted_id,
        }
    }
}

/// `$set` update returning a deleted document to its live values.
#[must_use]
pub fn restore_update() -> Document {
    doc! {
        "$set": {
            DELETED_AT_FIELD: Bson::Null,
            DELETED_BY_FIELD: Bson::Null,
            DELETED_ID_FIELD: LIVE_DELETED_ID,
        }
    }
}

/// Unique index over the business keys plus `deleted_id`.
///
/// Live documents all carry `deleted_id = 0`, so the index admits exactly
/// one live document per business key. Deleted documents each carry a
/// distinct discriminator and can repeat the key freely, and a new live
/// document can be inserted after its predecessor was soft deleted.
#[must_use]
pub fn live_unique_index(mut keys: Document) -> IndexModel {
    keys.insert(DELETED_ID_FIELD, 1);
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}
