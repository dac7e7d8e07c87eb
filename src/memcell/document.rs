//! The memory cell document.

use bson::doc;
use bson::oid::ObjectId;
use mongodb::IndexModel;
use serde::{Deserialize, Serialize};

use crate::datetime::now_with_timezone;
use crate::document::{live_unique_index, SoftDeletable, SoftDeleteMark, LIVE_DELETED_ID};

/// Collection holding memory cells.
pub const MEMCELL_COLLECTION: &str = "memcells";

/// A unit of remembered content for a user within a group.
///
/// The Mongo id doubles as the external event id (its hex form). At most one
/// live cell exists per `(user_id, group_id)` pair; deleted generations of
/// the same pair are kept apart by their `deleted_id` stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemCell {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub content: String,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
    pub deleted_at: Option<bson::DateTime>,
    pub deleted_by: Option<String>,
    pub deleted_id: i64,
}

impl MemCell {
    /// New live cell stamped with the current service time.
    #[must_use]
    pub fn new(
        user_id: Option<String>,
        group_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = bson::DateTime::from_chrono(now_with_timezone());
        Self {
            id: None,
            user_id,
            group_id,
            content: content.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
            deleted_id: LIVE_DELETED_ID,
        }
    }

    /// Index keeping `(user_id, group_id)` unique among live cells while
    /// tolerating any number of deleted generations.
    #[must_use]
    pub fn unique_live_index() -> IndexModel {
        live_unique_index(doc! { "user_id": 1, "group_id": 1 })
    }
}

impl SoftDeletable for MemCell {
    fn object_id(&self) -> Option<ObjectId> {
        self.id
    }

    fn soft_delete_mark(&self) -> SoftDeleteMark {
        SoftDeleteMark {
            deleted_at: self.deleted_at,
            deleted_by: self.deleted_by.clone(),
            deleted_id: self.deleted_id,
        }
    }

    fn set_soft_delete_mark(&mut self, mark: SoftDeleteMark) {
        self.deleted_at = mark.deleted_at;
        self.deleted_by = mark.deleted_by;
        self.deleted_id = mark.deleted_id;
    }
}
