//! Soft-delete support for store documents.
//!
//! Documents are never removed by the default delete paths. A delete stamps
//! `deleted_at`, `deleted_by`, and the `deleted_id` discriminator; queries
//! filter on `deleted_at` to see live documents only. The discriminator is
//! what makes unique business keys workable: every live document carries
//! `deleted_id = 0`, every deleted document a distinct value, so a unique
//! index over `(business key, deleted_id)` admits one live document per key
//! while keeping any number of deleted ones.

pub mod collection;
pub mod soft_delete;

pub use collection::SoftDeleteCollection;
pub use soft_delete::{
    apply_soft_delete_filter, bulk_deleted_id, deleted_id_for, deleted_only_filter,
    live_unique_index, restore_update, soft_delete_filter, soft_delete_update, SoftDeletable,
    SoftDeleteMark, DELETED_AT_FIELD, DELETED_BY_FIELD, DELETED_ID_FIELD, LIVE_DELETED_ID,
};
