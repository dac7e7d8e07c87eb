//! Memory cells and their deletion service.
//!
//! A [`MemCell`] is the worked example of the soft-delete convention: the
//! unique live index keeps one live cell per `(user_id, group_id)` while any
//! number of deleted generations coexist. [`MemCellDeleteService`] is the
//! facade the rest of the system deletes through.

pub mod delete;
pub mod document;
pub mod store;

pub use delete::{CombinedDeleteCriteria, CombinedDeleteOutcome, MemCellDeleteService, MAGIC_ALL};
pub use document::{MemCell, MEMCELL_COLLECTION};
pub use store::{MemCellError, MemCellStore, MongoMemCellStore};
