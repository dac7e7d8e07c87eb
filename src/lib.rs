// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result
    )
)]

pub mod config;
pub mod datetime;
pub mod document;
pub mod events;
pub mod logging;
pub mod memcell;
pub mod request_log;

// Re-export commonly used types
pub use config::{StoreConfig, DEFAULT_DATABASE, DEFAULT_MONGO_URI};
pub use datetime::{
    from_iso_format, from_timestamp, now_with_timezone, service_timezone, to_iso_format,
    to_timestamp, to_timestamp_ms, to_timestamp_ms_universal, DateTimeError, TimeValue,
};
pub use document::{
    apply_soft_delete_filter, bulk_deleted_id, deleted_id_for, deleted_only_filter,
    live_unique_index, soft_delete_filter, SoftDeletable, SoftDeleteCollection, SoftDeleteMark,
    DELETED_AT_FIELD, DELETED_BY_FIELD, DELETED_ID_FIELD, LIVE_DELETED_ID,
};
pub use events::{EventDispatcher, EventListener, RequestHistoryEvent};
pub use memcell::{
    CombinedDeleteCriteria, CombinedDeleteOutcome, MemCell, MemCellDeleteService, MemCellError,
    MemCellStore, MongoMemCellStore, MAGIC_ALL, MEMCELL_COLLECTION,
};
pub use request_log::{
    MemoryRequestLog, MemoryRequestLogListener, MemoryRequestLogStore, MongoMemoryRequestLogStore,
    RequestLogError, REQUEST_LOG_COLLECTION,
};
