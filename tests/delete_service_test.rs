#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use memvault_persistence::memcell::{
    CombinedDeleteCriteria, MemCellDeleteService, MemCellError, MemCellStore, MAGIC_ALL,
};

/// Store recording the filters it is asked to delete by.
///
/// Mirrors the Mongo implementation's contract: a malformed event id is an
/// `InvalidEventId` error, everything else succeeds with the configured
/// results.
#[derive(Default)]
struct RecordingMemCellStore {
    filters: Mutex<Vec<Document>>,
    event_found: bool,
    count: u64,
}

impl RecordingMemCellStore {
    fn with_results(event_found: bool, count: u64) -> Self {
        Self {
            filters: Mutex::new(Vec::new()),
            event_found,
            count,
        }
    }

    fn recorded_filters(&self) -> Vec<Document> {
        self.filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemCellStore for RecordingMemCellStore {
    async fn soft_delete_by_event_id(
        &self,
        event_id: &str,
        _deleted_by: Option<&str>,
    ) -> Result<bool, MemCellError> {
        let id = ObjectId::parse_str(event_id).map_err(|source| MemCellError::InvalidEventId {
            id: event_id.to_string(),
            source,
        })?;
        self.filters.lock().unwrap().push(doc! { "_id": id });
        Ok(self.event_found)
    }

    async fn soft_delete_by_filter(
        &self,
        filter: Document,
        _deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        self.filters.lock().unwrap().push(filter);
        Ok(self.count)
    }

    async fn restore_by_filter(&self, filter: Document) -> Result<u64, MemCellError> {
        self.filters.lock().unwrap().push(filter);
        Ok(self.count)
    }

    async fn count_live(&self, _filter: Document) -> Result<u64, MemCellError> {
        Ok(0)
    }
}

/// Store whose bulk deletions fail with a driver error.
struct FailingMemCellStore;

#[async_trait]
impl MemCellStore for FailingMemCellStore {
    async fn soft_delete_by_event_id(
        &self,
        _event_id: &str,
        _deleted_by: Option<&str>,
    ) -> Result<bool, MemCellError> {
        Err(MemCellError::Mongo(mongodb::error::Error::custom(
            "store down",
        )))
    }

    async fn soft_delete_by_filter(
        &self,
        _filter: Document,
        _deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        Err(MemCellError::Mongo(mongodb::error::Error::custom(
            "store down",
        )))
    }

    async fn restore_by_filter(&self, _filter: Document) -> Result<u64, MemCellError> {
        Err(MemCellError::Mongo(mongodb::error::Error::custom(
            "store down",
        )))
    }

    async fn count_live(&self, _filter: Document) -> Result<u64, MemCellError> {
        Err(MemCellError::Mongo(mongodb::error::Error::custom(
            "store down",
        )))
    }
}

fn service_over(store: &Arc<RecordingMemCellStore>) -> MemCellDeleteService {
    MemCellDeleteService::new(Arc::<RecordingMemCellStore>::clone(store))
}

#[tokio::test]
async fn test_delete_by_event_id_found() {
    let store = Arc::new(RecordingMemCellStore::with_results(true, 0));
    let service = service_over(&store);

    let event_id = ObjectId::new().to_hex();
    let deleted = service
        .delete_by_event_id(&event_id, Some("admin"))
        .await
        .expect("Deletion should succeed");

    assert!(deleted);
    assert_eq!(store.recorded_filters().len(), 1);
}

#[tokio::test]
async fn test_delete_by_event_id_not_found() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 0));
    let service = service_over(&store);

    let deleted = service
        .delete_by_event_id(&ObjectId::new().to_hex(), None)
        .await
        .expect("A missing cell is not an error");

    assert!(!deleted);
}

#[tokio::test]
async fn test_delete_by_event_id_invalid_hex_is_error() {
    let store = Arc::new(RecordingMemCellStore::default());
    let service = service_over(&store);

    let result = service.delete_by_event_id("not-hex", None).await;

    assert!(matches!(result, Err(MemCellError::InvalidEventId { .. })));
    assert!(store.recorded_filters().is_empty());
}

#[tokio::test]
async fn test_delete_by_user_id_builds_filter() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 3));
    let service = service_over(&store);

    let count = service
        .delete_by_user_id("user-1", Some("admin"))
        .await
        .expect("Bulk deletion should succeed");

    assert_eq!(count, 3);
    assert_eq!(store.recorded_filters(), vec![doc! { "user_id": "user-1" }]);
}

#[tokio::test]
async fn test_delete_by_group_id_builds_filter() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 2));
    let service = service_over(&store);

    let count = service
        .delete_by_group_id("group-1", None)
        .await
        .expect("Bulk deletion should succeed");

    assert_eq!(count, 2);
    assert_eq!(store.recorded_filters(), vec![doc! { "group_id": "group-1" }]);
}

#[tokio::test]
async fn test_combined_criteria_applies_all_effective_fields() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 5));
    let service = service_over(&store);

    let event_id = ObjectId::new();
    let criteria = CombinedDeleteCriteria {
        event_id: Some(event_id.to_hex()),
        user_id: Some("user-1".to_string()),
        group_id: Some("group-1".to_string()),
    };
    let outcome = service
        .delete_by_combined_criteria(&criteria)
        .await
        .expect("Combined deletion should succeed");

    assert_eq!(outcome.filters, vec!["event_id", "user_id", "group_id"]);
    assert_eq!(outcome.count, 5);
    assert!(outcome.success);
    assert_eq!(outcome.error, None);

    let filters = store.recorded_filters();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].get_object_id("_id").unwrap(), event_id);
    assert_eq!(filters[0].get_str("user_id").unwrap(), "user-1");
    assert_eq!(filters[0].get_str("group_id").unwrap(), "group-1");
}

#[tokio::test]
async fn test_combined_criteria_skips_magic_all() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 1));
    let service = service_over(&store);

    let criteria = CombinedDeleteCriteria {
        event_id: Some(MAGIC_ALL.to_string()),
        user_id: Some("user-1".to_string()),
        group_id: None,
    };
    let outcome = service
        .delete_by_combined_criteria(&criteria)
        .await
        .expect("Combined deletion should succeed");

    assert_eq!(outcome.filters, vec!["user_id"]);
    assert_eq!(store.recorded_filters(), vec![doc! { "user_id": "user-1" }]);
}

#[tokio::test]
async fn test_combined_criteria_invalid_event_id_fails_without_store_call() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 1));
    let service = service_over(&store);

    let criteria = CombinedDeleteCriteria {
        event_id: Some("not-hex".to_string()),
        user_id: Some("user-1".to_string()),
        group_id: None,
    };
    let outcome = service
        .delete_by_combined_criteria(&criteria)
        .await
        .expect("An invalid id is a failed outcome, not an Err");

    assert!(!outcome.success);
    assert_eq!(outcome.count, 0);
    assert!(outcome.filters.is_empty());
    assert_eq!(
        outcome.error.as_deref(),
        Some("Invalid event_id format: not-hex")
    );
    assert!(store.recorded_filters().is_empty());
}

#[tokio::test]
async fn test_combined_criteria_requires_an_effective_criterion() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 1));
    let service = service_over(&store);

    let criteria = CombinedDeleteCriteria {
        event_id: Some(MAGIC_ALL.to_string()),
        user_id: Some(String::new()),
        group_id: None,
    };
    let outcome = service
        .delete_by_combined_criteria(&criteria)
        .await
        .expect("Empty criteria are a failed outcome, not an Err");

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("No deletion criteria provided"));
    assert!(store.recorded_filters().is_empty());
}

#[tokio::test]
async fn test_combined_criteria_zero_count_is_not_success() {
    let store = Arc::new(RecordingMemCellStore::with_results(false, 0));
    let service = service_over(&store);

    let criteria = CombinedDeleteCriteria {
        event_id: None,
        user_id: None,
        group_id: Some("group-without-cells".to_string()),
    };
    let outcome = service
        .delete_by_combined_criteria(&criteria)
        .await
        .expect("Combined deletion should succeed");

    assert!(!outcome.success);
    assert_eq!(outcome.count, 0);
    assert_eq!(outcome.error, None);
    assert_eq!(outcome.filters, vec!["group_id"]);
}

#[tokio::test]
async fn test_store_failures_propagate() {
    let service = MemCellDeleteService::new(Arc::new(FailingMemCellStore));

    let by_event = service
        .delete_by_event_id(&ObjectId::new().to_hex(), None)
        .await;
    assert!(matches!(by_event, Err(MemCellError::Mongo(_))));

    let by_user = service.delete_by_user_id("user-1", None).await;
    assert!(matches!(by_user, Err(MemCellError::Mongo(_))));

    let combined = service
        .delete_by_combined_criteria(&CombinedDeleteCriteria {
            event_id: None,
            user_id: None,
            group_id: Some("group-1".to_string()),
        })
        .await;
    assert!(matches!(combined, Err(MemCellError::Mongo(_))));
}
