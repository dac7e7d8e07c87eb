//! Filter-based soft deletion of memory cells.

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::Document;
use serde::Serialize;
use tracing::{error, info, warn};

use super::store::{MemCellError, MemCellStore};

/// Sentinel meaning "no constraint" for a combined-criteria field.
pub const MAGIC_ALL: &str = "__ALL__";

/// Constraints for [`MemCellDeleteService::delete_by_combined_criteria`].
///
/// A field is skipped when it is `None`, empty, or [`MAGIC_ALL`].
#[derive(Debug, Clone, Default)]
pub struct CombinedDeleteCriteria {
    pub event_id: Option<String>,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
}

/// Result of a combined-criteria deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedDeleteOutcome {
    /// Names of the criteria that were applied.
    pub filters: Vec<String>,
    /// Number of cells marked deleted.
    pub count: u64,
    /// True when at least one cell was deleted.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CombinedDeleteOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            filters: Vec::new(),
            count: 0,
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Soft-delete facade over a [`MemCellStore`].
///
/// Every operation logs begin and outcome. Store failures are logged and
/// propagated to the caller.
pub struct MemCellDeleteService {
    store: Arc<dyn MemCellStore>,
}

impl MemCellDeleteService {
    #[must_use]
    pub fn new(store: Arc<dyn MemCellStore>) -> Self {
        info!("MemCellDeleteService initialized");
        Self { store }
    }

    /// Soft delete the single cell whose id hex is `event_id`.
    ///
    /// Returns `false` when the cell is missing or already deleted. An
    /// invalid id hex is an `Err`.
    pub async fn delete_by_event_id(
        &self,
        event_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<bool, MemCellError> {
        info!("Deleting MemCell by event_id: event_id={event_id}, deleted_by={deleted_by:?}");
        match self.store.soft_delete_by_event_id(event_id, deleted_by).await {
            Ok(true) => {
                info!(
                    "Successfully deleted MemCell: event_id={event_id}, deleted_by={deleted_by:?}"
                );
                Ok(true)
            }
            Ok(false) => {
                warn!("MemCell not found or already deleted: event_id={event_id}");
                Ok(false)
            }
            Err(cause) => {
                error!("Failed to delete MemCell by event_id: event_id={event_id}, error={cause}");
                Err(cause)
            }
        }
    }

    /// Soft delete every live cell belonging to `user_id`, returning the
    /// count.
    pub async fn delete_by_user_id(
        &self,
        user_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        info!("Deleting MemCells by user_id: user_id={user_id}, deleted_by={deleted_by:?}");
        match self.store.soft_delete_by_user_id(user_id, deleted_by).await {
            Ok(count) => {
                info!(
                    "Successfully deleted MemCells by user_id: user_id={user_id}, deleted_by={deleted_by:?}, count={count}"
                );
                Ok(count)
            }
            Err(cause) => {
                error!("Failed to delete MemCells by user_id: user_id={user_id}, error={cause}");
                Err(cause)
            }
        }
    }

    /// Soft delete every live cell in `group_id`, returning the count.
    pub async fn delete_by_group_id(
        &self,
        group_id: &str,
        deleted_by: Option<&str>,
    ) -> Result<u64, MemCellError> {
        info!("Deleting MemCells by group_id: group_id={group_id}, deleted_by={deleted_by:?}");
        match self.store.soft_delete_by_group_id(group_id, deleted_by).await {
            Ok(count) => {
                info!(
                    "Successfully deleted MemCells by group_id: group_id={group_id}, deleted_by={deleted_by:?}, count={count}"
                );
                Ok(count)
            }
            Err(cause) => {
                error!("Failed to delete MemCells by group_id: group_id={group_id}, error={cause}");
                Err(cause)
            }
        }
    }

    /// Soft delete the cells matching every effective criterion at once.
    ///
    /// A malformed event id and an empty criteria set both yield a failed
    /// outcome rather than an `Err`; store failures still propagate.
    pub async fn delete_by_combined_criteria(
        &self,
        criteria: &CombinedDeleteCriteria,
    ) -> Result<CombinedDeleteOutcome, MemCellError> {
        let mut filter = Document::new();
        let mut filters_used = Vec::new();

        if let Some(event_id) = effective(criteria.event_id.as_deref()) {
            match ObjectId::parse_str(event_id) {
                Ok(id) => {
                    filter.insert("_id", id);
                    filters_used.push("event_id".to_string());
                }
                Err(cause) => {
                    error!("Invalid event_id format: {event_id}, error: {cause}");
                    return Ok(CombinedDeleteOutcome::failed(format!(
                        "Invalid event_id format: {event_id}"
                    )));
                }
            }
        }
        if let Some(user_id) = effective(criteria.user_id.as_deref()) {
            filter.insert("user_id", user_id);
            filters_used.push("user_id".to_string());
        }
        if let Some(group_id) = effective(criteria.group_id.as_deref()) {
            filter.insert("group_id", group_id);
            filters_used.push("group_id".to_string());
        }

        if filter.is_empty() {
            warn!("No deletion criteria provided (all are MAGIC_ALL)");
            return Ok(CombinedDeleteOutcome::failed("No deletion criteria provided"));
        }

        info!("Deleting MemCells with combined criteria: filters={filters_used:?}");
        match self.store.soft_delete_by_filter(filter, None).await {
            Ok(count) => {
                info!("Successfully deleted MemCells: filters={filters_used:?}, count={count}");
                Ok(CombinedDeleteOutcome {
                    filters: filters_used,
                    count,
                    success: count > 0,
                    error: None,
                })
            }
            Err(cause) => {
                error!(
                    "Failed to delete MemCells with combined criteria: filters={filters_used:?}, error={cause}"
                );
                Err(cause)
            }
        }
    }
}

fn effective(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty() && *text != MAGIC_ALL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_passes_plain_values() {
        assert_eq!(effective(Some("user_123")), Some("user_123"));
    }

    #[test]
    fn test_effective_skips_none_empty_and_magic_all() {
        assert_eq!(effective(None), None);
        assert_eq!(effective(Some("")), None);
        assert_eq!(effective(Some(MAGIC_ALL)), None);
    }

    #[test]
    fn test_failed_outcome_shape() {
        let outcome = CombinedDeleteOutcome::failed("No deletion criteria provided");
        assert!(outcome.filters.is_empty());
        assert_eq!(outcome.count, 0);
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("No deletion criteria provided")
        );
    }

    #[test]
    fn test_outcome_serializes_without_error_field_on_success() {
        let outcome = CombinedDeleteOutcome {
            filters: vec!["user_id".to_string()],
            count: 3,
            success: true,
            error: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["filters"], serde_json::json!(["user_id"]));
        assert_eq!(json["count"], 3);
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }
}
