//! The persisted request-log record.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::datetime::now_with_timezone;
use crate::events::RequestHistoryEvent;

use super::extract;

/// One captured memories API request.
///
/// Keeps the raw body both parsed (`raw_input`) and verbatim
/// (`raw_input_str`) alongside the extracted identifiers, the message core
/// fields, and the request metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRequestLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Conversation group the request belongs to.
    pub group_id: String,
    /// Request id from the headers, falling back to the event id.
    pub request_id: String,
    pub user_id: Option<String>,

    // Message core fields
    pub message_id: Option<String>,
    pub message_create_time: Option<String>,
    pub sender: Option<String>,
    pub sender_name: Option<String>,
    pub content: Option<String>,
    pub group_name: Option<String>,
    pub refer_list: Option<Vec<String>>,

    // Raw input, kept for debugging
    pub raw_input: Option<Value>,
    pub raw_input_str: Option<String>,

    // Request metadata
    pub version: Option<String>,
    pub endpoint_name: Option<String>,
    pub method: String,
    pub url: String,

    // Tenant scope
    pub organization_id: Option<String>,
    pub space_id: Option<String>,

    /// Id of the event this record was extracted from.
    pub event_id: String,
    pub created_at: bson::DateTime,
}

impl MemoryRequestLog {
    /// Build a record from a memories request event.
    ///
    /// Returns `None` when no group id can be extracted; such requests are
    /// not worth recording. The request id falls back to the event id, then
    /// to `"unknown"`.
    #[must_use]
    pub fn from_event(event: &RequestHistoryEvent) -> Option<Self> {
        let parsed_body = extract::parse_body(event.body.as_deref());
        let group_id = extract::group_id(&event.url, parsed_body.as_ref())?;
        let request_id = extract::request_id(&event.headers)
            .or_else(|| (!event.event_id.is_empty()).then(|| event.event_id.clone()))
            .unwrap_or_else(|| "unknown".to_string());
        let user_id = extract::user_id(&event.url, parsed_body.as_ref(), &event.headers);
        let (organization_id, space_id) = extract::tenant(&event.headers);
        let fields = extract::message_fields(parsed_body.as_ref());

        Some(Self {
            id: None,
            group_id,
            request_id,
            user_id,
            message_id: fields.message_id,
            message_create_time: fields.message_create_time,
            sender: fields.sender,
            sender_name: fields.sender_name,
            content: fields.content,
            group_name: fields.group_name,
            refer_list: fields.refer_list,
            raw_input: parsed_body,
            raw_input_str: event.body.clone(),
            version: event.version.clone(),
            endpoint_name: event.endpoint_name.clone(),
            method: event.method.clone(),
            url: event.url.clone(),
            organization_id,
            space_id,
            event_id: event.event_id.clone(),
            created_at: bson::DateTime::from_chrono(now_with_timezone()),
        })
    }
}
