//! Field extraction from memories API requests.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::datetime::{to_iso_format, TimeValue};

/// Path prefix identifying requests to the memories API.
pub const MEMORIES_PATH_PREFIX: &str = "/api/v1/memories";

/// Base used to resolve server-relative request URLs.
const RELATIVE_BASE: &str = "http://localhost";

/// Parse an absolute or server-relative request URL.
pub fn parse_url(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(parsed) => Some(parsed),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_BASE).ok()?.join(raw).ok()
        }
        Err(_) => None,
    }
}

/// True when the URL path targets the memories API.
///
/// The query string and host are ignored; URLs that do not parse are not
/// memories requests.
pub fn is_memories_request(url: &str) -> bool {
    parse_url(url).is_some_and(|parsed| parsed.path().starts_with(MEMORIES_PATH_PREFIX))
}

/// Parse a request body as JSON, leniently.
///
/// Missing, blank, and non-JSON bodies all yield `None`.
pub fn parse_body(body: Option<&str>) -> Option<Value> {
    let text = body?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(parsed) => Some(parsed),
        Err(error) => {
            debug!("Request body is not JSON: {error}");
            None
        }
    }
}

/// First non-empty value of a query parameter.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, value)| key.as_ref() == name && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}

/// Case-insensitive header lookup, skipping empty values.
pub fn header_value(headers: &HashMap<String, String>, name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(key, value)| key.eq_ignore_ascii_case(name) && !value.is_empty())
        .map(|(_, value)| value.clone())
}

/// Render a JSON id-like value as a string.
///
/// Non-empty strings pass through, non-zero numbers render; empty
/// strings, zeroes, and other shapes do not identify anything.
pub fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => (!text.is_empty()).then(|| text.clone()),
        Value::Number(number) => (number.as_f64() != Some(0.0)).then(|| number.to_string()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Group id of a request: body `group_id` first, then the query string.
pub fn group_id(url: &str, body: Option<&Value>) -> Option<String> {
    body.and_then(|parsed| parsed.get("group_id"))
        .and_then(id_value)
        .or_else(|| parse_url(url).and_then(|parsed| query_param(&parsed, "group_id")))
}

/// User id of a request: body `user_id`, body `sender`, the query string,
/// then the `X-User-Id` header.
pub fn user_id(
    url: &str,
    body: Option<&Value>,
    headers: &HashMap<String, String>,
) -> Option<String> {
    body.and_then(|parsed| parsed.get("user_id"))
        .and_then(id_value)
        .or_else(|| body.and_then(|parsed| parsed.get("sender")).and_then(id_value))
        .or_else(|| parse_url(url).and_then(|parsed| query_param(&parsed, "user_id")))
        .or_else(|| header_value(headers, "X-User-Id"))
}

/// Request id from the `X-Request-Id` header.
pub fn request_id(headers: &HashMap<String, String>) -> Option<String> {
    header_value(headers, "X-Request-Id")
}

/// Tenant identifiers `(organization_id, space_id)` from the headers.
pub fn tenant(headers: &HashMap<String, String>) -> (Option<String>, Option<String>) {
    (
        header_value(headers, "X-Organization-Id"),
        header_value(headers, "X-Space-Id"),
    )
}

/// Message core fields pulled out of a memorize request body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MessageFields {
    pub message_id: Option<String>,
    pub message_create_time: Option<String>,
    pub sender: Option<String>,
    pub sender_name: Option<String>,
    pub content: Option<String>,
    pub group_name: Option<String>,
    pub refer_list: Option<Vec<String>>,
}

/// The object message fields are read from: the first element of a
/// `messages` array when it is an object, otherwise the body itself.
fn message_source(body: &Value) -> &Value {
    body.get("messages")
        .and_then(|messages| messages.get(0))
        .filter(|first| first.is_object())
        .unwrap_or(body)
}

/// Extract the message core fields from a parsed request body.
///
/// `create_time` is normalized to an ISO 8601 string in the service
/// timezone; an unusable value is dropped rather than failing the
/// extraction.
pub fn message_fields(body: Option<&Value>) -> MessageFields {
    let Some(body) = body else {
        return MessageFields::default();
    };
    let source = message_source(body);
    let create_time = source.get("create_time").and_then(TimeValue::from_json);
    let message_create_time = to_iso_format(create_time.as_ref()).unwrap_or_else(|error| {
        debug!("Unusable message create_time: {error}");
        None
    });
    MessageFields {
        message_id: source.get("message_id").and_then(id_value),
        message_create_time,
        sender: source.get("sender").and_then(id_value),
        sender_name: source.get("sender_name").and_then(id_value),
        content: source.get("content").and_then(id_value),
        group_name: source.get("group_name").and_then(id_value),
        refer_list: source
            .get("refer_list")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(id_value).collect()),
    }
}
