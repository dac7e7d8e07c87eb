//! Request-history events and the listeners that consume them.
//!
//! The HTTP layer publishes a [`RequestHistoryEvent`] for every handled
//! request. Listeners react out of band; a listener failure is logged and
//! never fails the request path.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// One handled HTTP request, as seen by the history machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHistoryEvent {
    /// Unique id of the event, a UUID v4 when generated locally.
    pub event_id: String,
    /// HTTP method of the request.
    pub method: String,
    /// Full request URL, possibly relative.
    pub url: String,
    /// Request headers as sent.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Raw request body, when one was captured.
    #[serde(default)]
    pub body: Option<String>,
    /// API version the request targeted.
    #[serde(default)]
    pub version: Option<String>,
    /// Name of the endpoint that handled the request.
    #[serde(default)]
    pub endpoint_name: Option<String>,
    /// When the request was handled.
    pub occurred_at: DateTime<Utc>,
}

impl RequestHistoryEvent {
    /// New event for a request, stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            version: None,
            endpoint_name: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attach a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach the raw request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach the API version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Attach the handling endpoint's name.
    #[must_use]
    pub fn with_endpoint_name(mut self, endpoint_name: impl Into<String>) -> Self {
        self.endpoint_name = Some(endpoint_name.into());
        self
    }
}

/// A consumer of request-history events.
///
/// Listeners that have nothing to say about an event return `Ok(())`.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn on_event(&self, event: &RequestHistoryEvent) -> Result<()>;
}

/// Fans events out to registered listeners.
///
/// Listeners run in registration order. A failing listener is logged and
/// skipped; it never stops the others or the caller.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for all future events.
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Deliver an event to every registered listener.
    pub async fn publish(&self, event: &RequestHistoryEvent) {
        for listener in &self.listeners {
            if let Err(error) = listener.on_event(event).await {
                warn!("Event listener failed for event {}: {error:#}", event.event_id);
            }
        }
    }
}
