//! Listener persisting memories API requests.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, error};

use crate::events::{EventListener, RequestHistoryEvent};

use super::document::MemoryRequestLog;
use super::extract;
use super::store::MemoryRequestLogStore;

/// Characters of message content echoed into the debug log.
const CONTENT_PREVIEW_CHARS: usize = 50;

/// Watches request-history events and records memories API requests.
///
/// Storage failures are logged at error level and swallowed; recording a
/// request must never fail the request itself.
pub struct MemoryRequestLogListener {
    store: Arc<dyn MemoryRequestLogStore>,
}

impl MemoryRequestLogListener {
    #[must_use]
    pub fn new(store: Arc<dyn MemoryRequestLogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventListener for MemoryRequestLogListener {
    async fn on_event(&self, event: &RequestHistoryEvent) -> Result<()> {
        if !extract::is_memories_request(&event.url) {
            debug!("Skipping non-memories request: url={}", event.url);
            return Ok(());
        }
        let Some(log) = MemoryRequestLog::from_event(event) else {
            debug!("Memories request without group_id, skipping: url={}", event.url);
            return Ok(());
        };
        match self.store.save(&log).await {
            Ok(()) => {
                let preview: String = log
                    .content
                    .as_deref()
                    .unwrap_or_default()
                    .chars()
                    .take(CONTENT_PREVIEW_CHARS)
                    .collect();
                debug!(
                    "Saved memories request log: group_id={}, request_id={}, message_id={:?}, content_preview={preview}",
                    log.group_id, log.request_id, log.message_id
                );
            }
            Err(cause) => {
                error!("Failed to save memories request log: url={}, error={cause}", event.url);
            }
        }
        Ok(())
    }
}
