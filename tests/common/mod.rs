//! Common test utilities

use std::sync::Mutex;

use async_trait::async_trait;
use memvault_persistence::request_log::{MemoryRequestLog, MemoryRequestLogStore, RequestLogError};
use memvault_persistence::RequestHistoryEvent;

/// Request-log store keeping saved documents in memory.
#[derive(Default)]
pub struct RecordingRequestLogStore {
    saved: Mutex<Vec<MemoryRequestLog>>,
    fail: bool,
}

impl RecordingRequestLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose saves always fail with a driver error.
    #[allow(dead_code)] // Test utility for integration tests
    pub fn failing() -> Self {
        Self {
            saved: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Snapshot of everything saved so far.
    pub fn saved(&self) -> Vec<MemoryRequestLog> {
        self.saved.lock().expect("Lock poisoned").clone()
    }
}

#[async_trait]
impl MemoryRequestLogStore for RecordingRequestLogStore {
    async fn save(&self, log: &MemoryRequestLog) -> Result<(), RequestLogError> {
        if self.fail {
            return Err(RequestLogError::Mongo(mongodb::error::Error::custom(
                "save failed",
            )));
        }
        self.saved.lock().expect("Lock poisoned").push(log.clone());
        Ok(())
    }
}

/// A POST request-history event against the given URL.
pub fn memories_event(url: &str, body: Option<&str>) -> RequestHistoryEvent {
    let mut event = RequestHistoryEvent::new("POST", url);
    if let Some(body) = body {
        event = event.with_body(body);
    }
    event
}
