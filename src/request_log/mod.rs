//! Persistence of memories API request history.
//!
//! A [`MemoryRequestLogListener`] subscribes to request-history events,
//! filters for requests against the memories API, pulls the interesting
//! fields out of the URL, headers and JSON body, and writes one
//! [`MemoryRequestLog`] document per request through a
//! [`MemoryRequestLogStore`].

pub mod document;
mod extract;
pub mod listener;
pub mod store;

pub use document::MemoryRequestLog;
pub use listener::MemoryRequestLogListener;
pub use store::{
    MemoryRequestLogStore, MongoMemoryRequestLogStore, RequestLogError, REQUEST_LOG_COLLECTION,
};
