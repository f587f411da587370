//! Append-only event store boundary.
//!
//! Tenant-scoped event streams with no storage assumptions; the in-memory
//! implementation backs both the service and the tests.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
