//! Infrastructure adapters for the Dolimirror client core.
//!
//! Implements the application ports: SQLite and in-memory local stores,
//! the reqwest-based remote gateway, and the HTTP connectivity probe.

#![forbid(unsafe_code)]

mod http_connectivity_probe;
mod http_remote_gateway;
mod in_memory_local_store;
mod sqlite_local_store;

pub use http_connectivity_probe::HttpConnectivityProbe;
pub use http_remote_gateway::HttpRemoteGateway;
pub use in_memory_local_store::InMemoryLocalStore;
pub use sqlite_local_store::SqliteLocalStore;
