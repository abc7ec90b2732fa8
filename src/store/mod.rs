//! Persistence layer: libSQL-backed storage for trainer profiles, their
//! side records and client engagement events.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::ProfileStore;
