//! Persistence layer: one profile record per chat identity.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlProfileStore;
pub use memory::MemoryProfileStore;
pub use traits::ProfileStore;
