// Storage layer for the marketplace control-plane
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// - Database: PostgreSQL repositories with sqlx, schema under ./migrations
// - InMemoryDatabase: parking_lot-guarded maps with the same API
// - StorageBackend: enum dispatch over the two

pub mod backend;
pub mod error;
pub mod memory;
pub mod models;
pub mod repositories;

pub use backend::StorageBackend;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::Database;
