//! PostgreSQL persistence layer for AssetFlow.
//!
//! Provides the connection pool helper, embedded migrations, and the entity
//! models used by the directory sync core.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::connect;
