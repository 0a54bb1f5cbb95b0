//! # Blogsync Infrastructure
//!
//! Concrete implementations of the ports defined in `blogsync-core`:
//! storage backends, content sources and sync gates.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL storage via SeaORM
//! - `redis` - Redis-backed sync gate

pub mod database;
pub mod gate;
pub mod source;
pub mod storage;

// Re-exports - In-Memory
pub use gate::InMemorySyncGate;
pub use source::JsonDirectorySource;
pub use storage::InMemoryStorage;

// Re-exports - Postgres
#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, DatabaseConnections, PostgresBlogStorage};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use gate::{RedisConfig, RedisSyncGate};
