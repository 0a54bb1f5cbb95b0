//! Sync gate implementations - Redis and in-memory.

mod memory;

#[cfg(feature = "redis")]
mod redis;

pub use memory::InMemorySyncGate;

#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisSyncGate};
