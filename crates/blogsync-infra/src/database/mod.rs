//! PostgreSQL storage - connection management, entities and the
//! repository implementing both storage contracts.

#[cfg(feature = "postgres")]
mod connections;

#[cfg(feature = "postgres")]
pub mod entity;

#[cfg(feature = "postgres")]
mod postgres_repo;

#[cfg(feature = "postgres")]
pub use connections::{DatabaseConfig, DatabaseConnections};

#[cfg(feature = "postgres")]
pub use postgres_repo::PostgresBlogStorage;

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
