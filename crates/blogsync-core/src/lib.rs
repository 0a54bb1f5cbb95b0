//! # Blogsync Core
//!
//! The domain layer of blogsync.
//! This crate contains the change-set engine, the sync orchestrator, the
//! query service and the contracts (ports) that sources and storage
//! backends implement. It has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod transforms;

pub use domain::BlogKey;
pub use error::{DomainError, QueryError, RepoError, SourceError, SyncError, TransformError};
