//! Services - the sync and query workflows built on the ports.

mod change_set;
mod query;
mod sync;

pub use change_set::{ChangeSet, diff};
pub use query::QueryService;
pub use sync::{
    BlogSyncOutcome, BlogSyncSummary, SyncConfig, SyncReport, SyncService, SyncStatus,
    TransformFailure,
};
