//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that sources, storage backends and
//! transforms must implement.

mod source;
mod storage;
mod sync_gate;
mod transform;

pub use source::{BlogSource, SourceData};
pub use storage::{
    StorageQueryRepository, StorageSyncRepository, count_months, count_tags, listing_order,
};
pub use sync_gate::{GateError, SyncGate};
pub use transform::{Transform, TransformPipeline};
