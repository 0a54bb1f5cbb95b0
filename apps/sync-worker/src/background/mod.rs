//! Background processing - scheduled sync passes.

#[cfg(feature = "scheduler")]
mod scheduler;

#[cfg(feature = "scheduler")]
pub use scheduler::SyncScheduler;
