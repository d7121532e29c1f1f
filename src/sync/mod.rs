pub mod engine;

pub use engine::{SyncEngine, SyncError, SyncOutcome, SyncReport, SyncState};
