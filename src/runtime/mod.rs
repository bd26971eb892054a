pub mod scheduler;
pub mod selection;
pub mod sync_engine;

pub use scheduler::{Scheduler, SchedulerHandle};
pub use selection::{Revalidation, SelectionCoordinator};
pub use sync_engine::{RefreshOutcome, RefreshTrigger, SyncEngine, SyncError};
