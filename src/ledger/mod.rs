/// In-memory task ledger: task records, the task store, and retention pruning
///
/// The ledger is the single source of truth for task state. It keeps no
/// state across restarts; every record lives in process memory and each task
/// owns exactly one directory under the download root.
///
/// ## Lifecycle
///
/// `queued → processing → completed | error`, driven exclusively by the
/// scheduler. Terminal records are only ever deleted, either by an explicit
/// cancel or by the [`Reaper`] once they outlive the retention window
/// (2 hours by default).
///
/// ## Usage
///
/// ```rust,ignore
/// use vidbox::ledger::TaskStore;
///
/// let mut store = TaskStore::new();
/// let id = store.create("https://youtu.be/abc", 720)?;
/// store.update(&id, |record| record.start())?;
/// ```

pub mod error;
pub mod pruning;
pub mod record;
pub mod store;

pub use error::{LedgerError, Result};
pub use pruning::{
    DEFAULT_RETENTION_HOURS, DEFAULT_SWEEP_INTERVAL_SECS, PruneStats, Reaper, remove_task_dir,
};
pub use record::{TaskRecord, TaskResult, TaskStatus, checkpoint};
pub use store::TaskStore;
