pub mod scheduler;
pub mod store;

pub use scheduler::{
    DEFAULT_QUALITY_CEILING, DEFAULT_QUEUE_CAPACITY, QueueOverview, Scheduler, SchedulerError,
    SchedulerSettings, Submitted, TaskView,
};
pub use store::{PendingQueue, QueueError};
