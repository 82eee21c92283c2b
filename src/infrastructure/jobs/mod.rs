pub mod sync_scheduler;

pub use sync_scheduler::{delay_after, ScheduleIntervals, SchedulerCommand, SyncScheduler};
