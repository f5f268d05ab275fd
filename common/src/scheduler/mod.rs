// Scheduler module: per-event recurring poll jobs

pub mod engine;
pub mod poll;

pub use engine::{JobScheduler, SchedulerConfig};
pub use poll::{PollTask, TickOutcome};
