//! Domain model (IDs, tasks, jobs, scheduler events, conflict sets, errors).

pub mod conflict;
pub mod errors;
pub mod events;
pub mod ids;
pub mod job;
pub mod task;

pub use conflict::{ConflictSet, ConflictSubject};
pub use errors::{QueryFailure, SchedulerError, SchedulerFault};
pub use events::{OptionGroup, OptionsResult, OverlapResult, ResponseKind, SchedulerEvent};
pub use ids::{JobId, RequestHandle, TaskId};
pub use job::Job;
pub use task::{Task, TaskKind};
