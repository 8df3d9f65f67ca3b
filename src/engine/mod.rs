//! Automated recycling engine: rule evaluation, the daily cycle runner, and
//! the scheduler that fires it.

pub mod clock;
pub mod evaluator;
pub mod router;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use clock::{Clock, SystemClock};
pub use evaluator::{evaluate, Decision, WarnRule};
pub use router::recycle_router;
pub use runner::{RecycleCycle, RecycleOutcome};
pub use scheduler::{RecycleScheduler, SchedulerConfig};
