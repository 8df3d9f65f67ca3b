//! Time source abstraction so daily-run semantics are testable without
//! wall-clock waits.

use chrono::{DateTime, FixedOffset, Local, Utc};

/// Provides the current instant, in UTC for event keys and stamps and in the
/// deployment's local zone for the scheduler window check.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_local(&self) -> DateTime<FixedOffset>;
}

/// Production clock reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_local(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}
