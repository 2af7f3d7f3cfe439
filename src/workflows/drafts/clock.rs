use chrono::{DateTime, Utc};

/// Time source injected into lifecycle code so policy windows can be
/// exercised with simulated clocks instead of waiting out real hours.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used by the serving binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
