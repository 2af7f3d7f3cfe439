use chrono::Duration;

/// Tunable windows and bounds governing the draft lifecycle.
///
/// Defaults match the portal's product rules: a 48 hour recovery window
/// after deletion, expiry after 30 days without edits, daily cleanup in
/// pages of 100 records capped at 10 pages per run, and five drafts shown
/// in the library view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub recovery_window: Duration,
    pub inactivity_window: Duration,
    pub cleanup_cadence: Duration,
    pub batch_size: usize,
    pub max_batches_per_run: usize,
    pub active_display_cap: usize,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            recovery_window: Duration::hours(48),
            inactivity_window: Duration::days(30),
            cleanup_cadence: Duration::hours(24),
            batch_size: 100,
            max_batches_per_run: 10,
            active_display_cap: 5,
        }
    }
}
