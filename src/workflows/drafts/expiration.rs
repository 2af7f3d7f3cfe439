use chrono::{DateTime, Duration, Utc};

use super::domain::{DeleteReason, DraftRecord};
use super::recovery::RecoveryManager;

/// Decides when an untouched draft has gone stale and converts it to a
/// soft-deleted record, preserving the recovery grace period.
///
/// Staleness is always recomputed from `last_edited_at`; the advisory
/// `expires_at` field is never consulted, so a drifted advisory value
/// cannot expire a draft early.
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    inactivity_window: Duration,
    recovery: RecoveryManager,
}

impl ExpirationPolicy {
    pub fn new(inactivity_window: Duration, recovery: RecoveryManager) -> Self {
        Self {
            inactivity_window,
            recovery,
        }
    }

    pub fn is_stale(&self, record: &DraftRecord, now: DateTime<Utc>) -> bool {
        !record.status.is_deleted() && now - record.last_edited_at >= self.inactivity_window
    }

    /// Returns the soft-deleted version of a stale draft, tagged with the
    /// system reason, or `None` when the draft is current or already gone.
    pub fn apply_expiration(
        &self,
        record: &DraftRecord,
        now: DateTime<Utc>,
    ) -> Option<DraftRecord> {
        if !self.is_stale(record, now) {
            return None;
        }

        self.recovery
            .soft_delete(record, DeleteReason::Inactivity, now)
            .ok()
    }
}
