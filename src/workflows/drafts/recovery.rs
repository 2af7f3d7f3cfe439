use chrono::{DateTime, Duration, Utc};

use super::domain::{DeleteReason, DraftError, DraftRecord, DraftStatus};

/// Marks drafts deleted, restores them within the recovery window, and
/// computes remaining recovery time for read-side collaborators.
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    recovery_window: Duration,
    inactivity_window: Duration,
}

impl RecoveryManager {
    pub fn new(recovery_window: Duration, inactivity_window: Duration) -> Self {
        Self {
            recovery_window,
            inactivity_window,
        }
    }

    /// Soft-delete an active draft. A second delete is a strict
    /// `AlreadyDeleted` error rather than a no-op, so the session that lost
    /// a race gets the same signal a concurrent modification would give.
    pub fn soft_delete(
        &self,
        record: &DraftRecord,
        reason: DeleteReason,
        now: DateTime<Utc>,
    ) -> Result<DraftRecord, DraftError> {
        if record.status.is_deleted() {
            return Err(DraftError::AlreadyDeleted);
        }

        let mut updated = record.clone();
        updated.status = DraftStatus::Deleted { at: now, reason };
        updated.last_edited_at = now;
        updated.expires_at = None;
        Ok(updated)
    }

    /// Restore a deleted draft while the recovery window is open.
    ///
    /// The window is inclusive: restore at exactly `deleted_at + window`
    /// still succeeds. Past that the failure is a policy denial, distinct
    /// from the record being gone entirely; the record may well still exist
    /// until the cleanup worker's next pass.
    pub fn restore(&self, record: &DraftRecord, now: DateTime<Utc>) -> Result<DraftRecord, DraftError> {
        let deleted_at = match record.status {
            DraftStatus::Active => return Err(DraftError::NotDeleted),
            DraftStatus::Deleted { at, .. } => at,
        };

        let expires = deleted_at + self.recovery_window;
        if now > expires {
            return Err(DraftError::RecoveryWindowExpired { expired_at: expires });
        }

        let mut updated = record.clone();
        updated.status = DraftStatus::Active;
        updated.last_edited_at = now;
        updated.expires_at = Some(now + self.inactivity_window);
        Ok(updated)
    }

    /// Time left before a deleted draft stops being restorable. `None` for
    /// active drafts. Display guidance only; the cleanup worker recomputes
    /// the hard-delete decision from the stored timestamp independently.
    pub fn remaining_recovery_time(
        &self,
        record: &DraftRecord,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let deleted_at = record.status.deleted_at()?;
        let remaining = deleted_at + self.recovery_window - now;
        Some(remaining.max(Duration::zero()))
    }
}
