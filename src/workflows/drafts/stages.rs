use chrono::{DateTime, Duration, Utc};

use super::domain::{DraftError, DraftRecord, DraftStage};

/// Enforces the fixed stage progression and stamps transition timestamps.
///
/// The engine mutates a copy of the record; persistence happens in the
/// service through a single conditional write so concurrent sessions
/// surface as `ConcurrentModification` instead of lost updates.
#[derive(Debug, Clone)]
pub struct StageTransitionEngine {
    inactivity_window: Duration,
}

impl StageTransitionEngine {
    pub fn new(inactivity_window: Duration) -> Self {
        Self { inactivity_window }
    }

    /// Move an active draft to the next stage.
    ///
    /// Completion timestamps are stamped only on the first transition past a
    /// stage, so a retried call never rewrites history.
    pub fn advance(&self, record: &DraftRecord, now: DateTime<Utc>) -> Result<DraftRecord, DraftError> {
        if record.status.is_deleted() {
            return Err(DraftError::AlreadyDeleted);
        }

        let next = record
            .stage
            .next()
            .ok_or(DraftError::InvalidTransition { from: record.stage })?;

        let mut updated = record.clone();
        match record.stage {
            DraftStage::Intake if updated.intake_completed_at.is_none() => {
                updated.intake_completed_at = Some(now);
            }
            DraftStage::Fieldwork if updated.fieldwork_completed_at.is_none() => {
                updated.fieldwork_completed_at = Some(now);
            }
            _ => {}
        }

        updated.stage = next;
        self.touch(&mut updated, now);
        Ok(updated)
    }

    /// Administrative override for trusted internal callers (e.g. correcting
    /// a bad upload). Bypasses monotonicity but still re-stamps the edit
    /// time, and never un-stamps completion timestamps.
    pub fn set_stage(
        &self,
        record: &DraftRecord,
        target: DraftStage,
        now: DateTime<Utc>,
    ) -> Result<DraftRecord, DraftError> {
        if record.status.is_deleted() {
            return Err(DraftError::AlreadyDeleted);
        }

        let mut updated = record.clone();
        updated.stage = target;
        self.touch(&mut updated, now);
        Ok(updated)
    }

    fn touch(&self, record: &mut DraftRecord, now: DateTime<Utc>) {
        record.last_edited_at = now;
        record.expires_at = Some(now + self.inactivity_window);
    }
}
