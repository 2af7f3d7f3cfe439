use std::sync::Arc;

use serde::Serialize;

use super::clock::Clock;
use super::domain::{DraftError, DraftRecord, OwnerId};
use super::recovery::RecoveryManager;
use super::repository::DraftRepository;

/// Active drafts for the library view. `items` is capped for display;
/// `total_count` always reflects the owner's full active set so the client
/// can render an overflow indicator.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveDrafts {
    pub items: Vec<DraftRecord>,
    pub total_count: usize,
}

/// A soft-deleted draft still inside its recovery window, annotated with
/// the time left to restore it.
#[derive(Debug, Clone, Serialize)]
pub struct RecoverableDraft {
    #[serde(flatten)]
    pub draft: DraftRecord,
    pub remaining_recovery_seconds: i64,
}

/// Read-side facade over the draft store: the owner's working set and the
/// recoverable trash view. Query-only; every mutation goes through the
/// service.
pub struct DraftLibrary<R> {
    repository: Arc<R>,
    recovery: RecoveryManager,
    display_cap: usize,
}

impl<R> DraftLibrary<R>
where
    R: DraftRepository,
{
    pub(crate) fn new(repository: Arc<R>, recovery: RecoveryManager, display_cap: usize) -> Self {
        Self {
            repository,
            recovery,
            display_cap,
        }
    }

    /// Most recently edited drafts first, capped at the display limit.
    /// The cap trims the page only; drafts beyond it stay fully editable
    /// and are still counted in `total_count`.
    pub fn list_active(&self, owner: &OwnerId) -> Result<ActiveDrafts, DraftError> {
        let mut records = self.repository.active_by_owner(owner)?;
        records.sort_by(|a, b| b.last_edited_at.cmp(&a.last_edited_at));

        let total_count = records.len();
        records.truncate(self.display_cap);
        Ok(ActiveDrafts {
            items: records,
            total_count,
        })
    }

    /// Deleted drafts whose recovery window is still open, most recently
    /// deleted first. Drafts past the window are omitted even if the
    /// cleanup worker has not hard-deleted them yet.
    pub fn list_recoverable(
        &self,
        owner: &OwnerId,
        clock: &dyn Clock,
    ) -> Result<Vec<RecoverableDraft>, DraftError> {
        let now = clock.now();
        let mut records = self.repository.deleted_by_owner(owner)?;
        records.sort_by(|a, b| b.status.deleted_at().cmp(&a.status.deleted_at()));

        Ok(records
            .into_iter()
            .filter_map(|draft| {
                let remaining = self.recovery.remaining_recovery_time(&draft, now)?;
                if remaining <= chrono::Duration::zero() {
                    return None;
                }
                Some(RecoverableDraft {
                    remaining_recovery_seconds: remaining.num_seconds(),
                    draft,
                })
            })
            .collect())
    }

    pub fn active_count(&self, owner: &OwnerId) -> Result<usize, DraftError> {
        Ok(self.repository.active_by_owner(owner)?.len())
    }
}
