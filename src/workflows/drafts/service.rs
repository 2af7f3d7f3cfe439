use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::cleanup::{CleanupError, CleanupSummary, CleanupWorker};
use super::clock::Clock;
use super::domain::{
    DeleteReason, DraftError, DraftId, DraftRecord, DraftStage, NewDraft, OwnerId,
};
use super::library::{ActiveDrafts, DraftLibrary, RecoverableDraft};
use super::policy::LifecyclePolicy;
use super::recovery::RecoveryManager;
use super::repository::{DraftEvent, DraftEventPublisher, DraftRepository, RepositoryError};
use super::stages::StageTransitionEngine;

/// A freshly created draft plus a capacity advisory. `at_capacity` means
/// the owner's active set now meets or exceeds the display cap; creation
/// itself is never blocked on it.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedDraft {
    #[serde(flatten)]
    pub draft: DraftRecord,
    pub at_capacity: bool,
}

/// Write-side entry point for the draft lifecycle. Every mutation runs a
/// read-modify-write against the repository's revision check, so two
/// sessions racing on the same draft resolve to one winner and one
/// `ConcurrentModification`.
pub struct DraftService<R, P> {
    repository: Arc<R>,
    events: Arc<P>,
    clock: Arc<dyn Clock>,
    stages: StageTransitionEngine,
    recovery: RecoveryManager,
    library: DraftLibrary<R>,
    cleanup: Arc<CleanupWorker<R, P>>,
    policy: LifecyclePolicy,
}

impl<R, P> DraftService<R, P>
where
    R: DraftRepository,
    P: DraftEventPublisher,
{
    pub fn new(
        repository: Arc<R>,
        events: Arc<P>,
        clock: Arc<dyn Clock>,
        policy: LifecyclePolicy,
    ) -> Self {
        let recovery = RecoveryManager::new(policy.recovery_window, policy.inactivity_window);
        let stages = StageTransitionEngine::new(policy.inactivity_window);
        let library = DraftLibrary::new(
            Arc::clone(&repository),
            recovery.clone(),
            policy.active_display_cap,
        );
        let cleanup = Arc::new(CleanupWorker::new(
            Arc::clone(&repository),
            Arc::clone(&events),
            policy.clone(),
        ));

        Self {
            repository,
            events,
            clock,
            stages,
            recovery,
            library,
            cleanup,
            policy,
        }
    }

    pub fn create(&self, owner_id: OwnerId, payload: Value) -> Result<CreatedDraft, DraftError> {
        let now = self.clock.now();
        let existing = self.library.active_count(&owner_id)?;

        let draft = self.repository.insert(NewDraft {
            owner_id,
            payload,
            created_at: now,
            expires_at: Some(now + self.policy.inactivity_window),
        })?;

        info!(draft_id = %draft.id, owner_id = %draft.owner_id, "draft created");
        self.emit(DraftEvent::Created {
            id: draft.id.clone(),
            owner_id: draft.owner_id.clone(),
            at: now,
        });

        Ok(CreatedDraft {
            at_capacity: existing + 1 >= self.policy.active_display_cap,
            draft,
        })
    }

    pub fn fetch(&self, id: &DraftId) -> Result<DraftRecord, DraftError> {
        self.repository.fetch(id)?.ok_or(DraftError::NotFound)
    }

    /// Advance a draft to its next stage.
    pub fn advance(&self, id: &DraftId) -> Result<DraftRecord, DraftError> {
        let now = self.clock.now();
        let record = self.fetch(id)?;
        let updated = self.stages.advance(&record, now)?;
        let stored = self.persist(updated, record.revision)?;

        info!(draft_id = %stored.id, stage = stored.stage.label(), "draft advanced");
        self.emit(DraftEvent::StageAdvanced {
            id: stored.id.clone(),
            stage: stored.stage,
            at: now,
        });
        Ok(stored)
    }

    /// Replace the draft's working payload. Refreshes the inactivity
    /// deadline like any other edit; emits no lifecycle event since
    /// payload churn is constant while a user is working.
    pub fn edit_payload(&self, id: &DraftId, payload: Value) -> Result<DraftRecord, DraftError> {
        let now = self.clock.now();
        let record = self.fetch(id)?;
        if record.status.is_deleted() {
            return Err(DraftError::AlreadyDeleted);
        }

        let mut updated = record.clone();
        updated.payload = payload;
        updated.last_edited_at = now;
        updated.expires_at = Some(now + self.policy.inactivity_window);
        self.persist(updated, record.revision)
    }

    /// Administrative stage override for trusted internal callers.
    pub fn set_stage(&self, id: &DraftId, target: DraftStage) -> Result<DraftRecord, DraftError> {
        let now = self.clock.now();
        let record = self.fetch(id)?;
        let updated = self.stages.set_stage(&record, target, now)?;
        let stored = self.persist(updated, record.revision)?;

        info!(draft_id = %stored.id, stage = stored.stage.label(), "draft stage overridden");
        self.emit(DraftEvent::StageAdvanced {
            id: stored.id.clone(),
            stage: stored.stage,
            at: now,
        });
        Ok(stored)
    }

    /// Owner-initiated soft delete. The draft drops out of the active
    /// library immediately but remains restorable for the recovery window.
    pub fn soft_delete(&self, id: &DraftId) -> Result<DraftRecord, DraftError> {
        let now = self.clock.now();
        let record = self.fetch(id)?;
        let updated = self
            .recovery
            .soft_delete(&record, DeleteReason::Owner, now)?;
        let stored = self.persist(updated, record.revision)?;

        info!(draft_id = %stored.id, "draft soft-deleted");
        self.emit(DraftEvent::SoftDeleted {
            id: stored.id.clone(),
            reason: DeleteReason::Owner,
            at: now,
        });
        Ok(stored)
    }

    /// Bring a deleted draft back while its recovery window is open.
    pub fn restore(&self, id: &DraftId) -> Result<DraftRecord, DraftError> {
        let now = self.clock.now();
        let record = self.fetch(id)?;
        let updated = self.recovery.restore(&record, now)?;
        let stored = self.persist(updated, record.revision)?;

        info!(draft_id = %stored.id, "draft restored");
        self.emit(DraftEvent::Restored {
            id: stored.id.clone(),
            at: now,
        });
        Ok(stored)
    }

    pub fn list_active(&self, owner: &OwnerId) -> Result<ActiveDrafts, DraftError> {
        self.library.list_active(owner)
    }

    pub fn list_recoverable(&self, owner: &OwnerId) -> Result<Vec<RecoverableDraft>, DraftError> {
        self.library.list_recoverable(owner, self.clock.as_ref())
    }

    /// Privileged manual cleanup trigger; shares the worker's single-flight
    /// guard with the scheduled run.
    pub fn run_cleanup(&self) -> Result<CleanupSummary, CleanupError> {
        self.cleanup.run(self.clock.now())
    }

    pub fn cleanup_worker(&self) -> Arc<CleanupWorker<R, P>> {
        Arc::clone(&self.cleanup)
    }

    fn persist(
        &self,
        record: DraftRecord,
        expected_revision: u64,
    ) -> Result<DraftRecord, DraftError> {
        self.repository
            .update(record, expected_revision)
            .map_err(|err| match err {
                RepositoryError::RevisionConflict => DraftError::ConcurrentModification,
                RepositoryError::NotFound => DraftError::NotFound,
                other => DraftError::Repository(other),
            })
    }

    fn emit(&self, event: DraftEvent) {
        if let Err(err) = self.events.publish(event) {
            warn!(error = %err, "failed to publish draft lifecycle event");
        }
    }
}
