use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{DeleteReason, DraftId, DraftRecord, DraftStage, NewDraft, OwnerId};

/// Storage abstraction over the portal's document database.
///
/// Writes are conditional on the revision the caller last read; a mismatch
/// means another session wrote in between and the caller must reload. Batch
/// writes report per-record conflicts in the outcome instead of failing the
/// whole batch, so the cleanup worker can make progress past contested
/// records. `Unavailable` is reserved for the backend itself being down.
pub trait DraftRepository: Send + Sync {
    /// Persist a new draft, assigning its id and initial revision.
    fn insert(&self, draft: NewDraft) -> Result<DraftRecord, RepositoryError>;

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError>;

    /// Single conditional write. Fails with `RevisionConflict` when the
    /// stored revision differs from `expected_revision`.
    fn update(
        &self,
        record: DraftRecord,
        expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError>;

    /// Non-deleted drafts for an owner, in no particular order.
    fn active_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError>;

    /// Soft-deleted drafts for an owner, in no particular order.
    fn deleted_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError>;

    /// Active drafts last edited at or before `cutoff`, oldest first,
    /// bounded to `limit`.
    fn stale_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError>;

    /// Deleted drafts whose deletion timestamp is strictly before `cutoff`,
    /// oldest first, bounded to `limit`.
    fn purge_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError>;

    /// Batched conditional writes. Per-record revision mismatches surface in
    /// the outcome; only backend failure errors the call.
    fn apply_batch(&self, writes: Vec<ConditionalWrite>) -> Result<BatchOutcome, RepositoryError>;

    /// Irreversibly remove the given drafts, returning how many existed.
    fn hard_delete_batch(&self, ids: &[DraftId]) -> Result<usize, RepositoryError>;
}

/// One record write plus the revision it must still be at.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalWrite {
    pub record: DraftRecord,
    pub expected_revision: u64,
}

/// Result of a batched conditional write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub applied: Vec<DraftId>,
    pub conflicts: Vec<DraftId>,
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record revision did not match the expected revision")]
    RevisionConflict,
    #[error("draft store unavailable: {0}")]
    Unavailable(String),
}

/// Lifecycle notifications emitted after successful writes. Notification
/// delivery (email, portal badges) is an external collaborator keyed off
/// these events; the core never renders or sends anything itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DraftEvent {
    Created {
        id: DraftId,
        owner_id: OwnerId,
        at: DateTime<Utc>,
    },
    StageAdvanced {
        id: DraftId,
        stage: DraftStage,
        at: DateTime<Utc>,
    },
    SoftDeleted {
        id: DraftId,
        reason: DeleteReason,
        at: DateTime<Utc>,
    },
    Restored {
        id: DraftId,
        at: DateTime<Utc>,
    },
    HardDeleted {
        id: DraftId,
        at: DateTime<Utc>,
    },
}

/// Trait describing outbound event hooks for notification collaborators.
pub trait DraftEventPublisher: Send + Sync {
    fn publish(&self, event: DraftEvent) -> Result<(), EventError>;
}

/// Event dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Publisher that records events on the service log. Used by the binary
/// until a real notification collaborator is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl DraftEventPublisher for TracingEventPublisher {
    fn publish(&self, event: DraftEvent) -> Result<(), EventError> {
        info!(?event, "draft lifecycle event");
        Ok(())
    }
}
