use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use crate::workflows::drafts::clock::Clock;
use crate::workflows::drafts::domain::{DeleteReason, DraftId, DraftRecord, NewDraft, OwnerId};
use crate::workflows::drafts::memory::MemoryDraftRepository;
use crate::workflows::drafts::recovery::RecoveryManager;
use crate::workflows::drafts::repository::{
    BatchOutcome, ConditionalWrite, DraftEvent, DraftEventPublisher, DraftRepository, EventError,
    RepositoryError,
};
use crate::workflows::drafts::service::DraftService;
use crate::workflows::drafts::stages::StageTransitionEngine;
use crate::workflows::drafts::{draft_router, LifecyclePolicy};

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).single().expect("valid timestamp")
}

pub(super) fn policy() -> LifecyclePolicy {
    LifecyclePolicy::default()
}

pub(super) fn owner(suffix: &str) -> OwnerId {
    OwnerId(format!("inspector-{suffix}"))
}

pub(super) fn checklist_payload() -> Value {
    json!({
        "property": "1204 Maple Ave",
        "rooms": [
            {"name": "kitchen", "items": ["range", "sink"], "notes": ""},
            {"name": "basement", "items": ["sump pump"], "notes": "standing water"},
        ],
        "pricing": {"base": 325, "addons": 40},
    })
}

pub(super) fn stage_engine() -> StageTransitionEngine {
    StageTransitionEngine::new(policy().inactivity_window)
}

pub(super) fn recovery_manager() -> RecoveryManager {
    RecoveryManager::new(policy().recovery_window, policy().inactivity_window)
}

/// Seeds one active draft straight into the repository with a chosen edit
/// time, sidestepping the service so lifecycle tests can age records freely.
pub(super) fn seed_draft(
    repository: &MemoryDraftRepository,
    owner_id: OwnerId,
    last_edited_at: DateTime<Utc>,
) -> DraftRecord {
    repository
        .insert(NewDraft {
            owner_id,
            payload: checklist_payload(),
            created_at: last_edited_at,
            expires_at: Some(last_edited_at + policy().inactivity_window),
        })
        .expect("seed insert")
}

/// Seeds a soft-deleted draft whose deletion happened at `deleted_at`.
pub(super) fn seed_deleted_draft(
    repository: &MemoryDraftRepository,
    owner_id: OwnerId,
    deleted_at: DateTime<Utc>,
) -> DraftRecord {
    let record = seed_draft(repository, owner_id, deleted_at - Duration::hours(1));
    let deleted = recovery_manager()
        .soft_delete(&record, DeleteReason::Owner, deleted_at)
        .expect("soft delete");
    repository
        .update(deleted, record.revision)
        .expect("persist delete")
}

#[derive(Debug)]
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard += by;
    }

    pub(super) fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.now.lock().expect("clock mutex poisoned");
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

#[derive(Debug, Default)]
pub(super) struct CapturingPublisher {
    events: Mutex<Vec<DraftEvent>>,
}

impl CapturingPublisher {
    pub(super) fn events(&self) -> Vec<DraftEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl DraftEventPublisher for CapturingPublisher {
    fn publish(&self, event: DraftEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) type TestService = DraftService<MemoryDraftRepository, CapturingPublisher>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryDraftRepository>,
    Arc<CapturingPublisher>,
    Arc<ManualClock>,
) {
    let repository = Arc::new(MemoryDraftRepository::new());
    let events = Arc::new(CapturingPublisher::default());
    let clock = Arc::new(ManualClock::at(base_time()));
    let service = Arc::new(DraftService::new(
        repository.clone(),
        events.clone(),
        clock.clone(),
        policy(),
    ));
    (service, repository, events, clock)
}

pub(super) fn test_router(service: Arc<TestService>) -> axum::Router {
    draft_router(service)
}

pub(super) struct UnavailableRepository;

impl DraftRepository for UnavailableRepository {
    fn insert(&self, _draft: NewDraft) -> Result<DraftRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(
        &self,
        _record: DraftRecord,
        _expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn active_by_owner(&self, _owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn deleted_by_owner(&self, _owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn stale_candidates(
        &self,
        _cutoff: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn purge_candidates(
        &self,
        _cutoff: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn apply_batch(
        &self,
        _writes: Vec<ConditionalWrite>,
    ) -> Result<BatchOutcome, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn hard_delete_batch(&self, _ids: &[DraftId]) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Delegates to the in-memory store but fails the first `failures` batch
/// writes, for exercising the cleanup worker's retry discipline.
pub(super) struct FlakyBatchRepository {
    pub(super) inner: MemoryDraftRepository,
    remaining_failures: Mutex<usize>,
}

impl FlakyBatchRepository {
    pub(super) fn failing(inner: MemoryDraftRepository, failures: usize) -> Self {
        Self {
            inner,
            remaining_failures: Mutex::new(failures),
        }
    }

    fn try_consume_failure(&self) -> bool {
        let mut guard = self.remaining_failures.lock().expect("failure mutex poisoned");
        if *guard > 0 {
            *guard -= 1;
            true
        } else {
            false
        }
    }
}

impl DraftRepository for FlakyBatchRepository {
    fn insert(&self, draft: NewDraft) -> Result<DraftRecord, RepositoryError> {
        self.inner.insert(draft)
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        record: DraftRecord,
        expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError> {
        self.inner.update(record, expected_revision)
    }

    fn active_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.active_by_owner(owner)
    }

    fn deleted_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.deleted_by_owner(owner)
    }

    fn stale_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.stale_candidates(cutoff, limit)
    }

    fn purge_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.purge_candidates(cutoff, limit)
    }

    fn apply_batch(&self, writes: Vec<ConditionalWrite>) -> Result<BatchOutcome, RepositoryError> {
        if self.try_consume_failure() {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.apply_batch(writes)
    }

    fn hard_delete_batch(&self, ids: &[DraftId]) -> Result<usize, RepositoryError> {
        if self.try_consume_failure() {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.hard_delete_batch(ids)
    }
}

/// Blocks inside the first candidate query until released, holding the
/// cleanup worker mid-run so overlap behavior can be observed.
pub(super) struct GatedRepository {
    gate: Arc<Barrier>,
    tripped: AtomicBool,
}

impl GatedRepository {
    pub(super) fn new(gate: Arc<Barrier>) -> Self {
        Self {
            gate,
            tripped: AtomicBool::new(false),
        }
    }
}

impl DraftRepository for GatedRepository {
    fn insert(&self, _draft: NewDraft) -> Result<DraftRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("gated".to_string()))
    }

    fn fetch(&self, _id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        Ok(None)
    }

    fn update(
        &self,
        _record: DraftRecord,
        _expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("gated".to_string()))
    }

    fn active_by_owner(&self, _owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn deleted_by_owner(&self, _owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn stale_candidates(
        &self,
        _cutoff: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            self.gate.wait();
            self.gate.wait();
        }
        Ok(Vec::new())
    }

    fn purge_candidates(
        &self,
        _cutoff: DateTime<Utc>,
        _limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        Ok(Vec::new())
    }

    fn apply_batch(
        &self,
        _writes: Vec<ConditionalWrite>,
    ) -> Result<BatchOutcome, RepositoryError> {
        Ok(BatchOutcome::default())
    }

    fn hard_delete_batch(&self, _ids: &[DraftId]) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}

/// Delegates to the in-memory store but reports a revision conflict on the
/// first single-record update, simulating another session writing between a
/// read and its conditional write.
pub(super) struct ConflictOnceRepository {
    pub(super) inner: MemoryDraftRepository,
    conflicted: AtomicBool,
}

impl ConflictOnceRepository {
    pub(super) fn new(inner: MemoryDraftRepository) -> Self {
        Self {
            inner,
            conflicted: AtomicBool::new(false),
        }
    }
}

impl DraftRepository for ConflictOnceRepository {
    fn insert(&self, draft: NewDraft) -> Result<DraftRecord, RepositoryError> {
        self.inner.insert(draft)
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn update(
        &self,
        record: DraftRecord,
        expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError> {
        if !self.conflicted.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::RevisionConflict);
        }
        self.inner.update(record, expected_revision)
    }

    fn active_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.active_by_owner(owner)
    }

    fn deleted_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.deleted_by_owner(owner)
    }

    fn stale_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.stale_candidates(cutoff, limit)
    }

    fn purge_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        self.inner.purge_candidates(cutoff, limit)
    }

    fn apply_batch(&self, writes: Vec<ConditionalWrite>) -> Result<BatchOutcome, RepositoryError> {
        self.inner.apply_batch(writes)
    }

    fn hard_delete_batch(&self, ids: &[DraftId]) -> Result<usize, RepositoryError> {
        self.inner.hard_delete_batch(ids)
    }
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
