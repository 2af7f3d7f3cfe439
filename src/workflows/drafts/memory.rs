use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::domain::{DraftId, DraftRecord, DraftStage, DraftStatus, NewDraft, OwnerId};
use super::repository::{BatchOutcome, ConditionalWrite, DraftRepository, RepositoryError};

/// In-memory draft store with revision enforcement.
///
/// Serves as the development backend for the binary and as the default test
/// double; the production document-database adapter implements the same
/// trait out of tree.
#[derive(Debug, Default, Clone)]
pub struct MemoryDraftRepository {
    records: Arc<Mutex<HashMap<DraftId, DraftRecord>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<DraftId, DraftRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("draft store lock poisoned".to_string()))
    }

    fn next_id(&self) -> DraftId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        DraftId(format!("draft-{id:06}"))
    }
}

impl DraftRepository for MemoryDraftRepository {
    fn insert(&self, draft: NewDraft) -> Result<DraftRecord, RepositoryError> {
        let record = DraftRecord {
            id: self.next_id(),
            owner_id: draft.owner_id,
            stage: DraftStage::Intake,
            intake_completed_at: None,
            fieldwork_completed_at: None,
            created_at: draft.created_at,
            last_edited_at: draft.created_at,
            status: DraftStatus::Active,
            expires_at: draft.expires_at,
            payload: draft.payload,
            revision: 1,
        };

        let mut guard = self.guard()?;
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &DraftId) -> Result<Option<DraftRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard.get(id).cloned())
    }

    fn update(
        &self,
        record: DraftRecord,
        expected_revision: u64,
    ) -> Result<DraftRecord, RepositoryError> {
        let mut guard = self.guard()?;
        let stored = guard.get(&record.id).ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::RevisionConflict);
        }

        let mut updated = record;
        updated.revision = expected_revision + 1;
        guard.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    fn active_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard
            .values()
            .filter(|record| &record.owner_id == owner && !record.status.is_deleted())
            .cloned()
            .collect())
    }

    fn deleted_by_owner(&self, owner: &OwnerId) -> Result<Vec<DraftRecord>, RepositoryError> {
        let guard = self.guard()?;
        Ok(guard
            .values()
            .filter(|record| &record.owner_id == owner && record.status.is_deleted())
            .cloned()
            .collect())
    }

    fn stale_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        let guard = self.guard()?;
        let mut candidates: Vec<DraftRecord> = guard
            .values()
            .filter(|record| !record.status.is_deleted() && record.last_edited_at <= cutoff)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.last_edited_at.cmp(&b.last_edited_at));
        candidates.truncate(limit);
        Ok(candidates)
    }

    fn purge_candidates(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DraftRecord>, RepositoryError> {
        let guard = self.guard()?;
        let mut candidates: Vec<DraftRecord> = guard
            .values()
            .filter(|record| {
                record
                    .status
                    .deleted_at()
                    .map(|at| at < cutoff)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|record| record.status.deleted_at());
        candidates.truncate(limit);
        Ok(candidates)
    }

    fn apply_batch(&self, writes: Vec<ConditionalWrite>) -> Result<BatchOutcome, RepositoryError> {
        let mut guard = self.guard()?;
        let mut outcome = BatchOutcome::default();

        for write in writes {
            let id = write.record.id.clone();
            match guard.get(&id) {
                Some(stored) if stored.revision == write.expected_revision => {
                    let mut updated = write.record;
                    updated.revision = write.expected_revision + 1;
                    guard.insert(id.clone(), updated);
                    outcome.applied.push(id);
                }
                _ => outcome.conflicts.push(id),
            }
        }

        Ok(outcome)
    }

    fn hard_delete_batch(&self, ids: &[DraftId]) -> Result<usize, RepositoryError> {
        let mut guard = self.guard()?;
        let mut removed = 0;
        for id in ids {
            if guard.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
