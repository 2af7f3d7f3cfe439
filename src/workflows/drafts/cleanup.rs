use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::clock::Clock;
use super::domain::{DeleteReason, DraftId};
use super::expiration::ExpirationPolicy;
use super::policy::LifecyclePolicy;
use super::recovery::RecoveryManager;
use super::repository::{
    ConditionalWrite, DraftEvent, DraftEventPublisher, DraftRepository, RepositoryError,
};

/// Counters reported after a cleanup run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupSummary {
    pub expired_count: usize,
    pub hard_deleted_count: usize,
    pub error_count: usize,
    pub ran_at: DateTime<Utc>,
}

/// Errors that abort a cleanup run outright.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("a cleanup run is already in progress")]
    AlreadyRunning,
    #[error("cleanup aborted, candidate query failed: {0}")]
    FatalQuery(#[source] RepositoryError),
}

/// Periodic reconciliation job: expires stale drafts, then hard-deletes
/// drafts whose recovery window has elapsed, in bounded batches.
///
/// Runs are single-flight; the timer and the privileged manual trigger go
/// through the same guard. Each successful run leaves empty candidate sets
/// behind, so an immediate re-run is a no-op. Per-batch write failures are
/// retried once, then deferred to the next cycle; only a failed candidate
/// query aborts the run, and nothing is counted processed without a
/// successful write.
pub struct CleanupWorker<R, P> {
    repository: Arc<R>,
    events: Arc<P>,
    policy: LifecyclePolicy,
    expiration: ExpirationPolicy,
    running: AtomicBool,
}

impl<R, P> CleanupWorker<R, P>
where
    R: DraftRepository,
    P: DraftEventPublisher,
{
    pub fn new(repository: Arc<R>, events: Arc<P>, policy: LifecyclePolicy) -> Self {
        let recovery = RecoveryManager::new(policy.recovery_window, policy.inactivity_window);
        let expiration = ExpirationPolicy::new(policy.inactivity_window, recovery);
        Self {
            repository,
            events,
            policy,
            expiration,
            running: AtomicBool::new(false),
        }
    }

    pub fn run(&self, now: DateTime<Utc>) -> Result<CleanupSummary, CleanupError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CleanupError::AlreadyRunning);
        }

        let result = self.run_exclusive(now);
        self.running.store(false, Ordering::Release);
        result
    }

    fn run_exclusive(&self, now: DateTime<Utc>) -> Result<CleanupSummary, CleanupError> {
        let mut summary = CleanupSummary {
            expired_count: 0,
            hard_deleted_count: 0,
            error_count: 0,
            ran_at: now,
        };

        self.expire_stale(now, &mut summary)?;
        self.purge_elapsed(now, &mut summary)?;

        info!(
            expired = summary.expired_count,
            hard_deleted = summary.hard_deleted_count,
            errors = summary.error_count,
            "cleanup run complete"
        );
        Ok(summary)
    }

    fn expire_stale(
        &self,
        now: DateTime<Utc>,
        summary: &mut CleanupSummary,
    ) -> Result<(), CleanupError> {
        let cutoff = now - self.policy.inactivity_window;

        for _ in 0..self.policy.max_batches_per_run {
            let page = self
                .repository
                .stale_candidates(cutoff, self.policy.batch_size)
                .map_err(CleanupError::FatalQuery)?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();

            let writes: Vec<ConditionalWrite> = page
                .iter()
                .filter_map(|record| {
                    self.expiration
                        .apply_expiration(record, now)
                        .map(|updated| ConditionalWrite {
                            expected_revision: record.revision,
                            record: updated,
                        })
                })
                .collect();

            let Some(outcome) = self.write_with_retry(writes.len(), || {
                self.repository.apply_batch(writes.clone())
            }) else {
                // A retried-and-failed page would be re-read on the next
                // query; stop here and let the next run pick it up.
                summary.error_count += writes.len();
                break;
            };

            summary.expired_count += outcome.applied.len();
            summary.error_count += outcome.conflicts.len();
            for id in &outcome.applied {
                self.emit(DraftEvent::SoftDeleted {
                    id: id.clone(),
                    reason: DeleteReason::Inactivity,
                    at: now,
                });
            }

            if page_len < self.policy.batch_size {
                break;
            }
        }

        Ok(())
    }

    fn purge_elapsed(
        &self,
        now: DateTime<Utc>,
        summary: &mut CleanupSummary,
    ) -> Result<(), CleanupError> {
        let cutoff = now - self.policy.recovery_window;

        for _ in 0..self.policy.max_batches_per_run {
            let page = self
                .repository
                .purge_candidates(cutoff, self.policy.batch_size)
                .map_err(CleanupError::FatalQuery)?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();

            let ids: Vec<DraftId> = page.iter().map(|record| record.id.clone()).collect();
            let Some(removed) =
                self.write_with_retry(ids.len(), || self.repository.hard_delete_batch(&ids))
            else {
                summary.error_count += ids.len();
                break;
            };

            summary.hard_deleted_count += removed;
            for id in &ids {
                self.emit(DraftEvent::HardDeleted {
                    id: id.clone(),
                    at: now,
                });
            }

            if page_len < self.policy.batch_size {
                break;
            }
        }

        Ok(())
    }

    fn write_with_retry<T>(
        &self,
        batch_len: usize,
        mut attempt: impl FnMut() -> Result<T, RepositoryError>,
    ) -> Option<T> {
        match attempt() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, batch_len, "cleanup batch write failed, retrying once");
                match attempt() {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(
                            error = %err,
                            batch_len,
                            "cleanup batch write failed after retry, deferring to next run"
                        );
                        None
                    }
                }
            }
        }
    }

    fn emit(&self, event: DraftEvent) {
        if let Err(err) = self.events.publish(event) {
            warn!(error = %err, "failed to publish draft lifecycle event");
        }
    }
}

/// Background timer driving periodic cleanup at the configured cadence.
/// Shares the worker's single-flight guard with the manual trigger, so an
/// operator-invoked run and a timer tick never overlap.
pub fn spawn_cleanup_scheduler<R, P>(
    worker: Arc<CleanupWorker<R, P>>,
    clock: Arc<dyn Clock>,
) -> tokio::task::JoinHandle<()>
where
    R: DraftRepository + 'static,
    P: DraftEventPublisher + 'static,
{
    let cadence = worker
        .policy
        .cleanup_cadence
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(24 * 60 * 60));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // interval fires immediately; consume the first tick so the initial
        // run happens one full cadence after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match worker.run(clock.now()) {
                Ok(_) => {}
                Err(CleanupError::AlreadyRunning) => {
                    debug!("scheduled cleanup skipped, a run is already in progress");
                }
                Err(err) => error!(error = %err, "scheduled cleanup run failed"),
            }
        }
    })
}
