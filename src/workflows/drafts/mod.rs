//! Inspection draft lifecycle: staged progression, soft delete with a
//! recovery window, inactivity expiration, and the periodic cleanup worker.
//!
//! The write path is `router -> service -> stage/recovery engines ->
//! repository`; the cleanup worker shares the same repository and event
//! publisher but runs on its own timer. All time comes in through the
//! `Clock` trait so every deadline is testable without sleeping.

pub mod cleanup;
pub mod clock;
pub mod domain;
pub(crate) mod expiration;
pub mod library;
pub mod memory;
pub mod policy;
pub(crate) mod recovery;
pub mod repository;
pub mod router;
pub mod service;
pub(crate) mod stages;

#[cfg(test)]
mod tests;

pub use cleanup::{spawn_cleanup_scheduler, CleanupError, CleanupSummary, CleanupWorker};
pub use clock::{Clock, SystemClock};
pub use domain::{
    DeleteReason, DraftError, DraftId, DraftRecord, DraftStage, DraftStatus, NewDraft, OwnerId,
};
pub use library::{ActiveDrafts, RecoverableDraft};
pub use memory::MemoryDraftRepository;
pub use policy::LifecyclePolicy;
pub use repository::{
    BatchOutcome, ConditionalWrite, DraftEvent, DraftEventPublisher, DraftRepository, EventError,
    RepositoryError, TracingEventPublisher,
};
pub use router::draft_router;
pub use service::{CreatedDraft, DraftService};
