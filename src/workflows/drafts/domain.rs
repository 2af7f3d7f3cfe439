use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::repository::RepositoryError;

/// Identifier wrapper for persisted inspection drafts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftId(pub String);

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for the portal account that owns a draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered stages an inspection draft moves through before handoff.
///
/// The progression is strictly `intake -> fieldwork -> review`; only the
/// privileged override in the stage engine may move a draft backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStage {
    Intake,
    Fieldwork,
    Review,
}

impl DraftStage {
    pub const fn ordered() -> [Self; 3] {
        [Self::Intake, Self::Fieldwork, Self::Review]
    }

    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Intake => Some(Self::Fieldwork),
            Self::Fieldwork => Some(Self::Review),
            Self::Review => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Intake => "Intake",
            Self::Fieldwork => "Fieldwork",
            Self::Review => "Review",
        }
    }
}

/// Who (or what) removed a draft from the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    Owner,
    Inactivity,
}

impl DeleteReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Owner => "owner_requested",
            Self::Inactivity => "inactivity_expired",
        }
    }
}

/// Lifecycle status of a draft. Deletion metadata lives on the variant so an
/// active record can never carry a stale deletion timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DraftStatus {
    Active,
    Deleted {
        at: DateTime<Utc>,
        reason: DeleteReason,
    },
}

impl DraftStatus {
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Active => None,
            Self::Deleted { at, .. } => Some(*at),
        }
    }
}

/// The central persisted entity: one in-progress inspection report.
///
/// `payload` (checklist items, annotations, pricing) belongs to the portal
/// screens and is stored opaquely; lifecycle code never inspects it.
/// `revision` is owned by the repository and compared on every conditional
/// write so concurrent sessions cannot silently overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: DraftId,
    pub owner_id: OwnerId,
    pub stage: DraftStage,
    pub intake_completed_at: Option<DateTime<Utc>>,
    pub fieldwork_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
    pub status: DraftStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub payload: Value,
    pub revision: u64,
}

/// Creation request captured before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDraft {
    pub owner_id: OwnerId,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Errors surfaced by single-draft lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("draft in stage {} cannot advance further", .from.label())]
    InvalidTransition { from: DraftStage },
    #[error("draft was modified by another session; reload and retry")]
    ConcurrentModification,
    #[error("draft is already deleted")]
    AlreadyDeleted,
    #[error("draft is not deleted")]
    NotDeleted,
    #[error("draft is no longer recoverable; the recovery window closed at {expired_at}")]
    RecoveryWindowExpired { expired_at: DateTime<Utc> },
    #[error("draft not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
