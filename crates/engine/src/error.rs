use landclaim_core::{ClaimId, WorldId};
use landclaim_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("claim overlaps existing claim {existing}")]
    Overlap { existing: ClaimId },

    #[error("world not found: {0}")]
    WorldNotFound(WorldId),

    #[error("claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("parent claim not found: {0}")]
    ParentNotFound(ClaimId),

    #[error("claim {claim} does not fit inside parent {parent}")]
    OutsideParent { claim: ClaimId, parent: ClaimId },

    #[error("claim already indexed: {0}")]
    DuplicateClaim(ClaimId),

    #[error("claim is a subdivision: {0}")]
    NotTopLevel(ClaimId),
}
