use std::path::{Path, PathBuf};

use landclaim_core::{ClaimId, PlayerId};

use crate::error::StorageError;
use crate::layout::WorldFolder;
use crate::record::{ClaimRecord, PlayerRecord};

/// A decoded claim record plus the file metadata the index needs.
#[derive(Debug, Clone)]
pub struct StoredClaim {
    pub record: ClaimRecord,
    pub modified_ms: u64,
}

/// Durable storage for claim and player records.
///
/// Implementations never log; every failure is returned to the caller.
pub trait ClaimStorage {
    fn ensure_world_dirs(&self, folder: WorldFolder<'_>) -> Result<(), StorageError>;

    /// Regular files in the world's claim folder, sorted by path.
    fn claim_files(&self, folder: WorldFolder<'_>) -> Result<Vec<PathBuf>, StorageError>;

    fn read_claim_file(&self, path: &Path) -> Result<StoredClaim, StorageError>;

    fn write_claim_record(
        &self,
        folder: WorldFolder<'_>,
        id: ClaimId,
        record: &ClaimRecord,
    ) -> Result<(), StorageError>;

    fn claim_record_exists(&self, folder: WorldFolder<'_>, id: ClaimId) -> bool;

    /// Removing a record that does not exist is not an error.
    fn delete_claim_record(&self, folder: WorldFolder<'_>, id: ClaimId) -> Result<(), StorageError>;

    fn player_files(&self, folder: WorldFolder<'_>) -> Result<Vec<PathBuf>, StorageError>;

    /// `Ok(None)` when the player has no record in this world yet.
    fn read_player_record(
        &self,
        folder: WorldFolder<'_>,
        player: PlayerId,
        initial_claim_blocks: i32,
    ) -> Result<Option<PlayerRecord>, StorageError>;

    fn write_player_record(
        &self,
        folder: WorldFolder<'_>,
        player: PlayerId,
        record: &PlayerRecord,
    ) -> Result<(), StorageError>;

    /// `Ok(None)` when no version has ever been written.
    fn read_schema_version(&self) -> Result<Option<u32>, StorageError>;

    fn write_schema_version(&self, version: u32) -> Result<(), StorageError>;

    fn remove_file(&self, path: &Path) -> Result<(), StorageError>;
}
