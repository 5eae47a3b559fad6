use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use landclaim_core::{ClaimId, PlayerId};

use crate::error::StorageError;
use crate::layout::{DataLayout, WorldFolder};
use crate::record::{
    ClaimRecord, PlayerRecord, decode_claim_record, decode_player_record, encode_claim_record,
    encode_player_record,
};
use crate::schema::parse_schema_version;
use crate::traits::{ClaimStorage, StoredClaim};

/// One file per top-level claim and one file per player per world, laid out
/// under a single data root.
pub struct FlatFileStorage {
    layout: DataLayout,
}

impl FlatFileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let layout = DataLayout::new(root);
        fs::create_dir_all(layout.root()).map_err(|e| StorageError::io(layout.root(), e))?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| StorageError::io(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Writes to a sibling temp file, syncs it, then renames it over `path`, so
/// readers see either the old record or the new one.
fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::malformed(path, "record path has no parent directory"))?;
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
    let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    temp.write_all(data)
        .map_err(|e| StorageError::io(temp.path().to_path_buf(), e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(temp.path().to_path_buf(), e))?;
    temp.persist(path).map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

impl ClaimStorage for FlatFileStorage {
    fn ensure_world_dirs(&self, folder: WorldFolder<'_>) -> Result<(), StorageError> {
        for dir in [self.layout.claim_dir(folder), self.layout.player_dir(folder)] {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        Ok(())
    }

    fn claim_files(&self, folder: WorldFolder<'_>) -> Result<Vec<PathBuf>, StorageError> {
        list_files(&self.layout.claim_dir(folder))
    }

    fn read_claim_file(&self, path: &Path) -> Result<StoredClaim, StorageError> {
        let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        let record = decode_claim_record(&bytes, path)?;
        let modified_ms = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Ok(StoredClaim {
            record,
            modified_ms,
        })
    }

    fn write_claim_record(
        &self,
        folder: WorldFolder<'_>,
        id: ClaimId,
        record: &ClaimRecord,
    ) -> Result<(), StorageError> {
        let bytes = encode_claim_record(record)?;
        atomic_write(&self.layout.claim_path(folder, id), &bytes)
    }

    fn claim_record_exists(&self, folder: WorldFolder<'_>, id: ClaimId) -> bool {
        self.layout.claim_path(folder, id).is_file()
    }

    fn delete_claim_record(&self, folder: WorldFolder<'_>, id: ClaimId) -> Result<(), StorageError> {
        remove_if_present(&self.layout.claim_path(folder, id))
    }

    fn player_files(&self, folder: WorldFolder<'_>) -> Result<Vec<PathBuf>, StorageError> {
        list_files(&self.layout.player_dir(folder))
    }

    fn read_player_record(
        &self,
        folder: WorldFolder<'_>,
        player: PlayerId,
        initial_claim_blocks: i32,
    ) -> Result<Option<PlayerRecord>, StorageError> {
        let path = self.layout.player_path(folder, player);
        read_optional(&path)?
            .map(|bytes| decode_player_record(&bytes, &path, initial_claim_blocks))
            .transpose()
    }

    fn write_player_record(
        &self,
        folder: WorldFolder<'_>,
        player: PlayerId,
        record: &PlayerRecord,
    ) -> Result<(), StorageError> {
        let bytes = encode_player_record(record)?;
        atomic_write(&self.layout.player_path(folder, player), &bytes)
    }

    fn read_schema_version(&self) -> Result<Option<u32>, StorageError> {
        let path = self.layout.schema_version_path();
        Ok(read_optional(&path)?
            .map(|bytes| parse_schema_version(&String::from_utf8_lossy(&bytes))))
    }

    fn write_schema_version(&self, version: u32) -> Result<(), StorageError> {
        atomic_write(&self.layout.schema_version_path(), version.to_string().as_bytes())
    }

    fn remove_file(&self, path: &Path) -> Result<(), StorageError> {
        remove_if_present(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclaim_core::{Boundary, Claim, ClaimOwner, Position, WorldId};

    fn storage() -> (tempfile::TempDir, FlatFileStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FlatFileStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    fn record() -> (ClaimId, ClaimRecord) {
        let claim = Claim::new(
            WorldId::new(),
            Boundary::new(Position::new(0, 0, 0), Position::new(10, 10, 10)),
            ClaimOwner::Administrative,
        );
        (claim.id, ClaimRecord::from_claims(&claim, std::iter::empty::<&Claim>()))
    }

    #[test]
    fn write_then_read_claim() {
        let (_dir, storage) = storage();
        let (id, record) = record();
        storage.write_claim_record(WorldFolder::Default, id, &record).unwrap();

        let files = storage.claim_files(WorldFolder::Default).unwrap();
        assert_eq!(files, vec![storage.layout().claim_path(WorldFolder::Default, id)]);

        let stored = storage.read_claim_file(&files[0]).unwrap();
        assert_eq!(stored.record, record);
        assert!(stored.modified_ms > 0);
    }

    #[test]
    fn overwrite_leaves_no_temp_files() {
        let (_dir, storage) = storage();
        let (id, mut record) = record();
        storage.write_claim_record(WorldFolder::Named("nether"), id, &record).unwrap();
        record.greater_boundary_corner_pos = "20,20,20".into();
        storage.write_claim_record(WorldFolder::Named("nether"), id, &record).unwrap();

        let files = storage.claim_files(WorldFolder::Named("nether")).unwrap();
        assert_eq!(files.len(), 1);
        let stored = storage.read_claim_file(&files[0]).unwrap();
        assert_eq!(stored.record.greater_boundary_corner_pos, "20,20,20");
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, storage) = storage();
        let (id, record) = record();
        storage.write_claim_record(WorldFolder::Default, id, &record).unwrap();
        assert!(storage.claim_record_exists(WorldFolder::Default, id));
        assert!(!storage.claim_record_exists(WorldFolder::Named("nether"), id));
        storage.delete_claim_record(WorldFolder::Default, id).unwrap();
        storage.delete_claim_record(WorldFolder::Default, id).unwrap();
        assert!(!storage.claim_record_exists(WorldFolder::Default, id));
        assert!(storage.claim_files(WorldFolder::Default).unwrap().is_empty());
    }

    #[test]
    fn listing_skips_directories_and_missing_folders() {
        let (_dir, storage) = storage();
        assert!(storage.claim_files(WorldFolder::Named("absent")).unwrap().is_empty());
        storage.ensure_world_dirs(WorldFolder::Default).unwrap();
        fs::create_dir(storage.layout().claim_dir(WorldFolder::Default).join("nested")).unwrap();
        assert!(storage.claim_files(WorldFolder::Default).unwrap().is_empty());
    }

    #[test]
    fn player_record_absent_until_written() {
        let (_dir, storage) = storage();
        let player = PlayerId::new();
        assert!(storage
            .read_player_record(WorldFolder::Default, player, 100)
            .unwrap()
            .is_none());

        let record = PlayerRecord::new(250);
        storage.write_player_record(WorldFolder::Default, player, &record).unwrap();
        let read = storage
            .read_player_record(WorldFolder::Default, player, 100)
            .unwrap();
        assert_eq!(read, Some(record));
    }

    #[test]
    fn schema_version_file() {
        let (_dir, storage) = storage();
        assert_eq!(storage.read_schema_version().unwrap(), None);
        storage.write_schema_version(4).unwrap();
        assert_eq!(storage.read_schema_version().unwrap(), Some(4));
        fs::write(storage.layout().schema_version_path(), "garbage").unwrap();
        assert_eq!(storage.read_schema_version().unwrap(), Some(0));
    }
}
