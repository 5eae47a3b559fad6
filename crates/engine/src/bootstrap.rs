use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use landclaim_core::{Claim, ClaimId, ClaimOwner, PlayerId};
use landclaim_storage::{ClaimStorage, StorageError, StoredClaim};
use landclaim_storage::schema::{CURRENT_SCHEMA_VERSION, needs_migration};

use crate::error::ClaimError;
use crate::index::InsertChecks;
use crate::player::PlayerData;
use crate::store::ClaimStore;
use crate::world::WorldInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineAction {
    /// The record named a world that no longer exists and was removed.
    Deleted,
    /// The record could not be read and was left on disk for an operator.
    Kept,
}

#[derive(Debug, Clone)]
pub struct Quarantined {
    pub path: PathBuf,
    pub reason: String,
    pub action: QuarantineAction,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub claims: usize,
    pub subdivisions: usize,
    pub players: usize,
    pub quarantined: Vec<Quarantined>,
    /// Records moved out of another world's folder into their own.
    pub relocated: usize,
    /// Set when records were rewritten from an older schema version.
    pub migrated_from: Option<u32>,
}

impl LoadReport {
    pub fn deleted(&self) -> impl Iterator<Item = &Quarantined> {
        self.quarantined
            .iter()
            .filter(|q| q.action == QuarantineAction::Deleted)
    }

    pub fn kept(&self) -> impl Iterator<Item = &Quarantined> {
        self.quarantined
            .iter()
            .filter(|q| q.action == QuarantineAction::Kept)
    }
}

/// A record found in another world's folder, held back until every folder has
/// been scanned.
struct Misfiled {
    path: PathBuf,
    claim_id: ClaimId,
    world: WorldInfo,
    stored: StoredClaim,
}

fn parse_file_name<T: std::str::FromStr>(path: &Path) -> Option<T> {
    path.file_name()?.to_str()?.parse().ok()
}

impl ClaimStore {
    /// Rebuilds the index and player cache from disk.
    ///
    /// Unreadable records never abort the load. A record whose world is gone
    /// is deleted; any other bad record is logged and left in place. Only a
    /// failure to list or create a world's data folders is returned.
    pub fn load(&self) -> Result<LoadReport, ClaimError> {
        let stored_version = self.read_schema_version();
        self.index.write().clear();
        self.players.lock().clear();

        let mut report = LoadReport::default();
        let worlds: Vec<WorldInfo> = self
            .worlds
            .worlds()
            .into_iter()
            .filter(|world| {
                let allowed = self.config.for_world(&world.name).allow_claims;
                if !allowed {
                    info!(world = %world.name, "world does not allow claims, skipping");
                }
                allowed
            })
            .collect();

        let mut misfiled = Vec::new();
        for world in &worlds {
            let folder = self.folder(world);
            self.storage.ensure_world_dirs(folder)?;
            for path in self.storage.claim_files(folder)? {
                self.load_claim_file(world, &path, &mut report, &mut misfiled);
            }
        }
        // A record in its own world's folder wins over any stray copy.
        for stray in misfiled {
            self.load_misfiled(stray, &mut report);
        }

        // Player claim lists are built from the index, so claims go first.
        for world in &worlds {
            for path in self.storage.player_files(self.folder(world))? {
                self.load_player_file(world, &path, &mut report);
            }
        }

        if needs_migration(stored_version) {
            self.migrate(stored_version);
            report.migrated_from = Some(stored_version);
        }

        info!(
            claims = report.claims,
            subdivisions = report.subdivisions,
            players = report.players,
            quarantined = report.quarantined.len(),
            relocated = report.relocated,
            "claim data loaded"
        );
        Ok(report)
    }

    fn quarantine(&self, path: &Path, error: &ClaimError, report: &mut LoadReport) {
        let action = match error {
            ClaimError::WorldNotFound(world) => match self.storage.remove_file(path) {
                Ok(()) => {
                    warn!(path = %path.display(), %world, "deleted record for missing world");
                    QuarantineAction::Deleted
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "unable to delete stale record");
                    QuarantineAction::Kept
                }
            },
            other => {
                error!(path = %path.display(), error = %other, "skipping unreadable record");
                QuarantineAction::Kept
            }
        };
        report.quarantined.push(Quarantined {
            path: path.to_path_buf(),
            reason: error.to_string(),
            action,
        });
    }

    fn load_claim_file(
        &self,
        found_in: &WorldInfo,
        path: &Path,
        report: &mut LoadReport,
        misfiled: &mut Vec<Misfiled>,
    ) {
        let Some(claim_id) = parse_file_name::<ClaimId>(path) else {
            error!(path = %path.display(), "could not read claim file: name is not a claim id");
            report.quarantined.push(Quarantined {
                path: path.to_path_buf(),
                reason: "file name is not a claim id".to_string(),
                action: QuarantineAction::Kept,
            });
            return;
        };

        let result = match self.read_claim(path) {
            Ok((world, stored)) if world.id != found_in.id => {
                misfiled.push(Misfiled {
                    path: path.to_path_buf(),
                    claim_id,
                    world,
                    stored,
                });
                return;
            }
            Ok((world, stored)) => self.index_claim(path, claim_id, &world, &stored),
            Err(e) => Err(e),
        };
        match result {
            Ok(subdivisions) => {
                report.claims += 1;
                report.subdivisions += subdivisions;
            }
            Err(e) => self.quarantine(path, &e, report),
        }
    }

    fn read_claim(&self, path: &Path) -> Result<(WorldInfo, StoredClaim), ClaimError> {
        let stored = self.storage.read_claim_file(path)?;
        let world = self.world_info(stored.record.world_unique_id)?;
        Ok((world, stored))
    }

    /// Moves a stray record into its world's folder, indexing it on the way
    /// when that world allows claims. A stray whose world folder already
    /// holds the record is stale and removed.
    fn load_misfiled(&self, stray: Misfiled, report: &mut LoadReport) {
        let Misfiled {
            path,
            claim_id,
            world,
            stored,
        } = stray;
        let folder = self.folder(&world);
        let lock = self.record_lock(claim_id);
        let _guard = lock.lock();

        if self.storage.claim_record_exists(folder, claim_id) {
            let action = match self.storage.remove_file(&path) {
                Ok(()) => {
                    warn!(path = %path.display(), claim = %claim_id, world = %world.name, "removed stale copy of claim record");
                    QuarantineAction::Deleted
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "unable to remove stale claim record");
                    QuarantineAction::Kept
                }
            };
            report.quarantined.push(Quarantined {
                path,
                reason: format!("superseded by the record in the {} folder", world.name),
                action,
            });
            return;
        }

        if self.config.for_world(&world.name).allow_claims {
            match self.index_claim(&path, claim_id, &world, &stored) {
                Ok(subdivisions) => {
                    report.claims += 1;
                    report.subdivisions += subdivisions;
                }
                Err(e) => {
                    self.quarantine(&path, &e, report);
                    return;
                }
            }
        }

        if let Err(e) = self
            .storage
            .write_claim_record(folder, claim_id, &stored.record)
        {
            error!(path = %path.display(), claim = %claim_id, error = %e, "unable to move claim record, leaving it in place");
            return;
        }
        match self.storage.remove_file(&path) {
            Ok(()) => {
                info!(claim = %claim_id, world = %world.name, "moved claim record into its world folder");
                report.relocated += 1;
            }
            Err(e) => {
                error!(path = %path.display(), claim = %claim_id, error = %e, "claim record copied but stray file remains");
            }
        }
    }

    /// Indexes one record: the top-level claim, then each subdivision wired to
    /// it. Returns how many subdivisions were indexed.
    fn index_claim(
        &self,
        path: &Path,
        claim_id: ClaimId,
        world: &WorldInfo,
        stored: &StoredClaim,
    ) -> Result<usize, ClaimError> {
        let record = &stored.record;
        let boundary = record
            .boundary()
            .map_err(|e| StorageError::Malformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let owner = ClaimOwner::from_option(record.owner_unique_id);
        if owner.is_administrative() {
            debug!(claim = %claim_id, "loaded administrative claim");
        }

        let mut top = Claim::with_id(claim_id, world.id, boundary, owner);
        top.modified_ms = stored.modified_ms;
        top.trust = record.trust.clone();
        let parent = top.clone();
        self.index.write().insert(top, InsertChecks::LOADED)?;

        let mut subdivisions = 0;
        for (sub_id, sub_record) in &record.sub_divisions {
            let sub_boundary = match sub_record.boundary() {
                Ok(boundary) => boundary,
                Err(e) => {
                    error!(claim = %claim_id, subdivision = %sub_id, error = %e, "skipping subdivision");
                    continue;
                }
            };
            let mut sub = Claim::subdivision_with_id(*sub_id, &parent, sub_boundary);
            sub.modified_ms = stored.modified_ms;
            sub.trust = sub_record.trust.clone();
            match self.index.write().insert(sub, InsertChecks::LOADED) {
                Ok(()) => subdivisions += 1,
                Err(e) => {
                    error!(claim = %claim_id, subdivision = %sub_id, error = %e, "skipping subdivision");
                }
            }
        }
        Ok(subdivisions)
    }

    fn load_player_file(&self, world: &WorldInfo, path: &Path, report: &mut LoadReport) {
        let Some(player) = parse_file_name::<PlayerId>(path) else {
            error!(path = %path.display(), "could not read player file: name is not a player id");
            report.quarantined.push(Quarantined {
                path: path.to_path_buf(),
                reason: "file name is not a player id".to_string(),
                action: QuarantineAction::Kept,
            });
            return;
        };

        match self.read_player_world(world, player) {
            Ok(world_data) => {
                self.players
                    .lock()
                    .entry(player)
                    .or_insert_with(|| PlayerData::new(player))
                    .worlds
                    .insert(world.id, world_data);
                report.players += 1;
            }
            Err(e) => self.quarantine(path, &ClaimError::from(e), report),
        }
    }

    /// Rewrites every loaded record in the current format, then records the
    /// new version. Individual write failures are logged and skipped.
    fn migrate(&self, from: u32) {
        let records: Vec<ClaimId> = self.index.read().top_level().map(|claim| claim.id).collect();
        info!(from, to = CURRENT_SCHEMA_VERSION, records = records.len(), "migrating claim records");
        let mut failed = 0;
        for record_id in records {
            let lock = self.record_lock(record_id);
            let _guard = lock.lock();
            if let Err(e) = self.persist_record_locked(record_id) {
                error!(record = %record_id, error = %e, "failed to migrate claim record");
                failed += 1;
            }
        }
        if failed == 0 {
            let _ = self.write_schema_version(CURRENT_SCHEMA_VERSION);
        } else {
            warn!(failed, "schema version left unchanged, migration will retry on next load");
        }
    }
}
