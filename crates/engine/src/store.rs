use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use landclaim_core::{
    Boundary, Claim, ClaimId, ClaimOwner, PlayerId, Position, TrustEntry, TrustLevel, WorldId,
};
use landclaim_storage::{
    ClaimRecord, ClaimStorage, FlatFileStorage, PlayerRecord, StorageError, WorldFolder,
};

use crate::config::ClaimConfig;
use crate::error::ClaimError;
use crate::index::{ClaimIndex, InsertChecks};
use crate::player::{PlayerData, PlayerWorldData};
use crate::world::{WorldDirectory, WorldInfo, folder_for};

/// The authoritative set of claims for a server, and the only path by which
/// they reach disk.
///
/// Lock order is record lock, then index. The player cache reads the index
/// while held, so the index lock is always released before the player cache
/// is taken.
pub struct ClaimStore {
    pub(crate) storage: FlatFileStorage,
    pub(crate) worlds: Arc<dyn WorldDirectory>,
    pub(crate) config: ClaimConfig,
    pub(crate) index: RwLock<ClaimIndex>,
    record_locks: Mutex<HashMap<ClaimId, Arc<Mutex<()>>>>,
    pub(crate) players: Mutex<HashMap<PlayerId, PlayerData>>,
}

impl ClaimStore {
    pub fn open(
        root: impl Into<PathBuf>,
        worlds: Arc<dyn WorldDirectory>,
        config: ClaimConfig,
    ) -> Result<Self, ClaimError> {
        let storage = FlatFileStorage::open(root)?;
        info!(root = %storage.layout().root().display(), "claim store opened");
        Ok(Self {
            storage,
            worlds,
            config,
            index: RwLock::new(ClaimIndex::default()),
            record_locks: Mutex::new(HashMap::new()),
            players: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn world_info(&self, world: WorldId) -> Result<WorldInfo, ClaimError> {
        self.worlds.world(world).ok_or(ClaimError::WorldNotFound(world))
    }

    pub(crate) fn folder<'a>(&self, world: &'a WorldInfo) -> WorldFolder<'a> {
        folder_for(world, self.worlds.default_world().id)
    }

    pub(crate) fn record_lock(&self, record_id: ClaimId) -> Arc<Mutex<()>> {
        self.record_locks
            .lock()
            .entry(record_id)
            .or_default()
            .clone()
    }

    /// Writes the record for `record_id` from the current index state. The
    /// caller holds that record's lock. A record no longer indexed is skipped.
    pub(crate) fn persist_record_locked(&self, record_id: ClaimId) -> Result<(), ClaimError> {
        let (world, record) = {
            let index = self.index.read();
            let Some((top, children)) = index.family(record_id) else {
                return Ok(());
            };
            (top.world, ClaimRecord::from_claims(top, children))
        };
        let info = self.world_info(world)?;
        self.storage
            .write_claim_record(self.folder(&info), record_id, &record)?;
        debug!(record = %record_id, world = %info.name, "claim record written");
        Ok(())
    }

    /// Persists the record holding `claim`: the claim itself if it is
    /// top-level, otherwise its parent with every subdivision.
    ///
    /// Failures are logged here and also returned; the index is left as is.
    pub fn write_claim_to_storage(&self, claim: &Claim) -> Result<(), ClaimError> {
        let record_id = claim.record_id();
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();
        self.persist_logged(claim.id, record_id)
    }

    fn persist_logged(&self, claim: ClaimId, record_id: ClaimId) -> Result<(), ClaimError> {
        let result = self.persist_record_locked(record_id);
        if let Err(e) = &result {
            error!(%claim, record = %record_id, error = %e, "failed to write claim record");
        }
        result
    }

    /// Indexes a new claim or subdivision and persists its record.
    ///
    /// Only index rejections are returned. A failed write is logged and the
    /// claim stays indexed.
    pub fn add_claim(&self, claim: Claim, allow_overlap: bool) -> Result<(), ClaimError> {
        let id = claim.id;
        let world = claim.world;
        let record_id = claim.record_id();
        let is_top_level = !claim.is_subdivision();
        let volume = claim.boundary.volume();
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();

        let owner = {
            let mut index = self.index.write();
            index.insert(claim, InsertChecks::runtime(allow_overlap))?;
            index.get(id).map(|c| c.owner)
        };
        if let (true, Some(owner)) = (is_top_level, owner) {
            self.track_claim(world, owner, id);
        }
        info!(claim = %id, record = %record_id, volume, "claim added");

        let _ = self.persist_logged(id, record_id);
        Ok(())
    }

    /// Removes a claim from the index and from disk. A top-level claim takes
    /// its subdivisions and its record file with it; removing a subdivision
    /// rewrites the parent's record.
    ///
    /// Returns every removed id. Storage failures are logged, not returned.
    pub fn delete_claim(&self, id: ClaimId) -> Result<Vec<ClaimId>, ClaimError> {
        let record_id = self
            .index
            .read()
            .get(id)
            .map(|claim| claim.record_id())
            .ok_or(ClaimError::ClaimNotFound(id))?;
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();

        let removed = self
            .index
            .write()
            .remove(id)
            .ok_or(ClaimError::ClaimNotFound(id))?;
        let removed_ids: Vec<ClaimId> = removed.iter().map(|claim| claim.id).collect();
        self.untrack_claims(&removed);
        info!(claim = %id, removed = removed_ids.len(), "claim deleted");

        if record_id == id {
            let world = removed[0].world;
            if let Err(e) = self.delete_record_file(world, record_id) {
                error!(claim = %id, error = %e, "unable to delete claim file");
            }
            self.record_locks.lock().remove(&record_id);
        } else {
            let _ = self.persist_logged(id, record_id);
        }
        Ok(removed_ids)
    }

    fn delete_record_file(&self, world: WorldId, record_id: ClaimId) -> Result<(), ClaimError> {
        let info = self.world_info(world)?;
        self.storage
            .delete_claim_record(self.folder(&info), record_id)?;
        Ok(())
    }

    /// Moves a claim to a new boundary. Overlap and enclosure are checked as
    /// on insert, ignoring the claim itself.
    pub fn resize_claim(&self, id: ClaimId, boundary: Boundary) -> Result<(), ClaimError> {
        let record_id = self.record_id_of(id)?;
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();

        let previous = self.index.write().resize(id, boundary, false)?;
        info!(claim = %id, from = ?previous, to = ?boundary, "claim resized");
        let _ = self.persist_logged(id, record_id);
        Ok(())
    }

    /// Gives a top-level claim, with its subdivisions, to a new owner.
    pub fn transfer_claim(&self, id: ClaimId, owner: ClaimOwner) -> Result<(), ClaimError> {
        let lock = self.record_lock(id);
        let _guard = lock.lock();

        let (world, previous) = {
            let mut index = self.index.write();
            let previous = index.set_owner(id, owner)?;
            let world = index.get(id).map(|c| c.world).ok_or(ClaimError::ClaimNotFound(id))?;
            (world, previous)
        };
        self.untrack_claim(world, previous, id);
        self.track_claim(world, owner, id);
        info!(claim = %id, from = ?previous, to = ?owner, "claim transferred");
        let _ = self.persist_logged(id, id);
        Ok(())
    }

    /// Grants `player` the given trust level, replacing any earlier entry.
    pub fn set_trust(&self, id: ClaimId, player: PlayerId, level: TrustLevel) -> Result<(), ClaimError> {
        let record_id = self.record_id_of(id)?;
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();

        {
            let mut index = self.index.write();
            let claim = index.get_mut(id).ok_or(ClaimError::ClaimNotFound(id))?;
            match claim.trust.iter_mut().find(|entry| entry.player == player) {
                Some(entry) => entry.level = level,
                None => claim.trust.push(TrustEntry { player, level }),
            }
            claim.touch();
        }
        info!(claim = %id, %player, level = level.as_str(), "trust granted");
        let _ = self.persist_logged(id, record_id);
        Ok(())
    }

    /// Returns whether the player had any trust on the claim.
    pub fn remove_trust(&self, id: ClaimId, player: PlayerId) -> Result<bool, ClaimError> {
        let record_id = self.record_id_of(id)?;
        let lock = self.record_lock(record_id);
        let _guard = lock.lock();

        let removed = {
            let mut index = self.index.write();
            let claim = index.get_mut(id).ok_or(ClaimError::ClaimNotFound(id))?;
            let before = claim.trust.len();
            claim.trust.retain(|entry| entry.player != player);
            let removed = claim.trust.len() != before;
            if removed {
                claim.touch();
            }
            removed
        };
        if removed {
            info!(claim = %id, %player, "trust revoked");
            let _ = self.persist_logged(id, record_id);
        }
        Ok(removed)
    }

    fn record_id_of(&self, id: ClaimId) -> Result<ClaimId, ClaimError> {
        self.index
            .read()
            .get(id)
            .map(|claim| claim.record_id())
            .ok_or(ClaimError::ClaimNotFound(id))
    }

    /// The claim at `pos`, preferring a subdivision over its parent.
    ///
    /// `hint` is a claim the caller saw recently near this point; it speeds up
    /// the lookup but never changes the result.
    pub fn get_claim_at(
        &self,
        world: WorldId,
        pos: Position,
        include_border: bool,
        hint: Option<ClaimId>,
    ) -> Option<Claim> {
        self.index
            .read()
            .claim_at(world, pos, include_border, hint)
            .cloned()
    }

    pub fn get_claim(&self, id: ClaimId) -> Option<Claim> {
        self.index.read().get(id).cloned()
    }

    /// Top-level claims in `world`, ordered by id.
    pub fn claims_in_world(&self, world: WorldId) -> Vec<Claim> {
        let index = self.index.read();
        let mut claims: Vec<Claim> = index
            .top_level()
            .filter(|claim| claim.world == world)
            .cloned()
            .collect();
        claims.sort_by_key(|claim| claim.id);
        claims
    }

    pub fn claims_owned_by(&self, world: WorldId, player: PlayerId) -> Vec<Claim> {
        let index = self.index.read();
        index
            .owned_by(world, player)
            .into_iter()
            .filter_map(|id| index.get(id).cloned())
            .collect()
    }

    /// Indexed claims, subdivisions included.
    pub fn claim_count(&self) -> usize {
        self.index.read().len()
    }

    pub fn subdivision_count(&self) -> usize {
        self.index
            .read()
            .claims()
            .filter(|claim| claim.is_subdivision())
            .count()
    }

    fn track_claim(&self, world: WorldId, owner: ClaimOwner, id: ClaimId) {
        let Some(player) = owner.player() else {
            return;
        };
        let mut players = self.players.lock();
        if let Some(data) = players
            .get_mut(&player)
            .and_then(|data| data.worlds.get_mut(&world))
        {
            if !data.claims.contains(&id) {
                data.claims.push(id);
                data.claims.sort();
            }
        }
    }

    fn untrack_claim(&self, world: WorldId, owner: ClaimOwner, id: ClaimId) {
        let Some(player) = owner.player() else {
            return;
        };
        let mut players = self.players.lock();
        if let Some(data) = players
            .get_mut(&player)
            .and_then(|data| data.worlds.get_mut(&world))
        {
            data.claims.retain(|claim| *claim != id);
        }
    }

    fn untrack_claims(&self, removed: &[Claim]) {
        for claim in removed.iter().filter(|claim| !claim.is_subdivision()) {
            self.untrack_claim(claim.world, claim.owner, claim.id);
        }
    }

    /// Reads the player's record for one world, creating it with the world's
    /// initial allowance when the player has none yet.
    pub(crate) fn read_player_world(
        &self,
        world: &WorldInfo,
        player: PlayerId,
    ) -> Result<PlayerWorldData, StorageError> {
        let initial = self.config.for_world(&world.name).initial_claim_blocks;
        let folder = self.folder(world);
        let record = match self.storage.read_player_record(folder, player, initial)? {
            Some(record) => record,
            None => {
                let record = PlayerRecord::new(initial);
                if let Err(e) = self.storage.write_player_record(folder, player, &record) {
                    error!(%player, world = %world.name, error = %e, "failed to create player record");
                }
                record
            }
        };
        Ok(PlayerWorldData {
            record,
            claims: self.index.read().owned_by(world.id, player),
        })
    }

    fn with_player_world<R>(
        &self,
        world: &WorldInfo,
        player: PlayerId,
        f: impl FnOnce(&mut PlayerData) -> R,
    ) -> R {
        let mut players = self.players.lock();
        let data = players
            .entry(player)
            .or_insert_with(|| PlayerData::new(player));
        if !data.worlds.contains_key(&world.id) {
            let world_data = self.read_player_world(world, player).unwrap_or_else(|e| {
                warn!(%player, world = %world.name, error = %e, "unreadable player record, using defaults");
                PlayerWorldData {
                    record: PlayerRecord::new(
                        self.config.for_world(&world.name).initial_claim_blocks,
                    ),
                    claims: self.index.read().owned_by(world.id, player),
                }
            });
            data.worlds.insert(world.id, world_data);
        }
        f(data)
    }

    /// The player's cached data, loading or creating the record for `world`
    /// on first access.
    pub fn get_player_data(&self, world: WorldId, player: PlayerId) -> Result<PlayerData, ClaimError> {
        let info = self.world_info(world)?;
        Ok(self.with_player_world(&info, player, |data| data.clone()))
    }

    /// Applies `f` to the player's record in `world` and persists it. A failed
    /// write is logged; the cached value keeps the change.
    pub fn update_player_data(
        &self,
        world: WorldId,
        player: PlayerId,
        f: impl FnOnce(&mut PlayerRecord),
    ) -> Result<PlayerData, ClaimError> {
        let info = self.world_info(world)?;
        let folder = self.folder(&info);
        Ok(self.with_player_world(&info, player, |data| {
            if let Some(world_data) = data.worlds.get_mut(&world) {
                f(&mut world_data.record);
                if let Err(e) = self
                    .storage
                    .write_player_record(folder, player, &world_data.record)
                {
                    error!(%player, world = %info.name, error = %e, "failed to write player record");
                }
            }
            data.clone()
        }))
    }

    /// Allowance left after charging the footprint of every claim the player
    /// owns in `world`. Can go negative if the allowance was lowered.
    pub fn remaining_claim_blocks(&self, world: WorldId, player: PlayerId) -> Result<i64, ClaimError> {
        let data = self.get_player_data(world, player)?;
        let total = data
            .world(world)
            .map_or(0, |world_data| world_data.record.total_claim_blocks());
        let used = {
            let index = self.index.read();
            index
                .owned_by(world, player)
                .into_iter()
                .filter_map(|id| index.get(id))
                .fold(0u64, |used, claim| used.saturating_add(claim.boundary.area()))
        };
        Ok(total.saturating_sub(i64::try_from(used).unwrap_or(i64::MAX)))
    }

    /// The stored schema version. A missing version file is initialized to 0;
    /// an unreadable one counts as 0.
    pub fn read_schema_version(&self) -> u32 {
        match self.storage.read_schema_version() {
            Ok(Some(version)) => version,
            Ok(None) => {
                let _ = self.write_schema_version(0);
                0
            }
            Err(e) => {
                error!(error = %e, "unable to read schema version");
                0
            }
        }
    }

    pub fn write_schema_version(&self, version: u32) -> Result<(), StorageError> {
        let result = self.storage.write_schema_version(version);
        if let Err(e) = &result {
            error!(version, error = %e, "unexpected error saving schema version");
        }
        result
    }
}
