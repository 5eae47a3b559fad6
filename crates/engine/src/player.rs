use std::collections::BTreeMap;

use landclaim_core::{ClaimId, PlayerId, WorldId};
use landclaim_storage::PlayerRecord;

/// A player's claim accounting in one world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerWorldData {
    pub record: PlayerRecord,
    /// Top-level claims the player owns in this world.
    pub claims: Vec<ClaimId>,
}

/// Cached per-player state, one entry per world the player has touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerData {
    pub player: PlayerId,
    pub worlds: BTreeMap<WorldId, PlayerWorldData>,
}

impl PlayerData {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            worlds: BTreeMap::new(),
        }
    }

    pub fn world(&self, world: WorldId) -> Option<&PlayerWorldData> {
        self.worlds.get(&world)
    }

    pub fn claim_count(&self, world: WorldId) -> usize {
        self.world(world).map_or(0, |data| data.claims.len())
    }
}
